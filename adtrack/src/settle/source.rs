//! Scroll signal sources and their subscriptions.
//!
//! Hosts adapt their widget callbacks to [`ScrollSource`]. When a session
//! starts it hands each source a [`SignalTx`] and keeps the returned
//! [`Subscription`] until it is disposed.

use std::fmt;
use std::time::Instant;

use tokio::sync::mpsc;

/// Identity of one signal source within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// What a source reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// The source moved.
    Motion,
    /// The source reported its own idle transition.
    Idle,
    /// The source joined a session that was already running.
    Attached {
        /// See [`ScrollSource::reports_idle`].
        native_idle: bool,
    },
}

/// One tick from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSignal {
    pub source: SourceId,
    pub kind: SignalKind,
    pub at: Instant,
}

/// Sending half handed to a [`ScrollSource`].
///
/// Cheap to clone. Sends after the owning session is gone are silently
/// dropped, so host callbacks never need to check session liveness.
#[derive(Debug, Clone)]
pub struct SignalTx {
    source: SourceId,
    tx: mpsc::UnboundedSender<ScrollSignal>,
}

impl SignalTx {
    pub(crate) fn new(source: SourceId, tx: mpsc::UnboundedSender<ScrollSignal>) -> Self {
        Self { source, tx }
    }

    /// Report that the source moved.
    pub fn motion(&self) {
        self.send(SignalKind::Motion);
    }

    /// Report that the source stopped moving.
    ///
    /// Every call settles the source, so a widget that only publishes its
    /// idle transition needs no motion ticks. Meant for sources whose
    /// [`ScrollSource::reports_idle`] is `true`.
    pub fn idle(&self) {
        self.send(SignalKind::Idle);
    }

    /// Announce this source to a running session. Must precede its first
    /// motion or idle.
    pub(crate) fn attach(&self, native_idle: bool) {
        self.send(SignalKind::Attached { native_idle });
    }

    /// The source this sender reports for.
    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Whether the receiving session is still alive.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, kind: SignalKind) {
        let signal = ScrollSignal {
            source: self.source,
            kind,
            at: tokio::time::Instant::now().into_std(),
        };
        if self.tx.send(signal).is_err() {
            tracing::trace!(source = %self.source, "Signal dropped, session gone");
        }
    }
}

/// A host widget that can report scroll motion.
///
/// # Implementors
///
/// - [`ScrollFanout`](super::ScrollFanout) - multicasts one host callback to
///   every subscribed session
pub trait ScrollSource: Send + Sync {
    /// Start delivering signals to `signals`.
    ///
    /// The returned subscription detaches the listener when released.
    fn subscribe(&self, signals: SignalTx) -> Subscription;

    /// Whether the source reports its own idle transition.
    ///
    /// Sources that do are trusted once they have reported anything; the
    /// quiescence probe only covers them until their first signal.
    fn reports_idle(&self) -> bool {
        false
    }
}

/// Handle that detaches a listener from its source.
///
/// Released explicitly by the owning session on dispose, or when dropped.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap the closure that removes the listener.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release.
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Detach the listener. Calling this more than once is a no-op.
    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// Whether the listener is still attached.
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_signal_tx_stamps_source() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let signals = SignalTx::new(SourceId(3), tx);

        signals.motion();
        signals.idle();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.source, SourceId(3));
        assert_eq!(first.kind, SignalKind::Motion);
        assert_eq!(rx.try_recv().unwrap().kind, SignalKind::Idle);
    }

    #[test]
    fn test_send_after_close_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        let signals = SignalTx::new(SourceId(0), tx);
        drop(rx);

        assert!(signals.is_closed());
        signals.motion();
    }

    #[test]
    fn test_subscription_releases_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let mut sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(sub.is_active());
        sub.release();
        sub.release();
        drop(sub);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_released_on_drop() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        drop(sub);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!Subscription::noop().is_active());
    }
}
