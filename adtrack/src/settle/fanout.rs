//! Multicast of one host scroll callback to many sessions.
//!
//! Most widgets accept a single scroll-change listener, yet one outer scroll
//! container often drives several tracked placements. The host installs one
//! callback that forwards into a [`ScrollFanout`]; every session subscribes
//! to the fanout and can detach on its own.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use adtrack::settle::ScrollFanout;
//!
//! let outer = Arc::new(ScrollFanout::new());
//!
//! // In the host's scroll-change callback:
//! outer.notify_motion();
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::source::{ScrollSource, SignalTx, Subscription};

type Listeners = Arc<Mutex<Vec<(u64, SignalTx)>>>;

/// [`ScrollSource`] that forwards host notifications to all subscribers.
#[derive(Debug, Default)]
pub struct ScrollFanout {
    listeners: Listeners,
    next_id: AtomicU64,
    reports_idle: bool,
}

impl ScrollFanout {
    /// Create a fanout for a source without a native idle signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fanout for a source that reports its own idle transition.
    pub fn with_native_idle() -> Self {
        Self {
            reports_idle: true,
            ..Self::default()
        }
    }

    /// Forward a motion tick to every subscriber.
    pub fn notify_motion(&self) {
        for (_, signals) in self.listeners.lock().iter() {
            signals.motion();
        }
    }

    /// Forward an idle transition to every subscriber.
    pub fn notify_idle(&self) {
        for (_, signals) in self.listeners.lock().iter() {
            signals.idle();
        }
    }

    /// Number of attached subscribers.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl ScrollSource for ScrollFanout {
    fn subscribe(&self, signals: SignalTx) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, signals));

        let listeners = Arc::clone(&self.listeners);
        Subscription::new(move || {
            listeners.lock().retain(|(listener_id, _)| *listener_id != id);
        })
    }

    fn reports_idle(&self) -> bool {
        self.reports_idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settle::source::{SignalKind, SourceId};
    use tokio::sync::mpsc;

    #[test]
    fn test_fanout_multicasts() {
        let fanout = ScrollFanout::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        let _sub_a = fanout.subscribe(SignalTx::new(SourceId(0), tx_a));
        let _sub_b = fanout.subscribe(SignalTx::new(SourceId(5), tx_b));
        assert_eq!(fanout.listener_count(), 2);

        fanout.notify_motion();

        assert_eq!(rx_a.try_recv().unwrap().source, SourceId(0));
        assert_eq!(rx_b.try_recv().unwrap().source, SourceId(5));
    }

    #[test]
    fn test_release_detaches_only_one() {
        let fanout = ScrollFanout::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        let mut sub_a = fanout.subscribe(SignalTx::new(SourceId(0), tx_a));
        let _sub_b = fanout.subscribe(SignalTx::new(SourceId(0), tx_b));

        sub_a.release();
        assert_eq!(fanout.listener_count(), 1);

        fanout.notify_idle();
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap().kind, SignalKind::Idle);
    }

    #[test]
    fn test_native_idle_flag() {
        assert!(!ScrollFanout::new().reports_idle());
        assert!(ScrollFanout::with_native_idle().reports_idle());
    }
}
