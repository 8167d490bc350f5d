//! One registered tracking subscription.
//!
//! A session owns two tasks sharing one [`CancellationToken`]:
//!
//! ```text
//!   sources ──► settle loop ──► settle events ──► session worker
//!                                                   │
//!                                     UiDispatcher ◄┘ scan (enumerate,
//!                                                   │  classify, resolve)
//!                                                   ▼
//!                                     dedup store ──► analytics sink
//! ```
//!
//! The worker hops to the UI thread for the scan and awaits the result
//! without blocking. The disposed flag is checked after the hop and before
//! every key, so nothing is delivered once [`TrackerSession::dispose`]
//! returns.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::context::TrackerContext;
use super::emit::emit_event;
use super::topology::{Candidate, Layout, ScanContext, Topology};
use crate::ad::{AdType, EventKind};
use crate::config::TrackerConfig;
use crate::settle::driver::spawn_settle_loop;
use crate::settle::{ScrollSignal, SettleEngine, SettleEvent, SignalTx, SourceId, Subscription};
use crate::ui::{EventNameResolver, NodeId};

// =============================================================================
// Handle
// =============================================================================

/// Identifies a registered session. Returned by every `register*` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionHandle(pub(crate) u64);

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

// =============================================================================
// Shared State
// =============================================================================

#[derive(Default)]
struct Resources {
    subscriptions: Vec<Subscription>,
    /// Pagers already listened to.
    pagers: HashSet<NodeId>,
}

/// State shared between the session, its tasks and in-flight UI jobs.
struct SessionState {
    disposed: AtomicBool,
    cancel: CancellationToken,
    resources: Mutex<Resources>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            disposed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            resources: Mutex::new(Resources::default()),
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Keep `subscription` until dispose. Released at once if the session
    /// is already disposed.
    fn adopt(&self, mut subscription: Subscription) {
        let mut resources = self.resources.lock();
        if self.is_disposed() {
            drop(resources);
            subscription.release();
            return;
        }
        resources.subscriptions.push(subscription);
    }

    /// Record `pager` as seen. `false` if it was seen before or the session
    /// is gone.
    fn first_sighting(&self, pager: NodeId) -> bool {
        let mut resources = self.resources.lock();
        !self.is_disposed() && resources.pagers.insert(pager)
    }

    /// Mark disposed and detach everything. `false` if already disposed.
    fn shut_down(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.cancel.cancel();

        let subscriptions = std::mem::take(&mut self.resources.lock().subscriptions);
        for mut subscription in subscriptions {
            subscription.release();
        }
        true
    }
}

/// Hands out a fresh source slot for every pager a scan discovers.
///
/// The pager is announced on the signal channel before it is subscribed, so
/// the settle loop has its detector in place by the first motion.
struct PagerWiring {
    tx: mpsc::UnboundedSender<ScrollSignal>,
    next_source: AtomicU32,
}

impl PagerWiring {
    fn new(tx: mpsc::UnboundedSender<ScrollSignal>, first_source: u32) -> Self {
        Self {
            tx,
            next_source: AtomicU32::new(first_source),
        }
    }

    fn attach(&self, native_idle: bool) -> SignalTx {
        let id = SourceId(self.next_source.fetch_add(1, Ordering::Relaxed));
        let signals = SignalTx::new(id, self.tx.clone());
        signals.attach(native_idle);
        signals
    }
}

// =============================================================================
// Session
// =============================================================================

/// A live tracking subscription.
pub(crate) struct TrackerSession {
    handle: SessionHandle,
    ad_type: AdType,
    layout: &'static str,
    state: Arc<SessionState>,
    tasks: Vec<JoinHandle<()>>,
}

impl TrackerSession {
    /// Subscribe to the topology's sources and start the session's tasks.
    pub fn spawn(
        handle: SessionHandle,
        ad_type: AdType,
        topology: Topology,
        config: &TrackerConfig,
        context: Arc<TrackerContext>,
        runtime: &Handle,
    ) -> Self {
        let state = Arc::new(SessionState::new());
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (settle_tx, settle_rx) = mpsc::unbounded_channel();

        for (spec, source) in &topology.sources {
            let subscription = source.subscribe(SignalTx::new(spec.id, signal_tx.clone()));
            state.adopt(subscription);
        }

        let engine = SettleEngine::new(
            &topology.specs(),
            topology.combine,
            config.min_signal_spacing,
        );
        let settle_task = spawn_settle_loop(
            runtime,
            engine,
            config.probe_interval,
            signal_rx,
            settle_tx,
            state.cancel.clone(),
        );

        let first_pager_source = topology.sources.len() as u32;
        let pagers = topology
            .listens_to_pagers()
            .then(|| Arc::new(PagerWiring::new(signal_tx, first_pager_source)));
        let layout = topology.layout.name();

        let worker = SessionWorker {
            handle,
            ad_type: ad_type.clone(),
            layout: Arc::new(topology.layout),
            context,
            state: Arc::clone(&state),
            pagers,
        };
        let worker_task = runtime.spawn(worker.run(settle_rx));

        info!(
            session_id = handle.id(),
            ad_type = %ad_type,
            layout,
            probe_interval_ms = config.probe_interval.as_millis() as u64,
            "Tracking session registered"
        );

        Self {
            handle,
            ad_type,
            layout,
            state,
            tasks: vec![settle_task, worker_task],
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    pub fn is_disposed(&self) -> bool {
        self.state.is_disposed()
    }

    /// Stop the session: cancel its tasks and detach every listener.
    ///
    /// Idempotent. Returns `true` on the call that actually disposed.
    pub fn dispose(&mut self) -> bool {
        if !self.state.shut_down() {
            return false;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!(
            session_id = self.handle.id(),
            ad_type = %self.ad_type,
            layout = self.layout,
            "Tracking session disposed"
        );
        true
    }
}

impl Drop for TrackerSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for TrackerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerSession")
            .field("handle", &self.handle)
            .field("ad_type", &self.ad_type)
            .field("layout", &self.layout)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Background half of a session: turns settles into deliveries.
struct SessionWorker {
    handle: SessionHandle,
    ad_type: AdType,
    layout: Arc<Layout>,
    context: Arc<TrackerContext>,
    state: Arc<SessionState>,
    /// Set when discovered pagers should feed the settle loop.
    pagers: Option<Arc<PagerWiring>>,
}

impl SessionWorker {
    async fn run(self, mut settles: mpsc::UnboundedReceiver<SettleEvent>) {
        loop {
            let settle = tokio::select! {
                biased;

                _ = self.state.cancel.cancelled() => break,

                settle = settles.recv() => match settle {
                    Some(settle) => settle,
                    None => break,
                },
            };

            if self.state.is_disposed() {
                break;
            }
            self.on_settle(settle).await;
        }
        trace!(session_id = self.handle.id(), "Session worker stopped");
    }

    async fn on_settle(&self, settle: SettleEvent) {
        trace!(
            session_id = self.handle.id(),
            trigger = ?settle.trigger,
            "Settle received"
        );

        let Some(resolver) = self.context.resolver() else {
            warn!(
                session_id = self.handle.id(),
                ad_type = %self.ad_type,
                "No event name resolver configured, settle ignored"
            );
            return;
        };
        let Some(sink) = self.context.sink() else {
            warn!(
                session_id = self.handle.id(),
                ad_type = %self.ad_type,
                "No analytics sink configured, settle ignored"
            );
            return;
        };

        let Some(candidates) = self.scan_on_ui(resolver).await else {
            return;
        };
        if self.state.is_disposed() {
            return;
        }

        for candidate in candidates {
            let sent = emit_event(
                &self.context.store,
                sink.as_ref(),
                &self.ad_type,
                EventKind::View,
                &candidate.name,
                || !self.state.is_disposed(),
            );
            if !sent.is_empty() {
                debug!(
                    session_id = self.handle.id(),
                    position = ?candidate.position,
                    sent = sent.len(),
                    "Impression delivered"
                );
            }
        }
    }

    /// Run the scan on the UI thread and wait for its result.
    ///
    /// `None` if the session was disposed or the dispatcher dropped the job.
    async fn scan_on_ui(&self, resolver: Arc<dyn EventNameResolver>) -> Option<Vec<Candidate>> {
        let (result_tx, result_rx) = oneshot::channel();

        let job = ScanJob {
            ad_type: self.ad_type.clone(),
            layout: Arc::clone(&self.layout),
            context: Arc::clone(&self.context),
            state: Arc::clone(&self.state),
            resolver,
            pagers: self.pagers.clone(),
        };
        self.context.dispatcher.dispatch(Box::new(move || {
            if job.state.is_disposed() {
                return;
            }
            // Receiver gone means the session stopped waiting
            let _ = result_tx.send(job.run());
        }));

        tokio::select! {
            biased;

            _ = self.state.cancel.cancelled() => None,

            result = result_rx => match result {
                Ok(candidates) => Some(candidates),
                Err(_) => {
                    debug!(session_id = self.handle.id(), "UI job dropped before running");
                    None
                }
            },
        }
    }
}

/// Everything the UI-thread scan needs, owned so it can cross threads.
struct ScanJob {
    ad_type: AdType,
    layout: Arc<Layout>,
    context: Arc<TrackerContext>,
    state: Arc<SessionState>,
    resolver: Arc<dyn EventNameResolver>,
    pagers: Option<Arc<PagerWiring>>,
}

impl ScanJob {
    fn run(&self) -> Vec<Candidate> {
        let ctx = ScanContext {
            ad_type: &self.ad_type,
            enumerator: self.context.enumerator.as_ref(),
            classifier: self.context.classifier.as_ref(),
            resolver: self.resolver.as_ref(),
        };
        self.layout.scan(&ctx, &mut |pager| self.listen_to_pager(pager))
    }

    /// Attach to a discovered pager, once per pager per session.
    ///
    /// Each pager settles on its own, probed or native as it reports.
    fn listen_to_pager(&self, pager: NodeId) {
        let Some(wiring) = &self.pagers else {
            return;
        };
        if !self.state.first_sighting(pager) {
            return;
        }
        match self.context.enumerator.pager_source(pager) {
            Some(source) => {
                let signals = wiring.attach(source.reports_idle());
                debug!(
                    pager = pager.0,
                    source = %signals.source(),
                    native_idle = source.reports_idle(),
                    "Listening to pager"
                );
                self.state.adopt(source.subscribe(signals));
            }
            None => trace!(pager = pager.0, "Pager exposes no signal source"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::EventDedupStore;
    use crate::settle::ScrollFanout;
    use crate::tracker::topology::ScrollTarget;
    use crate::ui::{
        ContainmentClassifier, Element, ElementMatcher, InlineDispatcher, MemoryTree, NodeKind,
        Rect, RecordingSink, TreeEnumerator,
    };
    use std::time::Duration;

    const AD: AdType = AdType::new("HomeBigBanner", "A");

    struct Fixture {
        tree: Arc<MemoryTree>,
        list: NodeId,
        source: Arc<ScrollFanout>,
        sink: Arc<RecordingSink>,
        context: Arc<TrackerContext>,
    }

    fn fixture() -> Fixture {
        let tree = Arc::new(MemoryTree::new());
        let list = tree.add_root(NodeKind::List, Rect::new(0, 0, 1080, 1920));
        tree.add_child(list, NodeKind::Group, Some("Banner"), Rect::new(0, 0, 1080, 600));
        tree.set_visible_range(list, Some((0, 0)));

        let sink = Arc::new(RecordingSink::new());
        let resolver = |_: &AdType, _: Option<usize>, _: Option<&Element>| Some("Foo".to_string());
        let context = Arc::new(TrackerContext::new(
            Arc::new(EventDedupStore::new()),
            Arc::new(TreeEnumerator::new(Arc::clone(&tree))),
            Arc::new(ContainmentClassifier),
            Arc::new(InlineDispatcher),
            Some(Arc::new(resolver)),
            Some(Arc::clone(&sink) as Arc<dyn crate::ui::AnalyticsSink>),
        ));

        Fixture {
            tree,
            list,
            source: Arc::new(ScrollFanout::with_native_idle()),
            sink,
            context,
        }
    }

    fn spawn(fixture: &Fixture) -> TrackerSession {
        let target = ScrollTarget::new(fixture.list, fixture.source.clone());
        TrackerSession::spawn(
            SessionHandle(1),
            AD,
            Topology::list(target, ElementMatcher::tag("Banner")),
            &TrackerConfig::default(),
            Arc::clone(&fixture.context),
            &Handle::current(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_settle_delivers() {
        let fixture = fixture();
        let _session = spawn(&fixture);
        assert_eq!(fixture.source.listener_count(), 1);

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(fixture.sink.events(), vec!["A_SV_Foo", "A_PV_Foo"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_detaches_and_silences() {
        let fixture = fixture();
        let mut session = spawn(&fixture);

        assert!(session.dispose());
        assert!(!session.dispose());
        assert!(session.is_disposed());
        assert_eq!(fixture.source.listener_count(), 0);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(fixture.sink.events().is_empty());
        assert!(fixture.context.store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_disposes() {
        let fixture = fixture();
        drop(spawn(&fixture));

        assert_eq!(fixture.source.listener_count(), 0);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(fixture.sink.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_sink_skips_without_consuming_keys() {
        let fixture = fixture();
        fixture.context.set_sink(None);
        let _session = spawn(&fixture);

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(fixture.context.store.is_empty());

        // Configured later, the next settle delivers
        let sink: Arc<dyn crate::ui::AnalyticsSink> = fixture.sink.clone();
        fixture.context.set_sink(Some(sink));
        fixture.source.notify_motion();
        fixture.source.notify_idle();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(fixture.sink.events().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_ui_job_is_not_fatal() {
        let fixture = fixture();
        let (dispatcher, queue) = crate::ui::QueueDispatcher::new();
        drop(queue);
        let context = Arc::new(TrackerContext::new(
            Arc::clone(&fixture.context.store),
            Arc::clone(&fixture.context.enumerator),
            Arc::new(ContainmentClassifier),
            Arc::new(dispatcher),
            fixture.context.resolver(),
            fixture.context.sink(),
        ));
        let target = ScrollTarget::new(fixture.list, fixture.source.clone());
        let session = TrackerSession::spawn(
            SessionHandle(2),
            AD,
            Topology::list(target, ElementMatcher::tag("Banner")),
            &TrackerConfig::default(),
            context,
            &Handle::current(),
        );

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(fixture.sink.events().is_empty());
        assert!(!session.is_disposed());
        assert_eq!(fixture.tree.len(), 2);
    }

    #[test]
    fn test_adopt_after_dispose_releases() {
        let state = SessionState::new();
        assert!(state.first_sighting(NodeId(5)));
        assert!(!state.first_sighting(NodeId(5)));
        assert!(state.shut_down());
        assert!(!state.shut_down());

        let released = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&released);
        state.adopt(Subscription::new(move || flag.store(true, Ordering::SeqCst)));

        assert!(released.load(Ordering::SeqCst));
        assert!(!state.first_sighting(NodeId(6)));
    }

    #[test]
    fn test_pager_wiring_gives_each_pager_a_source() {
        use crate::settle::SignalKind;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let wiring = PagerWiring::new(tx, 1);

        let first = wiring.attach(false);
        let second = wiring.attach(true);
        first.motion();
        assert_eq!(first.source(), SourceId(1));
        assert_eq!(second.source(), SourceId(2));

        let received: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|signal| (signal.source, signal.kind))
            .collect();
        assert_eq!(
            received,
            vec![
                (SourceId(1), SignalKind::Attached { native_idle: false }),
                (SourceId(2), SignalKind::Attached { native_idle: true }),
                (SourceId(1), SignalKind::Motion),
            ]
        );
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(SessionHandle(7).to_string(), "session#7");
        assert_eq!(SessionHandle(7).id(), 7);
    }
}
