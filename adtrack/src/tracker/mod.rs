//! Host-facing registry of tracking sessions.
//!
//! [`TrackerFacade`] is the only type most hosts touch. It is built once per
//! screen host with [`TrackerBuilder`], then each tracked placement is
//! registered with the `register*` call matching its container topology:
//!
//! | Call                              | Scroll driver             | Tracked elements             |
//! |-----------------------------------|---------------------------|------------------------------|
//! | [`register`]                      | the list itself           | matched list items           |
//! | [`register_nested_pager`]         | the list and its pagers   | pagers inside matched items  |
//! | [`register_external_scroll`]      | an outer scroll container | matched items of inner list  |
//! | [`register_external_scroll_pager`]| outer scroll and a pager  | the pager's current page     |
//!
//! All sessions share one [`EventDedupStore`], so an impression counted by
//! one placement's session is not counted again by another that resolves to
//! the same key.
//!
//! [`register`]: TrackerFacade::register
//! [`register_nested_pager`]: TrackerFacade::register_nested_pager
//! [`register_external_scroll`]: TrackerFacade::register_external_scroll
//! [`register_external_scroll_pager`]: TrackerFacade::register_external_scroll_pager
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use adtrack::settle::ScrollFanout;
//! use adtrack::tracker::{ScrollTarget, TrackerBuilder};
//! use adtrack::ui::{ElementMatcher, MemoryTree, NodeKind, Rect, RecordingSink, TreeEnumerator};
//! use adtrack::AdType;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), adtrack::TrackerError> {
//! let tree = Arc::new(MemoryTree::new());
//! let list = tree.add_root(NodeKind::List, Rect::new(0, 0, 1080, 1920));
//! let scroll = Arc::new(ScrollFanout::with_native_idle());
//!
//! let tracker = TrackerBuilder::new(Arc::new(TreeEnumerator::new(tree)))
//!     .with_sink(Arc::new(RecordingSink::new()))
//!     .build()?;
//!
//! let handle = tracker.register(
//!     AdType::new("HomeBigBanner", "Home_MainBanner"),
//!     ScrollTarget::new(list, scroll),
//!     ElementMatcher::tag("BannerHolder"),
//! )?;
//! assert!(tracker.dispose(handle));
//! # Ok(())
//! # }
//! ```

mod context;
mod emit;
mod session;
mod topology;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;

use crate::ad::{AdType, EventKind};
use crate::config::TrackerConfig;
use crate::dedup::EventDedupStore;
use crate::error::{TrackerError, TrackerResult};
use crate::ui::{
    AnalyticsSink, ChildEnumerator, ContainmentClassifier, ElementMatcher, EventNameResolver,
    InlineDispatcher, NodeId, UiDispatcher, VisibilityClassifier,
};

use context::TrackerContext;
use emit::emit_event;
use session::TrackerSession;
use topology::Topology;

pub use session::SessionHandle;
pub use topology::ScrollTarget;

// =============================================================================
// Builder
// =============================================================================

/// Assembles a [`TrackerFacade`].
///
/// Only the element enumerator is required. Defaults:
///
/// - configuration: [`TrackerConfig::default`]
/// - dedup store: a fresh [`EventDedupStore`]
/// - classifier: [`ContainmentClassifier`]
/// - dispatcher: [`InlineDispatcher`]
/// - runtime: the tokio runtime current at each registration
/// - resolver and sink: none (sessions stay silent until supplied)
pub struct TrackerBuilder {
    config: TrackerConfig,
    store: Option<Arc<EventDedupStore>>,
    enumerator: Arc<dyn ChildEnumerator>,
    classifier: Arc<dyn VisibilityClassifier>,
    dispatcher: Arc<dyn UiDispatcher>,
    resolver: Option<Arc<dyn EventNameResolver>>,
    sink: Option<Arc<dyn AnalyticsSink>>,
    runtime: Option<Handle>,
}

impl TrackerBuilder {
    pub fn new(enumerator: Arc<dyn ChildEnumerator>) -> Self {
        Self {
            config: TrackerConfig::default(),
            store: None,
            enumerator,
            classifier: Arc::new(ContainmentClassifier),
            dispatcher: Arc::new(InlineDispatcher),
            resolver: None,
            sink: None,
            runtime: None,
        }
    }

    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing store, e.g. across several screens of one app
    /// session.
    pub fn with_store(mut self, store: Arc<EventDedupStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn VisibilityClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn UiDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn EventNameResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn AnalyticsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run session tasks on `runtime` instead of the caller's.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Validate the configuration and build the facade.
    pub fn build(self) -> TrackerResult<TrackerFacade> {
        self.config.validate()?;

        let context = TrackerContext::new(
            self.store.unwrap_or_default(),
            self.enumerator,
            self.classifier,
            self.dispatcher,
            self.resolver,
            self.sink,
        );

        Ok(TrackerFacade {
            config: self.config,
            context: Arc::new(context),
            runtime: self.runtime,
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }
}

impl fmt::Debug for TrackerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerBuilder")
            .field("config", &self.config)
            .field("has_resolver", &self.resolver.is_some())
            .field("has_sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Facade
// =============================================================================

/// Registry of active tracking sessions.
///
/// Dropping the facade disposes every session it still holds.
pub struct TrackerFacade {
    config: TrackerConfig,
    context: Arc<TrackerContext>,
    runtime: Option<Handle>,
    sessions: Mutex<HashMap<SessionHandle, TrackerSession>>,
    next_id: AtomicU64,
}

impl TrackerFacade {
    /// Track items of a list that scrolls on its own.
    pub fn register(
        &self,
        ad_type: AdType,
        list: ScrollTarget,
        matcher: ElementMatcher,
    ) -> TrackerResult<SessionHandle> {
        self.spawn_session(ad_type, Topology::list(list, matcher))
    }

    /// Track pagers found inside matched items of a list.
    ///
    /// Each pager is listened to from the first settle that sees it; its
    /// idle transitions settle the session like the list's own.
    pub fn register_nested_pager(
        &self,
        ad_type: AdType,
        list: ScrollTarget,
        matcher: ElementMatcher,
    ) -> TrackerResult<SessionHandle> {
        self.spawn_session(ad_type, Topology::pager_in_list(list, matcher))
    }

    /// Track items of `inner_list` scrolled by an outer container.
    pub fn register_external_scroll(
        &self,
        ad_type: AdType,
        outer: ScrollTarget,
        inner_list: NodeId,
        matcher: ElementMatcher,
    ) -> TrackerResult<SessionHandle> {
        self.spawn_session(
            ad_type,
            Topology::external_scroll_list(outer, inner_list, matcher),
        )
    }

    /// Track a pager inside an outer scroll container.
    ///
    /// Settles only while both the container and the pager are at rest.
    pub fn register_external_scroll_pager(
        &self,
        ad_type: AdType,
        outer: ScrollTarget,
        pager: ScrollTarget,
    ) -> TrackerResult<SessionHandle> {
        self.spawn_session(ad_type, Topology::external_scroll_pager(outer, pager))
    }

    /// Dispose a session.
    ///
    /// Returns `false` if the handle is unknown or already disposed.
    pub fn dispose(&self, handle: SessionHandle) -> bool {
        // Dispose outside the registry lock
        let session = self.sessions.lock().remove(&handle);
        match session {
            Some(mut session) => session.dispose(),
            None => {
                tracing::debug!(session_id = handle.id(), "Dispose of unknown session ignored");
                false
            }
        }
    }

    /// Dispose every session. Returns how many were disposed.
    pub fn dispose_all(&self) -> usize {
        let sessions: Vec<_> = self.sessions.lock().drain().map(|(_, s)| s).collect();
        let mut disposed = 0;
        for mut session in sessions {
            if session.dispose() {
                disposed += 1;
            }
        }
        disposed
    }

    /// Forget page-scoped keys. Call on every page transition.
    pub fn clear_page_scope(&self) {
        self.context.store.clear_page();
    }

    /// Forget session-scoped keys. Call when the app session expires.
    pub fn clear_session_scope(&self) {
        self.context.store.clear_session();
    }

    /// Report an impression the host detected itself.
    ///
    /// Returns how many keys were sent (0 to 2).
    pub fn track_view(&self, ad_type: &AdType, event_name: &str) -> TrackerResult<usize> {
        self.track(ad_type, EventKind::View, event_name)
    }

    /// Report a click on a placement.
    ///
    /// Returns how many keys were sent (0 to 2).
    pub fn track_click(&self, ad_type: &AdType, event_name: &str) -> TrackerResult<usize> {
        self.track(ad_type, EventKind::Click, event_name)
    }

    fn track(&self, ad_type: &AdType, kind: EventKind, event_name: &str) -> TrackerResult<usize> {
        let sink = self
            .context
            .sink()
            .ok_or(TrackerError::MissingCollaborator("analytics sink"))?;
        let sent = emit_event(
            &self.context.store,
            sink.as_ref(),
            ad_type,
            kind,
            event_name,
            || true,
        );
        Ok(sent.len())
    }

    /// Replace the event name resolver. Live sessions use it from their next
    /// settle.
    pub fn set_resolver(&self, resolver: Arc<dyn EventNameResolver>) {
        self.context.set_resolver(Some(resolver));
    }

    /// Replace the analytics sink. Live sessions use it from their next
    /// settle.
    pub fn set_sink(&self, sink: Arc<dyn AnalyticsSink>) {
        self.context.set_sink(Some(sink));
    }

    pub fn is_active(&self, handle: SessionHandle) -> bool {
        self.sessions
            .lock()
            .get(&handle)
            .is_some_and(|session| !session.is_disposed())
    }

    /// Number of registered sessions.
    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    /// The shared dedup store.
    pub fn store(&self) -> &Arc<EventDedupStore> {
        &self.context.store
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    fn spawn_session(&self, ad_type: AdType, topology: Topology) -> TrackerResult<SessionHandle> {
        let runtime = match &self.runtime {
            Some(runtime) => runtime.clone(),
            None => Handle::try_current()
                .map_err(|e| TrackerError::RuntimeUnavailable(e.to_string()))?,
        };

        let handle = SessionHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let session = TrackerSession::spawn(
            handle,
            ad_type,
            topology,
            &self.config,
            Arc::clone(&self.context),
            &runtime,
        );
        self.sessions.lock().insert(session.handle(), session);
        Ok(handle)
    }
}

impl Drop for TrackerFacade {
    fn drop(&mut self) {
        let disposed = self.dispose_all();
        if disposed > 0 {
            tracing::debug!(disposed, "Tracker dropped with live sessions");
        }
    }
}

impl fmt::Debug for TrackerFacade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerFacade")
            .field("config", &self.config)
            .field("context", &self.context)
            .field("sessions", &self.active_sessions())
            .finish()
    }
}
