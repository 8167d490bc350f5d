//! Collaborators shared by the facade and every session it spawns.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::dedup::EventDedupStore;
use crate::ui::{
    AnalyticsSink, ChildEnumerator, EventNameResolver, UiDispatcher, VisibilityClassifier,
};

/// Shared state reachable from session tasks and UI jobs.
///
/// The resolver and sink can be supplied after sessions are registered;
/// sessions read the current slot on every settle.
pub(crate) struct TrackerContext {
    pub store: Arc<EventDedupStore>,
    pub enumerator: Arc<dyn ChildEnumerator>,
    pub classifier: Arc<dyn VisibilityClassifier>,
    pub dispatcher: Arc<dyn UiDispatcher>,
    resolver: RwLock<Option<Arc<dyn EventNameResolver>>>,
    sink: RwLock<Option<Arc<dyn AnalyticsSink>>>,
}

impl TrackerContext {
    pub fn new(
        store: Arc<EventDedupStore>,
        enumerator: Arc<dyn ChildEnumerator>,
        classifier: Arc<dyn VisibilityClassifier>,
        dispatcher: Arc<dyn UiDispatcher>,
        resolver: Option<Arc<dyn EventNameResolver>>,
        sink: Option<Arc<dyn AnalyticsSink>>,
    ) -> Self {
        Self {
            store,
            enumerator,
            classifier,
            dispatcher,
            resolver: RwLock::new(resolver),
            sink: RwLock::new(sink),
        }
    }

    pub fn resolver(&self) -> Option<Arc<dyn EventNameResolver>> {
        self.resolver.read().clone()
    }

    pub fn sink(&self) -> Option<Arc<dyn AnalyticsSink>> {
        self.sink.read().clone()
    }

    pub fn set_resolver(&self, resolver: Option<Arc<dyn EventNameResolver>>) {
        *self.resolver.write() = resolver;
    }

    pub fn set_sink(&self, sink: Option<Arc<dyn AnalyticsSink>>) {
        *self.sink.write() = sink;
    }
}

impl fmt::Debug for TrackerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerContext")
            .field("store", &self.store)
            .field("has_resolver", &self.resolver.read().is_some())
            .field("has_sink", &self.sink.read().is_some())
            .finish_non_exhaustive()
    }
}
