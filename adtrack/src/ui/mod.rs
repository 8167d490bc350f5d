//! Host collaborators: element lookup, visibility, naming and delivery.
//!
//! The tracker never touches a widget toolkit directly. Everything it needs
//! from the host goes through the traits in this module:
//!
//! | Trait                    | Question answered                              |
//! |--------------------------|------------------------------------------------|
//! | [`ChildEnumerator`]      | Which matching elements are realized right now? |
//! | [`VisibilityClassifier`] | Is this element fully inside its container?    |
//! | [`EventNameResolver`]    | What is this placement's event name?           |
//! | [`AnalyticsSink`]        | Deliver this event key.                        |
//! | [`UiDispatcher`]         | Run this job on the UI-owning thread.          |
//!
//! # Thread Affinity
//!
//! Enumeration, visibility and naming usually must run on the thread that
//! owns the element tree. The tracker packages that work as a [`UiJob`] and
//! hands it to the host's [`UiDispatcher`]; the background worker awaits the
//! result without blocking. [`InlineDispatcher`] runs jobs on the calling
//! thread for hosts with no such restriction.

mod geometry;
mod memory;
mod tree;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::ad::AdType;
use crate::settle::ScrollSource;

pub use geometry::{ContainmentClassifier, Rect};
pub use memory::MemoryTree;
pub use tree::{TreeEnumerator, UiTree};

/// Opaque handle to a node in the host's element tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Broad kind of a node, used to recurse through nested containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Windowed list; only children inside the visible range are realized.
    List,
    /// Paged widget showing one page at a time.
    Pager,
    /// Plain container.
    Group,
    /// Leaf element.
    Leaf,
}

/// Selects target elements by their host-assigned tag (e.g. a view holder
/// class name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementMatcher {
    tag: String,
}

impl ElementMatcher {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    pub fn matches(&self, tag: &str) -> bool {
        self.tag == tag
    }

    pub fn as_str(&self) -> &str {
        &self.tag
    }
}

/// A realized element that matched an [`ElementMatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub node: NodeId,
    /// Position within the list that realized it.
    pub position: Option<usize>,
    pub tag: Option<String>,
}

/// Result of a visibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Entirely inside the container.
    Full,
    /// Clipped by the container.
    Partial,
    /// Not on screen at all.
    Hidden,
}

impl Visibility {
    pub fn is_full(&self) -> bool {
        matches!(self, Visibility::Full)
    }
}

/// Finds realized target elements.
pub trait ChildEnumerator: Send + Sync {
    /// Realized elements under `container` that match `matcher`, descending
    /// into nested lists. Elements outside a list's realized window are not
    /// returned.
    fn matching_children(&self, container: NodeId, matcher: &ElementMatcher) -> Vec<Element>;

    /// Pagers inside `element`.
    fn descendant_pagers(&self, element: NodeId) -> Vec<NodeId>;

    /// Screen bounds of `node`.
    fn bounds(&self, node: NodeId) -> Option<Rect>;

    /// Page currently shown by `pager`.
    fn current_page(&self, pager: NodeId) -> Option<usize>;

    /// Signal source for a pager discovered at runtime.
    fn pager_source(&self, _pager: NodeId) -> Option<Arc<dyn ScrollSource>> {
        None
    }
}

/// Decides whether an element is fully visible inside its container.
pub trait VisibilityClassifier: Send + Sync {
    fn classify(&self, container: Rect, element: Rect) -> Visibility;
}

/// Supplies the event name for a placement.
pub trait EventNameResolver: Send + Sync {
    /// Name for the element at `position`, or `None`/empty to skip it.
    ///
    /// Resolvers that do not recognise the placement should return
    /// [`UNKNOWN_EVENT_NAME`](crate::ad::UNKNOWN_EVENT_NAME).
    fn event_name(
        &self,
        ad_type: &AdType,
        position: Option<usize>,
        element: Option<&Element>,
    ) -> Option<String>;
}

impl<F> EventNameResolver for F
where
    F: Fn(&AdType, Option<usize>, Option<&Element>) -> Option<String> + Send + Sync,
{
    fn event_name(
        &self,
        ad_type: &AdType,
        position: Option<usize>,
        element: Option<&Element>,
    ) -> Option<String> {
        self(ad_type, position, element)
    }
}

/// Transmits formatted event keys. Fire-and-forget.
pub trait AnalyticsSink: Send + Sync {
    fn send(&self, event_key: &str);
}

/// Sink that keeps every key it receives, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys received so far.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Remove and return the keys received so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl AnalyticsSink for RecordingSink {
    fn send(&self, event_key: &str) {
        self.events.lock().push(event_key.to_owned());
    }
}

/// Work that must run on the UI-owning thread.
pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Marshals jobs onto the UI-owning thread.
pub trait UiDispatcher: Send + Sync {
    /// Schedule `job`. Must not block waiting for it to run.
    fn dispatch(&self, job: UiJob);
}

/// Runs jobs immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl UiDispatcher for InlineDispatcher {
    fn dispatch(&self, job: UiJob) {
        job();
    }
}

/// Queues jobs for a host UI loop to drain.
///
/// Pair with the [`UiJobQueue`] returned by [`QueueDispatcher::new`] and run
/// it from the UI thread.
#[derive(Debug, Clone)]
pub struct QueueDispatcher {
    tx: mpsc::UnboundedSender<UiJob>,
}

impl QueueDispatcher {
    pub fn new() -> (Self, UiJobQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, UiJobQueue { rx })
    }
}

impl UiDispatcher for QueueDispatcher {
    fn dispatch(&self, job: UiJob) {
        if self.tx.send(job).is_err() {
            tracing::debug!("UI job queue closed, job dropped");
        }
    }
}

/// Receiving end of a [`QueueDispatcher`], owned by the UI thread.
pub struct UiJobQueue {
    rx: mpsc::UnboundedReceiver<UiJob>,
}

impl UiJobQueue {
    /// Run every queued job without waiting. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Run jobs until every dispatcher is dropped. For a dedicated UI thread.
    pub fn run_blocking(mut self) {
        while let Some(job) = self.rx.blocking_recv() {
            job();
        }
    }
}

impl std::fmt::Debug for UiJobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiJobQueue").finish_non_exhaustive()
    }
}
