//! In-process element tree for headless hosts and tests.
//!
//! A list's realized children are its children in insertion order, indexed
//! by position. Scrolling is modelled by moving descendant bounds and
//! updating the visible range; attached [`ScrollFanout`]s stand in for the
//! widgets' scroll callbacks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{NodeId, NodeKind, Rect, UiTree};
use crate::settle::{ScrollFanout, ScrollSource};

#[derive(Debug, Clone)]
struct MemoryNode {
    kind: NodeKind,
    tag: Option<String>,
    children: Vec<NodeId>,
    bounds: Rect,
    visible_range: Option<(usize, usize)>,
    current_page: Option<usize>,
    source: Option<Arc<ScrollFanout>>,
}

impl MemoryNode {
    fn new(kind: NodeKind, tag: Option<&str>, bounds: Rect) -> Self {
        Self {
            kind,
            tag: tag.map(str::to_owned),
            children: Vec::new(),
            bounds,
            visible_range: None,
            current_page: (kind == NodeKind::Pager).then_some(0),
            source: None,
        }
    }
}

/// Mutable in-memory [`UiTree`].
#[derive(Debug, Default)]
pub struct MemoryTree {
    nodes: RwLock<HashMap<NodeId, MemoryNode>>,
    next_id: AtomicU64,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with no parent.
    pub fn add_root(&self, kind: NodeKind, bounds: Rect) -> NodeId {
        let id = self.allocate();
        self.nodes
            .write()
            .insert(id, MemoryNode::new(kind, None, bounds));
        id
    }

    /// Add a node as the last child of `parent`.
    ///
    /// If `parent` is unknown the node is created detached.
    pub fn add_child(
        &self,
        parent: NodeId,
        kind: NodeKind,
        tag: Option<&str>,
        bounds: Rect,
    ) -> NodeId {
        let id = self.allocate();
        let mut nodes = self.nodes.write();
        nodes.insert(id, MemoryNode::new(kind, tag, bounds));
        match nodes.get_mut(&parent) {
            Some(parent_node) => parent_node.children.push(id),
            None => tracing::warn!(parent = parent.0, "Parent not found, node left detached"),
        }
        id
    }

    pub fn set_bounds(&self, node: NodeId, bounds: Rect) -> bool {
        self.update(node, |n| n.bounds = bounds)
    }

    /// Set a list's visible window; `None` means the list is not laid out.
    pub fn set_visible_range(&self, list: NodeId, range: Option<(usize, usize)>) -> bool {
        self.update(list, |n| n.visible_range = range)
    }

    pub fn set_current_page(&self, pager: NodeId, page: usize) -> bool {
        self.update(pager, |n| n.current_page = Some(page))
    }

    /// Attach the signal source the host's scroll callback feeds.
    pub fn attach_source(&self, node: NodeId, source: Arc<ScrollFanout>) -> bool {
        self.update(node, |n| n.source = Some(source))
    }

    /// The source attached to `node`.
    pub fn source(&self, node: NodeId) -> Option<Arc<ScrollFanout>> {
        self.nodes.read().get(&node).and_then(|n| n.source.clone())
    }

    /// Move every descendant of `container` by `(dx, dy)`, as scrolling its
    /// content would. The container itself does not move.
    pub fn offset_descendants(&self, container: NodeId, dx: i32, dy: i32) -> usize {
        let mut nodes = self.nodes.write();
        let mut stack = match nodes.get(&container) {
            Some(node) => node.children.clone(),
            None => return 0,
        };
        let mut moved = 0;

        while let Some(id) = stack.pop() {
            if let Some(node) = nodes.get_mut(&id) {
                node.bounds = node.bounds.offset(dx, dy);
                stack.extend(node.children.iter().copied());
                moved += 1;
            }
        }

        moved
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    fn allocate(&self) -> NodeId {
        NodeId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn update(&self, node: NodeId, f: impl FnOnce(&mut MemoryNode)) -> bool {
        match self.nodes.write().get_mut(&node) {
            Some(n) => {
                f(n);
                true
            }
            None => false,
        }
    }
}

impl UiTree for MemoryTree {
    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.read().get(&node).map(|n| n.kind)
    }

    fn tag(&self, node: NodeId) -> Option<String> {
        self.nodes.read().get(&node).and_then(|n| n.tag.clone())
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .read()
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn visible_range(&self, list: NodeId) -> Option<(usize, usize)> {
        self.nodes.read().get(&list).and_then(|n| n.visible_range)
    }

    fn child_at_position(&self, list: NodeId, position: usize) -> Option<NodeId> {
        self.nodes
            .read()
            .get(&list)
            .and_then(|n| n.children.get(position).copied())
    }

    fn bounds(&self, node: NodeId) -> Option<Rect> {
        self.nodes.read().get(&node).map(|n| n.bounds)
    }

    fn current_page(&self, pager: NodeId) -> Option<usize> {
        self.nodes.read().get(&pager).and_then(|n| n.current_page)
    }

    fn scroll_source(&self, node: NodeId) -> Option<Arc<dyn ScrollSource>> {
        self.source(node).map(|s| s as Arc<dyn ScrollSource>)
    }
}
