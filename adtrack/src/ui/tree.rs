//! Element lookup over an abstract element tree.
//!
//! [`UiTree`] is the minimum a host exposes about its element hierarchy;
//! [`TreeEnumerator`] builds the [`ChildEnumerator`] the tracker needs on top
//! of it.
//!
//! Traversal is iterative and only ever visits realized children: a list is
//! scanned across its visible position range, and nested lists found inside a
//! realized child are queued and scanned the same way. A list that reports no
//! visible range contributes nothing.

use std::collections::VecDeque;
use std::sync::Arc;

use super::{ChildEnumerator, Element, ElementMatcher, NodeId, NodeKind, Rect};
use crate::settle::ScrollSource;

/// Read access to the host's element tree.
pub trait UiTree: Send + Sync {
    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Host-assigned tag matched by [`ElementMatcher`].
    fn tag(&self, node: NodeId) -> Option<String>;

    /// Realized direct children.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// First and last visible positions of a list, inclusive.
    fn visible_range(&self, list: NodeId) -> Option<(usize, usize)>;

    /// Realized child of a list at `position`.
    fn child_at_position(&self, list: NodeId, position: usize) -> Option<NodeId>;

    /// Screen bounds of `node`.
    fn bounds(&self, node: NodeId) -> Option<Rect>;

    /// Page currently shown by a pager.
    fn current_page(&self, pager: NodeId) -> Option<usize>;

    /// Signal source attached to `node`, if the host exposes one.
    fn scroll_source(&self, _node: NodeId) -> Option<Arc<dyn ScrollSource>> {
        None
    }
}

/// [`ChildEnumerator`] backed by a [`UiTree`].
#[derive(Debug)]
pub struct TreeEnumerator<T: ?Sized> {
    tree: Arc<T>,
}

impl<T: UiTree + ?Sized> TreeEnumerator<T> {
    pub fn new(tree: Arc<T>) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &Arc<T> {
        &self.tree
    }

    /// Nodes of `kind` under `root` (including `root` itself), without
    /// descending past a match.
    fn find_kind(&self, root: NodeId, kind: NodeKind, include_root: bool) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            if (node != root || include_root) && self.tree.kind(node) == Some(kind) {
                found.push(node);
                continue;
            }
            let children = self.tree.children(node);
            // Reverse so children are visited in layout order
            stack.extend(children.into_iter().rev());
        }

        found
    }
}

impl<T: UiTree + ?Sized> ChildEnumerator for TreeEnumerator<T> {
    fn matching_children(&self, container: NodeId, matcher: &ElementMatcher) -> Vec<Element> {
        let mut matched = Vec::new();
        let mut lists = VecDeque::from([container]);

        while let Some(list) = lists.pop_front() {
            let Some((first, last)) = self.tree.visible_range(list) else {
                tracing::trace!(list = list.0, "No visible range, skipping list");
                continue;
            };
            if first > last {
                continue;
            }

            for position in first..=last {
                let Some(child) = self.tree.child_at_position(list, position) else {
                    continue;
                };

                let tag = self.tree.tag(child);
                if tag.as_deref().is_some_and(|t| matcher.matches(t)) {
                    matched.push(Element {
                        node: child,
                        position: Some(position),
                        tag,
                    });
                }

                lists.extend(self.find_kind(child, NodeKind::List, true));
            }
        }

        matched
    }

    fn descendant_pagers(&self, element: NodeId) -> Vec<NodeId> {
        self.find_kind(element, NodeKind::Pager, false)
    }

    fn bounds(&self, node: NodeId) -> Option<Rect> {
        self.tree.bounds(node)
    }

    fn current_page(&self, pager: NodeId) -> Option<usize> {
        self.tree.current_page(pager)
    }

    fn pager_source(&self, pager: NodeId) -> Option<Arc<dyn ScrollSource>> {
        self.tree.scroll_source(pager)
    }
}
