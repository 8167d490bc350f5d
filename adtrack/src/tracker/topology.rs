//! Container topologies and the per-settle candidate scan.
//!
//! A [`Topology`] says which sources a session listens to and how their
//! idles combine. Its [`Layout`] is the node-only half that the UI-thread
//! scan needs:
//!
//! | Layout               | Sources                       | Combine | Candidates                      |
//! |----------------------|-------------------------------|---------|---------------------------------|
//! | `List`               | list                          | each    | matched elements                |
//! | `PagerInList`        | list + discovered pagers      | each    | pagers inside matched elements  |
//! | `ExternalScrollList` | outer scroll                  | each    | matched elements of inner list  |
//! | `ExternalScrollPager`| outer scroll, pager           | all     | the pager itself                |

use std::fmt;
use std::sync::Arc;

use crate::ad::AdType;
use crate::settle::{Combine, ScrollSource, SourceId, SourceSpec};
use crate::ui::{
    ChildEnumerator, Element, ElementMatcher, EventNameResolver, NodeId, Rect,
    VisibilityClassifier,
};

/// Source id of the container that drives a session.
pub(crate) const PRIMARY_SOURCE: SourceId = SourceId(0);

/// Source id of the pager joined with an external scroll container.
pub(crate) const PAGER_SOURCE: SourceId = SourceId(1);

/// A scrollable node together with the source that reports its motion.
#[derive(Clone)]
pub struct ScrollTarget {
    pub node: NodeId,
    pub source: Arc<dyn ScrollSource>,
}

impl ScrollTarget {
    pub fn new(node: NodeId, source: Arc<dyn ScrollSource>) -> Self {
        Self { node, source }
    }
}

impl fmt::Debug for ScrollTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollTarget")
            .field("node", &self.node)
            .field("reports_idle", &self.source.reports_idle())
            .finish()
    }
}

/// Node-level shape of a tracked region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Layout {
    List {
        list: NodeId,
        matcher: ElementMatcher,
    },
    PagerInList {
        list: NodeId,
        matcher: ElementMatcher,
    },
    ExternalScrollList {
        outer: NodeId,
        inner_list: NodeId,
        matcher: ElementMatcher,
    },
    ExternalScrollPager {
        outer: NodeId,
        pager: NodeId,
    },
}

/// One element that passed visibility and naming on a settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub position: Option<usize>,
    pub name: String,
}

/// Collaborators the scan consults, borrowed for one run.
pub(crate) struct ScanContext<'a> {
    pub ad_type: &'a AdType,
    pub enumerator: &'a dyn ChildEnumerator,
    pub classifier: &'a dyn VisibilityClassifier,
    pub resolver: &'a dyn EventNameResolver,
}

impl ScanContext<'_> {
    fn fully_visible(&self, container: Rect, node: NodeId) -> bool {
        self.enumerator
            .bounds(node)
            .is_some_and(|bounds| self.classifier.classify(container, bounds).is_full())
    }

    fn resolve(&self, position: Option<usize>, element: Option<&Element>) -> Option<Candidate> {
        let name = self
            .resolver
            .event_name(self.ad_type, position, element)
            .filter(|name| !name.is_empty())?;
        Some(Candidate { position, name })
    }
}

impl Layout {
    pub fn name(&self) -> &'static str {
        match self {
            Layout::List { .. } => "list",
            Layout::PagerInList { .. } => "pager-in-list",
            Layout::ExternalScrollList { .. } => "external-scroll-list",
            Layout::ExternalScrollPager { .. } => "external-scroll-pager",
        }
    }

    /// The node whose bounds elements must fit inside.
    pub fn container(&self) -> NodeId {
        match self {
            Layout::List { list, .. } | Layout::PagerInList { list, .. } => *list,
            Layout::ExternalScrollList { outer, .. } | Layout::ExternalScrollPager { outer, .. } => {
                *outer
            }
        }
    }

    /// Collect the named, fully visible candidates for one settle.
    ///
    /// `on_pager` is called for every pager found inside a matched element,
    /// whether or not it is visible. Must run on the UI-owning thread.
    pub fn scan(&self, ctx: &ScanContext<'_>, on_pager: &mut dyn FnMut(NodeId)) -> Vec<Candidate> {
        let Some(container) = ctx.enumerator.bounds(self.container()) else {
            tracing::trace!(layout = self.name(), "Container has no bounds, nothing to scan");
            return Vec::new();
        };

        match self {
            Layout::List { list, matcher }
            | Layout::ExternalScrollList {
                inner_list: list,
                matcher,
                ..
            } => {
                let elements = ctx.enumerator.matching_children(*list, matcher);
                elements
                    .iter()
                    .filter(|element| ctx.fully_visible(container, element.node))
                    .filter_map(|element| ctx.resolve(element.position, Some(element)))
                    .collect()
            }

            Layout::PagerInList { list, matcher } => {
                let mut candidates = Vec::new();
                for element in ctx.enumerator.matching_children(*list, matcher) {
                    for pager in ctx.enumerator.descendant_pagers(element.node) {
                        on_pager(pager);
                        if !ctx.fully_visible(container, pager) {
                            continue;
                        }
                        let page = ctx.enumerator.current_page(pager);
                        candidates.extend(ctx.resolve(page, None));
                    }
                }
                candidates
            }

            Layout::ExternalScrollPager { pager, .. } => {
                if !ctx.fully_visible(container, *pager) {
                    return Vec::new();
                }
                let page = ctx.enumerator.current_page(*pager);
                ctx.resolve(page, None).into_iter().collect()
            }
        }
    }
}

/// What a session listens to and what it scans on settle.
pub(crate) struct Topology {
    pub layout: Layout,
    pub sources: Vec<(SourceSpec, Arc<dyn ScrollSource>)>,
    pub combine: Combine,
}

impl Topology {
    pub fn list(list: ScrollTarget, matcher: ElementMatcher) -> Self {
        Self {
            layout: Layout::List {
                list: list.node,
                matcher,
            },
            sources: vec![primary(list.source)],
            combine: Combine::Each,
        }
    }

    /// Each pager found by a scan joins the settle loop as a source of its
    /// own, settling independently of the list.
    pub fn pager_in_list(list: ScrollTarget, matcher: ElementMatcher) -> Self {
        Self {
            layout: Layout::PagerInList {
                list: list.node,
                matcher,
            },
            sources: vec![primary(list.source)],
            combine: Combine::Each,
        }
    }

    pub fn external_scroll_list(
        outer: ScrollTarget,
        inner_list: NodeId,
        matcher: ElementMatcher,
    ) -> Self {
        Self {
            layout: Layout::ExternalScrollList {
                outer: outer.node,
                inner_list,
                matcher,
            },
            sources: vec![primary(outer.source)],
            combine: Combine::Each,
        }
    }

    pub fn external_scroll_pager(outer: ScrollTarget, pager: ScrollTarget) -> Self {
        let pager_spec = spec_for(PAGER_SOURCE, pager.source.as_ref());
        Self {
            layout: Layout::ExternalScrollPager {
                outer: outer.node,
                pager: pager.node,
            },
            sources: vec![primary(outer.source), (pager_spec, pager.source)],
            combine: Combine::All,
        }
    }

    /// Whether pagers discovered during scans should be listened to.
    pub fn listens_to_pagers(&self) -> bool {
        matches!(self.layout, Layout::PagerInList { .. })
    }

    pub fn specs(&self) -> Vec<SourceSpec> {
        self.sources.iter().map(|(spec, _)| *spec).collect()
    }
}

fn primary(source: Arc<dyn ScrollSource>) -> (SourceSpec, Arc<dyn ScrollSource>) {
    (spec_for(PRIMARY_SOURCE, source.as_ref()), source)
}

fn spec_for(id: SourceId, source: &dyn ScrollSource) -> SourceSpec {
    if source.reports_idle() {
        SourceSpec::native(id)
    } else {
        SourceSpec::probed(id)
    }
}
