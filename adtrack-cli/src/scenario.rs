//! Scripted scroll scenarios.
//!
//! A scenario describes an element tree, the placements registered on it and
//! a timed script of host activity (scrolls, page flips, clicks). It is read
//! from JSON:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "id": "feed", "kind": "list", "bounds": [0, 0, 1080, 1920],
//!       "visible_range": [0, 2], "source": "native" },
//!     { "id": "hero", "parent": "feed", "kind": "group",
//!       "tag": "BannerHolder", "bounds": [0, 0, 1080, 600] }
//!   ],
//!   "ad_types": [
//!     { "name": "HomeBigBanner", "label": "Home_MainBanner", "names": ["Spring Sale"] }
//!   ],
//!   "registrations": [
//!     { "topology": "list", "ad_type": "HomeBigBanner", "list": "feed", "matcher": "BannerHolder" }
//!   ],
//!   "script": [
//!     { "at_ms": 500, "action": "scroll", "node": "feed", "dy": -600 }
//!   ],
//!   "run_until_ms": 2000
//! }
//! ```
//!
//! Event names come from each ad type's `names`, indexed by list position or
//! pager page. Positions past the end resolve to
//! [`UNKNOWN_EVENT_NAME`](adtrack::UNKNOWN_EVENT_NAME).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use adtrack::settle::ScrollFanout;
use adtrack::ui::{
    AnalyticsSink, Element, ElementMatcher, EventNameResolver, MemoryTree, NodeId, NodeKind, Rect,
    TreeEnumerator, UiDispatcher,
};
use adtrack::{
    AdType, DedupScope, ScrollTarget, SessionHandle, TrackerBuilder, TrackerConfig, TrackerFacade,
    UNKNOWN_EVENT_NAME,
};

use crate::error::CliError;

// ============================================================================
// Scenario file model
// ============================================================================

/// A complete scenario file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub nodes: Vec<NodeSpec>,
    pub ad_types: Vec<AdTypeSpec>,
    pub registrations: Vec<Registration>,
    #[serde(default)]
    pub script: Vec<ScriptStep>,
    /// How long to keep running after the last step so pending settles land.
    #[serde(default)]
    pub run_until_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    pub id: String,
    #[serde(default)]
    pub parent: Option<String>,
    pub kind: NodeKindSpec,
    #[serde(default)]
    pub tag: Option<String>,
    /// `[left, top, right, bottom]`
    pub bounds: [i32; 4],
    #[serde(default)]
    pub visible_range: Option<[usize; 2]>,
    #[serde(default)]
    pub page: Option<usize>,
    /// Attach a scroll source the script can drive.
    #[serde(default)]
    pub source: Option<SourceKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKindSpec {
    List,
    Pager,
    Group,
    Leaf,
}

impl From<NodeKindSpec> for NodeKind {
    fn from(kind: NodeKindSpec) -> Self {
        match kind {
            NodeKindSpec::List => NodeKind::List,
            NodeKindSpec::Pager => NodeKind::Pager,
            NodeKindSpec::Group => NodeKind::Group,
            NodeKindSpec::Leaf => NodeKind::Leaf,
        }
    }
}

/// Whether a node's scroll source reports its own idle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Motion ticks only; settling is detected by probing.
    Probed,
    /// Motion ticks plus explicit idle signals.
    Native,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdTypeSpec {
    pub name: String,
    pub label: String,
    /// Event names by position.
    #[serde(default)]
    pub names: Vec<String>,
}

/// A placement to register, tagged by container topology.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "topology", rename_all = "snake_case")]
pub enum Registration {
    List {
        ad_type: String,
        list: String,
        matcher: String,
    },
    NestedPager {
        ad_type: String,
        list: String,
        matcher: String,
    },
    ExternalScroll {
        ad_type: String,
        outer: String,
        inner_list: String,
        matcher: String,
    },
    ExternalScrollPager {
        ad_type: String,
        outer: String,
        pager: String,
    },
}

impl Registration {
    fn ad_type(&self) -> &str {
        match self {
            Registration::List { ad_type, .. }
            | Registration::NestedPager { ad_type, .. }
            | Registration::ExternalScroll { ad_type, .. }
            | Registration::ExternalScrollPager { ad_type, .. } => ad_type,
        }
    }

    fn nodes(&self) -> Vec<&str> {
        match self {
            Registration::List { list, .. } | Registration::NestedPager { list, .. } => {
                vec![list.as_str()]
            }
            Registration::ExternalScroll {
                outer, inner_list, ..
            } => vec![outer.as_str(), inner_list.as_str()],
            Registration::ExternalScrollPager { outer, pager, .. } => {
                vec![outer.as_str(), pager.as_str()]
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptStep {
    /// Offset from the start of the run.
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

/// Host activity at one point of the script.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// One motion tick from a node's scroll source.
    Motion { node: String },
    /// Idle transition from a native source.
    Idle { node: String },
    /// Move a container's content and emit one motion tick.
    Scroll {
        node: String,
        #[serde(default)]
        dx: i32,
        #[serde(default)]
        dy: i32,
    },
    /// Change a list's visible window; `null` means not laid out.
    VisibleRange {
        node: String,
        range: Option<[usize; 2]>,
    },
    /// Show another page of a pager.
    SetPage { node: String, page: usize },
    /// Page transition: forget page-scoped keys.
    ClearPage,
    /// Session expiry: forget session-scoped keys.
    ClearSession,
    /// Impression reported by the host itself.
    View { ad_type: String, event_name: String },
    Click { ad_type: String, event_name: String },
    /// Dispose a registration by its index in `registrations`.
    Dispose { registration: usize },
}

impl Action {
    fn node(&self) -> Option<&str> {
        match self {
            Action::Motion { node }
            | Action::Idle { node }
            | Action::Scroll { node, .. }
            | Action::VisibleRange { node, .. }
            | Action::SetPage { node, .. } => Some(node),
            _ => None,
        }
    }
}

impl Scenario {
    /// Parse a scenario from JSON text.
    pub fn from_json(json: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a scenario file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let json = std::fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Time of the last scripted step or `run_until_ms`, whichever is later.
    pub fn duration(&self) -> Duration {
        let last_step = self.script.iter().map(|s| s.at_ms).max().unwrap_or(0);
        Duration::from_millis(last_step.max(self.run_until_ms))
    }
}

// ============================================================================
// Event names
// ============================================================================

/// Resolves names from each ad type's `names` list.
#[derive(Debug, Default)]
pub struct ScenarioResolver {
    names: HashMap<String, Vec<String>>,
}

impl ScenarioResolver {
    pub fn new(ad_types: &[AdTypeSpec]) -> Self {
        Self {
            names: ad_types
                .iter()
                .map(|a| (a.name.clone(), a.names.clone()))
                .collect(),
        }
    }
}

impl EventNameResolver for ScenarioResolver {
    fn event_name(
        &self,
        ad_type: &AdType,
        position: Option<usize>,
        _element: Option<&Element>,
    ) -> Option<String> {
        let name = position
            .and_then(|p| self.names.get(ad_type.name())?.get(p))
            .cloned()
            .unwrap_or_else(|| UNKNOWN_EVENT_NAME.to_string());
        Some(name)
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationReport {
    /// Sessions registered at startup.
    pub sessions: usize,
    /// Sessions still active when the run ended.
    pub active_at_end: usize,
    /// Keys held by the dedup store when the run ended.
    pub stored_keys: usize,
    /// Script steps executed.
    pub steps: usize,
}

/// A scenario materialized into an element tree, ready to run.
pub struct Simulation {
    scenario: Scenario,
    tree: Arc<MemoryTree>,
    nodes: HashMap<String, NodeId>,
    ad_types: HashMap<String, AdType>,
}

impl Simulation {
    /// Build the element tree and check every reference in the scenario.
    ///
    /// Nodes must be listed parents first.
    pub fn new(scenario: Scenario) -> Result<Self, CliError> {
        let tree = Arc::new(MemoryTree::new());
        let mut nodes = HashMap::new();

        for spec in &scenario.nodes {
            if nodes.contains_key(&spec.id) {
                return Err(CliError::Scenario(format!("duplicate node id '{}'", spec.id)));
            }
            let [left, top, right, bottom] = spec.bounds;
            let bounds = Rect::new(left, top, right, bottom);
            let kind = NodeKind::from(spec.kind);

            let id = match &spec.parent {
                Some(parent) => {
                    let parent_id = lookup(&nodes, parent, "parent")?;
                    tree.add_child(parent_id, kind, spec.tag.as_deref(), bounds)
                }
                None => tree.add_root(kind, bounds),
            };
            if let Some([first, last]) = spec.visible_range {
                tree.set_visible_range(id, Some((first, last)));
            }
            if let Some(page) = spec.page {
                tree.set_current_page(id, page);
            }
            match spec.source {
                Some(SourceKind::Probed) => {
                    tree.attach_source(id, Arc::new(ScrollFanout::new()));
                }
                Some(SourceKind::Native) => {
                    tree.attach_source(id, Arc::new(ScrollFanout::with_native_idle()));
                }
                None => {}
            }
            nodes.insert(spec.id.clone(), id);
        }

        let mut ad_types = HashMap::new();
        for spec in &scenario.ad_types {
            let ad_type = AdType::owned(spec.name.clone(), spec.label.clone());
            if ad_types.insert(spec.name.clone(), ad_type).is_some() {
                return Err(CliError::Scenario(format!(
                    "duplicate ad type '{}'",
                    spec.name
                )));
            }
        }

        let simulation = Self {
            scenario,
            tree,
            nodes,
            ad_types,
        };
        simulation.check_references()?;
        Ok(simulation)
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    fn check_references(&self) -> Result<(), CliError> {
        for registration in &self.scenario.registrations {
            self.ad_type(registration.ad_type())?;
            for node in registration.nodes() {
                self.node(node)?;
            }
        }

        let registered = self.scenario.registrations.len();
        for step in &self.scenario.script {
            if let Some(node) = step.action.node() {
                self.node(node)?;
            }
            match &step.action {
                Action::Motion { node } | Action::Idle { node } | Action::Scroll { node, .. } => {
                    self.source(node)?;
                }
                Action::View { ad_type, .. } | Action::Click { ad_type, .. } => {
                    self.ad_type(ad_type)?;
                }
                Action::Dispose { registration } if *registration >= registered => {
                    return Err(CliError::Scenario(format!(
                        "dispose refers to registration {} but only {} exist",
                        registration, registered
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn node(&self, id: &str) -> Result<NodeId, CliError> {
        lookup(&self.nodes, id, "node")
    }

    fn ad_type(&self, name: &str) -> Result<&AdType, CliError> {
        self.ad_types
            .get(name)
            .ok_or_else(|| CliError::Scenario(format!("unknown ad type '{}'", name)))
    }

    fn source(&self, id: &str) -> Result<Arc<ScrollFanout>, CliError> {
        let node = self.node(id)?;
        self.tree
            .source(node)
            .ok_or_else(|| CliError::Scenario(format!("node '{}' has no scroll source", id)))
    }

    fn target(&self, id: &str) -> Result<ScrollTarget, CliError> {
        Ok(ScrollTarget::new(self.node(id)?, self.source(id)?))
    }

    /// Build a tracker for this scenario's tree.
    pub fn tracker(
        &self,
        config: TrackerConfig,
        sink: Arc<dyn AnalyticsSink>,
        dispatcher: Arc<dyn UiDispatcher>,
    ) -> Result<TrackerFacade, CliError> {
        let tracker = TrackerBuilder::new(Arc::new(TreeEnumerator::new(Arc::clone(&self.tree))))
            .with_config(config)
            .with_dispatcher(dispatcher)
            .with_resolver(Arc::new(ScenarioResolver::new(&self.scenario.ad_types)))
            .with_sink(sink)
            .build()?;
        Ok(tracker)
    }

    fn register(
        &self,
        tracker: &TrackerFacade,
        registration: &Registration,
    ) -> Result<SessionHandle, CliError> {
        let ad_type = self.ad_type(registration.ad_type())?.clone();
        let handle = match registration {
            Registration::List { list, matcher, .. } => tracker.register(
                ad_type,
                self.target(list)?,
                ElementMatcher::tag(matcher.as_str()),
            )?,
            Registration::NestedPager { list, matcher, .. } => tracker.register_nested_pager(
                ad_type,
                self.target(list)?,
                ElementMatcher::tag(matcher.as_str()),
            )?,
            Registration::ExternalScroll {
                outer,
                inner_list,
                matcher,
                ..
            } => tracker.register_external_scroll(
                ad_type,
                self.target(outer)?,
                self.node(inner_list)?,
                ElementMatcher::tag(matcher.as_str()),
            )?,
            Registration::ExternalScrollPager { outer, pager, .. } => tracker
                .register_external_scroll_pager(
                    ad_type,
                    self.target(outer)?,
                    self.target(pager)?,
                )?,
        };
        Ok(handle)
    }

    /// Register every placement, play the script, then dispose everything.
    ///
    /// Tree mutations and scroll notifications are sent through `dispatcher`
    /// so they interleave with the tracker's scans as they would on a real
    /// UI thread.
    pub async fn run(
        &self,
        config: TrackerConfig,
        sink: Arc<dyn AnalyticsSink>,
        dispatcher: Arc<dyn UiDispatcher>,
    ) -> Result<SimulationReport, CliError> {
        let tracker = self.tracker(config, sink, Arc::clone(&dispatcher))?;

        let mut handles = Vec::with_capacity(self.scenario.registrations.len());
        for registration in &self.scenario.registrations {
            let handle = self.register(&tracker, registration)?;
            debug!(session = %handle, "Registered placement");
            handles.push(handle);
        }
        info!(
            sessions = handles.len(),
            steps = self.scenario.script.len(),
            "Scenario started"
        );

        let mut steps: Vec<&ScriptStep> = self.scenario.script.iter().collect();
        steps.sort_by_key(|s| s.at_ms);

        let start = Instant::now();
        for step in &steps {
            sleep_until(start + Duration::from_millis(step.at_ms)).await;
            debug!(at_ms = step.at_ms, action = ?step.action, "Script step");
            self.apply(&tracker, &handles, dispatcher.as_ref(), &step.action)?;
        }
        sleep_until(start + self.scenario.duration()).await;

        let report = SimulationReport {
            sessions: handles.len(),
            active_at_end: tracker.active_sessions(),
            stored_keys: DedupScope::ALL
                .iter()
                .map(|scope| tracker.store().len(*scope))
                .sum(),
            steps: steps.len(),
        };
        let disposed = tracker.dispose_all();
        info!(disposed, stored_keys = report.stored_keys, "Scenario finished");
        Ok(report)
    }

    fn apply(
        &self,
        tracker: &TrackerFacade,
        handles: &[SessionHandle],
        dispatcher: &dyn UiDispatcher,
        action: &Action,
    ) -> Result<(), CliError> {
        match action {
            Action::Motion { node } => {
                let source = self.source(node)?;
                dispatcher.dispatch(Box::new(move || source.notify_motion()));
            }
            Action::Idle { node } => {
                let source = self.source(node)?;
                dispatcher.dispatch(Box::new(move || source.notify_idle()));
            }
            Action::Scroll { node, dx, dy } => {
                let (id, source) = (self.node(node)?, self.source(node)?);
                let (tree, dx, dy) = (Arc::clone(&self.tree), *dx, *dy);
                dispatcher.dispatch(Box::new(move || {
                    tree.offset_descendants(id, dx, dy);
                    source.notify_motion();
                }));
            }
            Action::VisibleRange { node, range } => {
                let id = self.node(node)?;
                let (tree, range) = (Arc::clone(&self.tree), range.map(|[a, b]| (a, b)));
                dispatcher.dispatch(Box::new(move || {
                    tree.set_visible_range(id, range);
                }));
            }
            Action::SetPage { node, page } => {
                let id = self.node(node)?;
                let (tree, page) = (Arc::clone(&self.tree), *page);
                dispatcher.dispatch(Box::new(move || {
                    tree.set_current_page(id, page);
                }));
            }
            Action::ClearPage => tracker.clear_page_scope(),
            Action::ClearSession => tracker.clear_session_scope(),
            Action::View {
                ad_type,
                event_name,
            } => {
                tracker.track_view(self.ad_type(ad_type)?, event_name)?;
            }
            Action::Click {
                ad_type,
                event_name,
            } => {
                tracker.track_click(self.ad_type(ad_type)?, event_name)?;
            }
            Action::Dispose { registration } => {
                let handle = handles.get(*registration).copied().ok_or_else(|| {
                    CliError::Scenario(format!("no registration {}", registration))
                })?;
                tracker.dispose(handle);
            }
        }
        Ok(())
    }
}

fn lookup(nodes: &HashMap<String, NodeId>, id: &str, what: &str) -> Result<NodeId, CliError> {
    nodes
        .get(id)
        .copied()
        .ok_or_else(|| CliError::Scenario(format!("unknown {} '{}'", what, id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adtrack::ui::{InlineDispatcher, RecordingSink};

    const FEED: &str = r#"{
        "nodes": [
            { "id": "feed", "kind": "list", "bounds": [0, 0, 1080, 1920],
              "visible_range": [0, 1], "source": "native" },
            { "id": "hero", "parent": "feed", "kind": "group", "tag": "Banner",
              "bounds": [0, 0, 1080, 600] },
            { "id": "below", "parent": "feed", "kind": "group", "tag": "Banner",
              "bounds": [0, 1800, 1080, 2400] }
        ],
        "ad_types": [
            { "name": "HomeBigBanner", "label": "Home", "names": ["Spring Sale"] }
        ],
        "registrations": [
            { "topology": "list", "ad_type": "HomeBigBanner", "list": "feed", "matcher": "Banner" }
        ],
        "script": [
            { "at_ms": 1000, "action": "scroll", "node": "feed", "dy": -600 },
            { "at_ms": 1100, "action": "idle", "node": "feed" },
            { "at_ms": 1500, "action": "click", "ad_type": "HomeBigBanner", "event_name": "Spring Sale" }
        ],
        "run_until_ms": 2000
    }"#;

    fn feed() -> Scenario {
        Scenario::from_json(FEED).unwrap()
    }

    #[test]
    fn test_parse_scenario() {
        let scenario = feed();

        assert_eq!(scenario.nodes.len(), 3);
        assert_eq!(scenario.nodes[0].source, Some(SourceKind::Native));
        assert_eq!(scenario.nodes[1].parent.as_deref(), Some("feed"));
        assert!(matches!(
            scenario.registrations[0],
            Registration::List { ref matcher, .. } if matcher == "Banner"
        ));
        assert!(matches!(
            scenario.script[0].action,
            Action::Scroll { dx: 0, dy: -600, .. }
        ));
        assert_eq!(scenario.duration(), Duration::from_millis(2000));
    }

    #[test]
    fn test_bundled_scenario_is_valid() {
        let scenario = Scenario::from_json(include_str!("../scenarios/home.json")).unwrap();
        let simulation = Simulation::new(scenario).unwrap();
        assert_eq!(simulation.scenario().registrations.len(), 4);
    }

    #[test]
    fn test_unknown_action_rejected() {
        let json = r#"{ "nodes": [], "ad_types": [], "registrations": [],
            "script": [{ "at_ms": 0, "action": "teleport" }] }"#;
        assert!(matches!(
            Scenario::from_json(json),
            Err(CliError::ScenarioJson(_))
        ));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let json = r#"{ "nodes": [
            { "id": "orphan", "parent": "missing", "kind": "leaf", "bounds": [0, 0, 1, 1] }
        ], "ad_types": [], "registrations": [] }"#;
        let err = Simulation::new(Scenario::from_json(json).unwrap()).err();

        assert!(matches!(err, Some(CliError::Scenario(msg)) if msg.contains("missing")));
    }

    #[test]
    fn test_scroll_needs_source() {
        let json = r#"{ "nodes": [
            { "id": "feed", "kind": "list", "bounds": [0, 0, 10, 10] }
        ], "ad_types": [], "registrations": [],
        "script": [{ "at_ms": 0, "action": "motion", "node": "feed" }] }"#;
        let err = Simulation::new(Scenario::from_json(json).unwrap()).err();

        assert!(matches!(err, Some(CliError::Scenario(msg)) if msg.contains("no scroll source")));
    }

    #[test]
    fn test_dispose_index_checked() {
        let mut scenario = feed();
        scenario.script.push(ScriptStep {
            at_ms: 0,
            action: Action::Dispose { registration: 3 },
        });
        assert!(matches!(
            Simulation::new(scenario),
            Err(CliError::Scenario(_))
        ));
    }

    #[test]
    fn test_resolver_falls_back_to_unknown() {
        let scenario = feed();
        let resolver = ScenarioResolver::new(&scenario.ad_types);
        let banner = AdType::owned("HomeBigBanner", "Home");
        let other = AdType::owned("Other", "Other");

        assert_eq!(
            resolver.event_name(&banner, Some(0), None).as_deref(),
            Some("Spring Sale")
        );
        assert_eq!(
            resolver.event_name(&banner, Some(5), None).as_deref(),
            Some(UNKNOWN_EVENT_NAME)
        );
        assert_eq!(
            resolver.event_name(&other, Some(0), None).as_deref(),
            Some(UNKNOWN_EVENT_NAME)
        );
    }

    /// The first banner is counted at startup; scrolling reveals the second
    /// (beyond the name list); the click reuses the first banner's name.
    #[tokio::test(start_paused = true)]
    async fn test_run_feed() {
        let simulation = Simulation::new(feed()).unwrap();
        let sink = Arc::new(RecordingSink::new());

        let report = simulation
            .run(
                TrackerConfig::default(),
                sink.clone(),
                Arc::new(InlineDispatcher),
            )
            .await
            .unwrap();

        assert_eq!(
            sink.events(),
            vec![
                "Home_SV_Spring_Sale",
                "Home_PV_Spring_Sale",
                "Home_SV_Unknown",
                "Home_PV_Unknown",
                "Home_SC_Spring_Sale",
                "Home_C_Spring_Sale",
            ]
        );
        assert_eq!(report.sessions, 1);
        assert_eq!(report.active_at_end, 1);
        assert_eq!(report.stored_keys, 6);
        assert_eq!(report.steps, 3);
    }

    /// Every topology in the bundled scenario reports what it scrolled into
    /// view, and repeated clicks are counted once.
    #[tokio::test(start_paused = true)]
    async fn test_run_bundled_scenario() {
        let scenario = Scenario::from_json(include_str!("../scenarios/home.json")).unwrap();
        let simulation = Simulation::new(scenario).unwrap();
        let sink = Arc::new(RecordingSink::new());

        let report = simulation
            .run(
                TrackerConfig::default(),
                sink.clone(),
                Arc::new(InlineDispatcher),
            )
            .await
            .unwrap();
        let events = sink.events();
        let count = |key: &str| events.iter().filter(|e| e.as_str() == key).count();

        assert_eq!(count("Home_MainBanner_SV_Spring_Sale"), 1);
        assert_eq!(count("Home_MainBanner_SV_Clearance"), 1);
        assert_eq!(count("Home_Carousel_SV_Slide_A"), 1);
        assert_eq!(count("Home_Carousel_SV_Slide_B"), 1);
        assert_eq!(count("Detail_Related_SV_Similar_Items"), 1);
        assert_eq!(count("Detail_Gallery_SV_Photo_1"), 1);
        assert_eq!(count("Detail_Gallery_SV_Photo_3"), 1);
        assert_eq!(count("Home_MainBanner_SC_Spring_Sale"), 1);
        assert_eq!(count("Home_MainBanner_C_Spring_Sale"), 1);

        // Page scope cleared at 5000ms, banners still on screen counted again
        assert_eq!(count("Home_MainBanner_PV_Clearance"), 2);
        assert_eq!(count("Home_MainBanner_SV_Free_Shipping"), 1);

        assert_eq!(report.sessions, 4);
        assert_eq!(report.active_at_end, 3);
    }
}
