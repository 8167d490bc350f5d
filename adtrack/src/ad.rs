//! Ad placements and event key formatting.
//!
//! Every tracked event is identified by a key of the form
//! `{TypeLabel}_{Qualifier}_{EventName}` with spaces replaced by `_`.
//!
//! | Kind  | Session scope | Page scope |
//! |-------|---------------|------------|
//! | View  | `SV`          | `PV`       |
//! | Click | `SC`          | `C`        |

use std::borrow::Cow;
use std::fmt;

use crate::dedup::DedupScope;

/// Event name a resolver returns when it does not recognise the placement.
///
/// The sentinel is still deduplicated and sent like any other name.
pub const UNKNOWN_EVENT_NAME: &str = "Unknown";

/// A trackable ad placement.
///
/// The crate does not fix the set of placements. Each host closes it by
/// declaring its placements as constants (`new` is `const`), and resolvers
/// match on those. [`AdType::owned`] covers placements loaded at runtime.
///
/// ```
/// use adtrack::AdType;
///
/// const HOME_BIG_BANNER: AdType = AdType::new("HomeBigBanner", "Home_MainBanner");
/// assert_eq!(HOME_BIG_BANNER.label(), "Home_MainBanner");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdType {
    name: Cow<'static, str>,
    label: Cow<'static, str>,
}

impl AdType {
    /// Create a placement with a static identifier and display label.
    pub const fn new(name: &'static str, label: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            label: Cow::Borrowed(label),
        }
    }

    /// Create a placement from runtime strings (e.g. loaded from a file).
    pub fn owned(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            label: Cow::Owned(label.into()),
        }
    }

    /// Identifier used in logs and by resolvers.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display label used as the first segment of event keys.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Build the key for an event of `kind` in `scope`.
    pub fn event_key(&self, kind: EventKind, scope: DedupScope, event_name: &str) -> String {
        format!("{}_{}_{}", self.label, kind.qualifier(scope), event_name).replace(' ', "_")
    }

    /// Build a view key (`SV` for session scope, `PV` for page scope).
    pub fn view_key(&self, event_name: &str, scope: DedupScope) -> String {
        self.event_key(EventKind::View, scope, event_name)
    }

    /// Build a click key (`SC` for session scope, `C` for page scope).
    pub fn click_key(&self, event_name: &str, scope: DedupScope) -> String {
        self.event_key(EventKind::Click, scope, event_name)
    }
}

impl fmt::Display for AdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// What the user did with the placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The placement was fully visible when its container settled.
    View,
    /// The placement was clicked.
    Click,
}

impl EventKind {
    /// Key qualifier for this kind in the given dedup scope.
    pub fn qualifier(self, scope: DedupScope) -> &'static str {
        match (self, scope) {
            (EventKind::View, DedupScope::Session) => "SV",
            (EventKind::View, DedupScope::Page) => "PV",
            (EventKind::Click, DedupScope::Session) => "SC",
            (EventKind::Click, DedupScope::Page) => "C",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::View => write!(f, "view"),
            EventKind::Click => write!(f, "click"),
        }
    }
}
