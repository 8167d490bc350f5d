//! Two-tier at-most-once event gating.
//!
//! The store keeps two independent key sets:
//!
//! - **Session**: lives for the whole app session and is cleared only on
//!   explicit session expiry (e.g. re-login after an hour away).
//! - **Page**: lives for one screen and is cleared on every page transition.
//!
//! A returning user who revisits a page gets a fresh `PV` key but never a
//! repeated `SV` key. Keys are never removed individually; a key stays in its
//! set until that whole scope is cleared.
//!
//! # Thread Safety
//!
//! Every session of every tracker shares one store through `Arc`. The
//! check-and-insert in [`EventDedupStore::try_emit`] is a single `DashSet`
//! insert, so concurrent callers racing on the same key see exactly one
//! `true`.

use std::fmt;

use dashmap::DashSet;

/// Lifetime of a deduplicated key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DedupScope {
    /// Until the app session expires.
    Session,
    /// Until the current page is left.
    Page,
}

impl DedupScope {
    /// Both scopes, session first (the order keys are emitted in).
    pub const ALL: [DedupScope; 2] = [DedupScope::Session, DedupScope::Page];

    /// Short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DedupScope::Session => "session",
            DedupScope::Page => "page",
        }
    }
}

impl fmt::Display for DedupScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session- and page-scoped sets of already emitted event keys.
#[derive(Debug, Default)]
pub struct EventDedupStore {
    session: DashSet<String>,
    page: DashSet<String>,
}

impl EventDedupStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key` in `scope`.
    ///
    /// Returns `true` if this is the first occurrence of the key since the
    /// scope was last cleared, `false` otherwise.
    pub fn try_emit(&self, scope: DedupScope, key: &str) -> bool {
        let set = self.set(scope);
        // Fast path avoids allocating for keys seen before
        if set.contains(key) {
            return false;
        }
        set.insert(key.to_owned())
    }

    /// Whether `key` has been emitted in `scope`.
    pub fn contains(&self, scope: DedupScope, key: &str) -> bool {
        self.set(scope).contains(key)
    }

    /// Number of keys currently held in `scope`.
    pub fn len(&self, scope: DedupScope) -> usize {
        self.set(scope).len()
    }

    /// Whether both scopes are empty.
    pub fn is_empty(&self) -> bool {
        self.session.is_empty() && self.page.is_empty()
    }

    /// Forget every page-scoped key. Session keys are untouched.
    pub fn clear_page(&self) {
        let cleared = self.page.len();
        self.page.clear();
        tracing::debug!(cleared, "Page scope cleared");
    }

    /// Forget every session-scoped key. Page keys are untouched.
    pub fn clear_session(&self) {
        let cleared = self.session.len();
        self.session.clear();
        tracing::debug!(cleared, "Session scope cleared");
    }

    fn set(&self, scope: DedupScope) -> &DashSet<String> {
        match scope {
            DedupScope::Session => &self.session,
            DedupScope::Page => &self.page,
        }
    }
}
