//! Joining several sources into one settle decision.
//!
//! Used when an outer container and an inner paged widget must both be at
//! rest before anything is tracked. The join is recomputed on every state
//! change of any source, so it settles as soon as the last moving source
//! stops rather than on the next timer.

use super::detector::SettleState;
use super::source::SourceId;

/// All-sources-idle join over a fixed set of sources.
#[derive(Debug, Clone)]
pub struct SettleJoin {
    states: Vec<(SourceId, SettleState)>,

    /// Settle already reported for the current all-idle period.
    settled: bool,
}

impl SettleJoin {
    /// Create a join over `sources`, each starting in `Scrolling`.
    pub fn new(sources: impl IntoIterator<Item = SourceId>) -> Self {
        Self {
            states: sources
                .into_iter()
                .map(|id| (id, SettleState::Scrolling))
                .collect(),
            settled: false,
        }
    }

    /// Add a source that joined late. It starts `Scrolling`, so the join
    /// waits for its first idle. `false` if the source is already tracked.
    pub fn add_source(&mut self, source: SourceId) -> bool {
        if self.state_of(source).is_some() {
            return false;
        }
        self.states.push((source, SettleState::Scrolling));
        self.settled = false;
        true
    }

    /// Apply a state change for `source`.
    ///
    /// # Returns
    ///
    /// `true` exactly once per period in which every source is idle, on the
    /// update that completes it. Updates for unknown sources are ignored.
    pub fn update(&mut self, source: SourceId, state: SettleState) -> bool {
        let Some(slot) = self.states.iter_mut().find(|(id, _)| *id == source) else {
            tracing::trace!(%source, "Join update for unknown source ignored");
            return false;
        };
        slot.1 = state;

        if !self.all_idle() {
            self.settled = false;
            return false;
        }
        if self.settled {
            return false;
        }
        self.settled = true;
        true
    }

    /// Whether every source is currently idle.
    pub fn all_idle(&self) -> bool {
        self.states.iter().all(|(_, state)| state.is_idle())
    }

    /// Whether a settle has been reported for the current all-idle period.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Current state of `source`.
    pub fn state_of(&self, source: SourceId) -> Option<SettleState> {
        self.states
            .iter()
            .find(|(id, _)| *id == source)
            .map(|(_, state)| *state)
    }

    /// Sources still moving.
    pub fn scrolling_sources(&self) -> Vec<SourceId> {
        self.states
            .iter()
            .filter(|(_, state)| !state.is_idle())
            .map(|(id, _)| *id)
            .collect()
    }
}
