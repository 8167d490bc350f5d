//! Signal routing across a session's detectors.
//!
//! The engine owns one [`SettleDetector`] per source and decides how their
//! idle transitions combine:
//!
//! - [`Combine::Each`]: every source settles on its own.
//! - [`Combine::All`]: a single settle once every source is idle at the same
//!   time (see [`SettleJoin`]).
//!
//! It is a plain state machine; the async loop that feeds it signals and
//! probe ticks lives in [`driver`](super::driver).

use std::time::{Duration, Instant};

use super::detector::{MotionOutcome, SettleDetector, SettleState};
use super::join::SettleJoin;
use super::source::{ScrollSignal, SignalKind, SourceId};

/// A source the engine tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpec {
    pub id: SourceId,
    /// The source reports its own idle transition.
    pub native_idle: bool,
}

impl SourceSpec {
    /// A source that needs the quiescence probe.
    pub fn probed(id: SourceId) -> Self {
        Self {
            id,
            native_idle: false,
        }
    }

    /// A source that reports its own idle transition.
    pub fn native(id: SourceId) -> Self {
        Self {
            id,
            native_idle: true,
        }
    }
}

/// How per-source idles combine into settle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    /// Each source's idle is a settle.
    Each,
    /// Settle only when all sources are idle together.
    All,
}

/// What caused a settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleTrigger {
    /// A single source went idle.
    Source(SourceId),
    /// The last moving source of a join went idle.
    Joined,
}

/// A settle produced by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleEvent {
    pub trigger: SettleTrigger,
    pub at: Instant,
}

/// Detectors for one session plus their combination rule.
#[derive(Debug)]
pub struct SettleEngine {
    detectors: Vec<(SourceId, SettleDetector)>,
    join: Option<SettleJoin>,
    min_signal_spacing: Duration,
}

fn detector_for(spec: &SourceSpec, min_signal_spacing: Duration) -> SettleDetector {
    if spec.native_idle {
        SettleDetector::with_native_idle(min_signal_spacing)
    } else {
        SettleDetector::new(min_signal_spacing)
    }
}

impl SettleEngine {
    /// Create an engine over `sources`.
    pub fn new(sources: &[SourceSpec], combine: Combine, min_signal_spacing: Duration) -> Self {
        let detectors = sources
            .iter()
            .map(|spec| (spec.id, detector_for(spec, min_signal_spacing)))
            .collect();

        let join = match combine {
            Combine::Each => None,
            Combine::All => Some(SettleJoin::new(sources.iter().map(|spec| spec.id))),
        };

        Self {
            detectors,
            join,
            min_signal_spacing,
        }
    }

    /// Track a source discovered after the engine started.
    ///
    /// The new detector follows the startup rule: a probed source settles on
    /// the first probe without motion. `false` if `spec.id` is already
    /// tracked.
    pub fn add_source(&mut self, spec: SourceSpec) -> bool {
        if self.detector(spec.id).is_some() {
            return false;
        }
        self.detectors
            .push((spec.id, detector_for(&spec, self.min_signal_spacing)));
        if let Some(join) = self.join.as_mut() {
            join.add_source(spec.id);
        }
        tracing::debug!(source = %spec.id, native_idle = spec.native_idle, "Source added");
        true
    }

    /// Number of tracked sources.
    pub fn source_count(&self) -> usize {
        self.detectors.len()
    }

    /// Ingest one signal.
    pub fn on_signal(&mut self, signal: &ScrollSignal) -> Option<SettleEvent> {
        if let SignalKind::Attached { native_idle } = signal.kind {
            self.add_source(SourceSpec {
                id: signal.source,
                native_idle,
            });
            return None;
        }

        let Some(detector) = self.detector_mut(signal.source) else {
            tracing::trace!(source = %signal.source, "Signal from untracked source ignored");
            return None;
        };

        match signal.kind {
            SignalKind::Motion => {
                if detector.record_motion(signal.at) == MotionOutcome::Started {
                    tracing::trace!(source = %signal.source, "Source started scrolling");
                    self.on_state_change(signal.source, SettleState::Scrolling, signal.at)
                } else {
                    None
                }
            }
            SignalKind::Idle => {
                let was_idle = detector.state().is_idle();
                detector.record_idle(signal.at);
                // A repeated idle is a fresh stop; the join must see it as one
                if was_idle {
                    if let Some(join) = self.join.as_mut() {
                        join.update(signal.source, SettleState::Scrolling);
                    }
                }
                self.on_state_change(signal.source, SettleState::Idle, signal.at)
            }
            SignalKind::Attached { .. } => None,
        }
    }

    /// Run one quiescence probe across all sources.
    pub fn on_probe(&mut self, now: Instant) -> Vec<SettleEvent> {
        let went_idle: Vec<SourceId> = self
            .detectors
            .iter_mut()
            .filter_map(|(id, detector)| detector.probe(now).then_some(*id))
            .collect();

        went_idle
            .into_iter()
            .filter_map(|id| self.on_state_change(id, SettleState::Idle, now))
            .collect()
    }

    fn on_state_change(
        &mut self,
        source: SourceId,
        state: SettleState,
        at: Instant,
    ) -> Option<SettleEvent> {
        match self.join.as_mut() {
            None => state.is_idle().then_some(SettleEvent {
                trigger: SettleTrigger::Source(source),
                at,
            }),
            Some(join) => join.update(source, state).then_some(SettleEvent {
                trigger: SettleTrigger::Joined,
                at,
            }),
        }
    }

    fn detector_mut(&mut self, source: SourceId) -> Option<&mut SettleDetector> {
        self.detectors
            .iter_mut()
            .find(|(id, _)| *id == source)
            .map(|(_, detector)| detector)
    }

    /// Current state of `source`.
    pub fn state_of(&self, source: SourceId) -> Option<SettleState> {
        self.detectors
            .iter()
            .find(|(id, _)| *id == source)
            .map(|(_, detector)| detector.state())
    }

    /// Detector for `source`, for inspection.
    pub fn detector(&self, source: SourceId) -> Option<&SettleDetector> {
        self.detectors
            .iter()
            .find(|(id, _)| *id == source)
            .map(|(_, detector)| detector)
    }
}
