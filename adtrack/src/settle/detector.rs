//! Settle detection for a single scroll source.
//!
//! Many widgets report motion but never report that they stopped. The
//! detector turns their motion ticks into a trustworthy idle signal by
//! probing at a fixed interval: a probe that observes no motion since the
//! previous probe marks the source idle, once per quiet period.
//!
//! # State Machine
//!
//! ```text
//!              motion (re-arms quiet window)
//!          +----------------------------------+
//!          v                                  |
//!     Scrolling --[probe, no motion since]--> Idle
//!          ^                                  |
//!          +------------- motion -------------+
//! ```
//!
//! The detector starts in `Scrolling` with no motion recorded, so the first
//! probe reports idle when nothing moved at all. Content that is visible
//! without scrolling is therefore still tracked.
//!
//! Motion ticks closer together than the configured spacing are coalesced:
//! they still re-arm the quiet window but count as a single processed
//! signal.
//!
//! An explicit idle from the source always ends a quiet period, even with no
//! motion before it. Widgets that only publish their idle transition (a list
//! that reports "scroll stopped" but not each offset change) settle on every
//! such notification.

use std::fmt;
use std::time::{Duration, Instant};

/// Whether a source is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettleState {
    /// Motion observed since the last idle, or no idle confirmed yet.
    #[default]
    Scrolling,
    /// No motion for a full quiet window.
    Idle,
}

impl SettleState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SettleState::Idle)
    }
}

impl fmt::Display for SettleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettleState::Scrolling => write!(f, "scrolling"),
            SettleState::Idle => write!(f, "idle"),
        }
    }
}

/// How a motion tick was ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionOutcome {
    /// The source left `Idle`.
    Started,
    /// Processed while already scrolling.
    Continued,
    /// Arrived inside the spacing window of the previous processed tick.
    Coalesced,
}

/// Counters for one detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettleStats {
    /// Motion ticks that were processed.
    pub processed: u64,
    /// Motion ticks folded into an earlier one.
    pub coalesced: u64,
    /// Idle transitions reported.
    pub idles: u64,
}

/// Per-source idle/scrolling state machine.
#[derive(Debug)]
pub struct SettleDetector {
    /// Minimum spacing between processed motion ticks.
    min_signal_spacing: Duration,

    /// Source reports its own idle transition.
    native_idle: bool,

    state: SettleState,

    /// Timestamp of the last motion tick, processed or coalesced.
    last_motion: Option<Instant>,

    /// Start of the current coalescing window.
    last_processed: Option<Instant>,

    /// When the last idle was reported.
    last_idle: Option<Instant>,

    /// Motion arrived since the previous probe.
    motion_since_probe: bool,

    /// Idle already reported for the current quiet period.
    notified: bool,

    /// Any signal has been received from the source.
    seen_signal: bool,

    stats: SettleStats,
}

impl SettleDetector {
    /// Create a detector for a source without a native idle signal.
    pub fn new(min_signal_spacing: Duration) -> Self {
        Self {
            min_signal_spacing,
            native_idle: false,
            state: SettleState::Scrolling,
            last_motion: None,
            last_processed: None,
            last_idle: None,
            motion_since_probe: false,
            notified: false,
            seen_signal: false,
            stats: SettleStats::default(),
        }
    }

    /// Create a detector for a source that reports its own idle transition.
    ///
    /// Probes still cover the startup window; once the source has sent any
    /// signal only its explicit idle ends a quiet period.
    pub fn with_native_idle(min_signal_spacing: Duration) -> Self {
        Self {
            native_idle: true,
            ..Self::new(min_signal_spacing)
        }
    }

    /// Ingest a motion tick.
    pub fn record_motion(&mut self, now: Instant) -> MotionOutcome {
        self.seen_signal = true;
        self.last_motion = Some(now);
        self.motion_since_probe = true;
        self.notified = false;

        if self.state.is_idle() {
            self.state = SettleState::Scrolling;
            self.last_processed = Some(now);
            self.stats.processed += 1;
            return MotionOutcome::Started;
        }

        let within_window = self
            .last_processed
            .is_some_and(|last| now.saturating_duration_since(last) < self.min_signal_spacing);
        if within_window {
            self.stats.coalesced += 1;
            return MotionOutcome::Coalesced;
        }

        self.last_processed = Some(now);
        self.stats.processed += 1;
        MotionOutcome::Continued
    }

    /// Ingest an explicit idle from the source.
    ///
    /// Always reported: the source says it just came to rest, whether or not
    /// its motion was visible to us.
    pub fn record_idle(&mut self, now: Instant) {
        self.seen_signal = true;
        self.motion_since_probe = false;
        self.mark_idle(now);
    }

    /// Run a quiescence probe.
    ///
    /// Call this at the probe interval.
    ///
    /// # Returns
    ///
    /// `true` if the source became idle on this probe.
    pub fn probe(&mut self, now: Instant) -> bool {
        if self.native_idle && self.seen_signal {
            return false;
        }
        if std::mem::take(&mut self.motion_since_probe) || self.notified {
            return false;
        }
        self.mark_idle(now);
        true
    }

    fn mark_idle(&mut self, now: Instant) {
        self.notified = true;
        self.state = SettleState::Idle;
        self.last_idle = Some(now);
        self.stats.idles += 1;
    }

    /// Current state.
    pub fn state(&self) -> SettleState {
        self.state
    }

    /// Timestamp of the most recent motion tick.
    pub fn last_motion(&self) -> Option<Instant> {
        self.last_motion
    }

    /// When the source last went idle.
    pub fn last_idle(&self) -> Option<Instant> {
        self.last_idle
    }

    /// Whether the source reports its own idle transition.
    pub fn is_native_idle(&self) -> bool {
        self.native_idle
    }

    /// Ingestion counters.
    pub fn stats(&self) -> SettleStats {
        self.stats
    }
}
