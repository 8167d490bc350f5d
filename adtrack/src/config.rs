//! Timing configuration for settle detection.
//!
//! The probe interval is the quiet window: a source that produced no motion
//! for a full interval is considered settled. The signal spacing bounds how
//! often motion ticks are processed while a source keeps moving.

use std::time::Duration;

use crate::error::{TrackerError, TrackerResult};

/// Default quiescence probe interval in milliseconds.
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 300;

/// Default minimum spacing between processed motion signals in milliseconds.
pub const DEFAULT_MIN_SIGNAL_SPACING_MS: u64 = 100;

/// Configuration shared by every session a tracker registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Interval between quiescence probes.
    ///
    /// A source is reported idle on the first probe that observes no motion
    /// since the previous probe. Default: 300ms.
    pub probe_interval: Duration,

    /// Motion signals closer together than this are coalesced into one.
    ///
    /// Must be shorter than `probe_interval`. Default: 100ms.
    pub min_signal_spacing: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_millis(DEFAULT_PROBE_INTERVAL_MS),
            min_signal_spacing: Duration::from_millis(DEFAULT_MIN_SIGNAL_SPACING_MS),
        }
    }
}

impl TrackerConfig {
    /// Create a configuration from millisecond values.
    pub fn from_millis(probe_interval_ms: u64, min_signal_spacing_ms: u64) -> Self {
        Self {
            probe_interval: Duration::from_millis(probe_interval_ms),
            min_signal_spacing: Duration::from_millis(min_signal_spacing_ms),
        }
    }

    /// Check that the timings can drive a detector.
    pub fn validate(&self) -> TrackerResult<()> {
        if self.probe_interval.is_zero() {
            return Err(TrackerError::InvalidConfig(
                "probe_interval must be greater than zero".to_string(),
            ));
        }
        if self.min_signal_spacing >= self.probe_interval {
            return Err(TrackerError::InvalidConfig(format!(
                "min_signal_spacing ({}ms) must be shorter than probe_interval ({}ms)",
                self.min_signal_spacing.as_millis(),
                self.probe_interval.as_millis()
            )));
        }
        Ok(())
    }
}
