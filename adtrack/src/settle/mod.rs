//! Settle detection: turning scroll motion into "has stopped" events.
//!
//! Hosts report motion through [`ScrollSource`]s. Each session runs a
//! [`SettleEngine`] holding one [`SettleDetector`] per source; probes at a
//! fixed interval decide when a source has been quiet for a full window.
//! Several sources can be joined so a settle is only reported while all of
//! them are at rest.
//!
//! # Example
//!
//! ```
//! use std::time::{Duration, Instant};
//! use adtrack::settle::SettleDetector;
//!
//! let mut detector = SettleDetector::new(Duration::from_millis(100));
//! let start = Instant::now();
//!
//! // Nothing moved during the first probe interval
//! assert!(detector.probe(start + Duration::from_millis(300)));
//! ```

mod detector;
pub(crate) mod driver;
mod engine;
mod fanout;
mod join;
mod source;

pub use detector::{MotionOutcome, SettleDetector, SettleState, SettleStats};
pub use engine::{Combine, SettleEngine, SettleEvent, SettleTrigger, SourceSpec};
pub use fanout::ScrollFanout;
pub use join::SettleJoin;
pub use source::{ScrollSignal, ScrollSource, SignalKind, SignalTx, SourceId, Subscription};
