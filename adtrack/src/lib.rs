//! AdTrack - settle-gated ad impression tracking for scrolling UIs
//!
//! This library decides when a scrolling region has come to rest and, for
//! every ad placement fully visible at that moment, emits analytics event
//! keys at most once per app session and once per page view.
//!
//! # Architecture
//!
//! ```text
//! ScrollSource ──► settle ──► tracker session ──► ui (enumerate, classify, name)
//!                                   │
//!                                   ▼
//!                           dedup store ──► AnalyticsSink
//! ```
//!
//! - [`settle`] turns motion ticks and periodic probes into settle events,
//!   per source or joined across sources.
//! - [`dedup`] holds the session- and page-scoped key sets.
//! - [`tracker`] wires both together per registered placement.
//! - [`ui`] defines the host collaborators plus default implementations over
//!   an abstract element tree.
//!
//! The library logs through `tracing` and never installs a subscriber.

pub mod ad;
pub mod config;
pub mod dedup;
pub mod error;
pub mod settle;
pub mod tracker;
pub mod ui;

pub use ad::{AdType, EventKind, UNKNOWN_EVENT_NAME};
pub use config::TrackerConfig;
pub use dedup::{DedupScope, EventDedupStore};
pub use error::{TrackerError, TrackerResult};
pub use tracker::{ScrollTarget, SessionHandle, TrackerBuilder, TrackerFacade};
