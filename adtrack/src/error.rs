//! Error types for the tracker.
//!
//! Empty results (no visible range, nothing matched, no event name) are not
//! errors and never surface here. Only configuration faults and misuse of the
//! registry do.

use thiserror::Error;

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Errors that can occur while configuring or driving the tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A configuration value is out of range.
    #[error("Invalid tracker configuration: {0}")]
    InvalidConfig(String),

    /// A required collaborator was not supplied.
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// No tokio runtime was supplied or reachable from the calling thread.
    #[error("No tokio runtime available: {0}")]
    RuntimeUnavailable(String),
}
