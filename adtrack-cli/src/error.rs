//! CLI error type.

use std::path::PathBuf;

use adtrack::TrackerError;
use thiserror::Error;

/// Errors surfaced by CLI commands. `main` prints them and exits with 1.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Ini {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Invalid scenario: {0}")]
    Scenario(String),

    #[error("Failed to parse scenario: {0}")]
    ScenarioJson(#[from] serde_json::Error),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}
