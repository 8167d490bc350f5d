//! Tracker timing from an INI file and command-line overrides.
//!
//! ```ini
//! [tracker]
//! probe_interval_ms = 300
//! min_signal_spacing_ms = 100
//! ```
//!
//! Flags take precedence over the file; anything unset keeps the library
//! default.

use std::path::Path;
use std::time::Duration;

use adtrack::TrackerConfig;
use ini::Ini;

use crate::error::CliError;

/// INI section holding tracker settings.
pub const TRACKER_SECTION: &str = "tracker";

const PROBE_INTERVAL_KEY: &str = "probe_interval_ms";
const MIN_SIGNAL_SPACING_KEY: &str = "min_signal_spacing_ms";

/// Timing values that may come from either source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimingOverrides {
    pub probe_interval_ms: Option<u64>,
    pub min_signal_spacing_ms: Option<u64>,
}

impl TimingOverrides {
    /// Values from `self`, falling back to `base` for unset ones.
    pub fn or(self, base: TimingOverrides) -> TimingOverrides {
        TimingOverrides {
            probe_interval_ms: self.probe_interval_ms.or(base.probe_interval_ms),
            min_signal_spacing_ms: self.min_signal_spacing_ms.or(base.min_signal_spacing_ms),
        }
    }

    fn apply(self, mut config: TrackerConfig) -> TrackerConfig {
        if let Some(ms) = self.probe_interval_ms {
            config.probe_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.min_signal_spacing_ms {
            config.min_signal_spacing = Duration::from_millis(ms);
        }
        config
    }
}

/// Read the `[tracker]` section of a parsed INI document.
pub fn timing_from_ini(ini: &Ini) -> Result<TimingOverrides, CliError> {
    let Some(section) = ini.section(Some(TRACKER_SECTION)) else {
        return Ok(TimingOverrides::default());
    };

    let parse = |key: &str| -> Result<Option<u64>, CliError> {
        section
            .get(key)
            .map(|value| {
                value.trim().parse::<u64>().map_err(|_| {
                    CliError::Config(format!(
                        "[{}] {} must be a whole number of milliseconds, got '{}'",
                        TRACKER_SECTION, key, value
                    ))
                })
            })
            .transpose()
    };

    Ok(TimingOverrides {
        probe_interval_ms: parse(PROBE_INTERVAL_KEY)?,
        min_signal_spacing_ms: parse(MIN_SIGNAL_SPACING_KEY)?,
    })
}

/// Resolve the tracker configuration.
///
/// `flags` override values from the file at `path`, which override the
/// defaults. The result is validated.
pub fn load_tracker_config(
    path: Option<&Path>,
    flags: TimingOverrides,
) -> Result<TrackerConfig, CliError> {
    let from_file = match path {
        Some(path) => {
            let ini = Ini::load_from_file(path).map_err(|source| CliError::Ini {
                path: path.to_path_buf(),
                source,
            })?;
            timing_from_ini(&ini)?
        }
        None => TimingOverrides::default(),
    };

    let config = flags.or(from_file).apply(TrackerConfig::default());
    config.validate()?;

    tracing::debug!(
        probe_interval_ms = config.probe_interval.as_millis() as u64,
        min_signal_spacing_ms = config.min_signal_spacing.as_millis() as u64,
        "Tracker configuration resolved"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_ini(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_file() {
        let config = load_tracker_config(None, TimingOverrides::default()).unwrap();
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn test_file_values_applied() {
        let file = write_ini("[tracker]\nprobe_interval_ms = 500\nmin_signal_spacing_ms = 50\n");
        let config = load_tracker_config(Some(file.path()), TimingOverrides::default()).unwrap();

        assert_eq!(config.probe_interval, Duration::from_millis(500));
        assert_eq!(config.min_signal_spacing, Duration::from_millis(50));
    }

    #[test]
    fn test_flags_override_file() {
        let file = write_ini("[tracker]\nprobe_interval_ms = 500\n");
        let flags = TimingOverrides {
            probe_interval_ms: Some(250),
            min_signal_spacing_ms: None,
        };
        let config = load_tracker_config(Some(file.path()), flags).unwrap();

        assert_eq!(config.probe_interval, Duration::from_millis(250));
        assert_eq!(config.min_signal_spacing, Duration::from_millis(100));
    }

    #[test]
    fn test_missing_section_keeps_defaults() {
        let file = write_ini("[other]\nprobe_interval_ms = 1\n");
        let config = load_tracker_config(Some(file.path()), TimingOverrides::default()).unwrap();
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let file = write_ini("[tracker]\nprobe_interval_ms = fast\n");
        let err = load_tracker_config(Some(file.path()), TimingOverrides::default()).unwrap_err();

        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("probe_interval_ms"));
    }

    #[test]
    fn test_invalid_timing_rejected() {
        let flags = TimingOverrides {
            probe_interval_ms: Some(100),
            min_signal_spacing_ms: Some(200),
        };
        let err = load_tracker_config(None, flags).unwrap_err();
        assert!(matches!(err, CliError::Tracker(_)));
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = load_tracker_config(
            Some(Path::new("/nonexistent/adtrack.ini")),
            TimingOverrides::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Ini { .. }));
    }
}
