mod schedule;

pub use schedule::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Parse a TOML document. Missing sections and fields take their
    /// defaults.
    pub fn from_toml_str(s: &str) -> crate::Result<Self> {
        toml::from_str(s).map_err(|e| crate::Error::Config(e.to_string()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How a [`Config::validate`] finding affects schedule resolution.
///
/// Errors make the schedule settings unusable; warnings flag values that
/// resolve but likely produce surprising spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A finding against one `[schedule]` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    /// Dotted key path, e.g. `schedule.merge_gap_seconds`.
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.to_owned(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.to_owned(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            ConfigSeverity::Error => write!(f, "{}: {}", self.field, self.message),
            ConfigSeverity::Warning => write!(f, "{} (warning): {}", self.field, self.message),
        }
    }
}

/// Gaps wider than a day would fuse every daily period into one span.
const MAX_SENSIBLE_GAP_SECONDS: u64 = 24 * 60 * 60;

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let schedule = &self.schedule;

        if schedule.default_timezone.parse::<chrono_tz::Tz>().is_err() {
            errors.push(ConfigError::error(
                "schedule.default_timezone",
                format!(
                    "unknown timezone '{}' (use IANA names like 'America/Montreal' or 'UTC')",
                    schedule.default_timezone
                ),
            ));
        }

        if schedule.max_continuous_days == 0 {
            errors.push(ConfigError::error(
                "schedule.max_continuous_days",
                "must be greater than 0",
            ));
        }

        if schedule.merge_gap_seconds > MAX_SENSIBLE_GAP_SECONDS {
            errors.push(ConfigError::warning(
                "schedule.merge_gap_seconds",
                "gap exceeds one day; separate daily periods will be merged",
            ));
        }

        errors
    }

    /// True when `validate` reports no errors (warnings are allowed).
    pub fn is_valid(&self) -> bool {
        self.validate()
            .iter()
            .all(|e| e.severity != ConfigSeverity::Error)
    }
}
