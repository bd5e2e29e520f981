//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every field has a default so an empty document is a valid config.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct BackoffConfig {
    /// Guard settings (cooldown cap, event verbosity).
    pub guard: GuardConfig,

    /// Logging subscriber settings.
    pub observability: ObservabilityConfig,
}

/// Settings for a single backoff guard.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GuardConfig {
    /// Upper bound on the cooldown, in seconds.
    pub max_backoff_secs: u64,

    /// Most verbose level of events the guard emits (off, error, warn, info, debug, trace).
    pub log_level: String,
}

impl GuardConfig {
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_backoff_secs: 3600,
            log_level: "info".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Subscriber log level; `RUST_LOG` overrides it.
    pub log_level: String,

    /// Line format.
    pub format: LogFormat,

    /// Where log lines go.
    pub sink: SinkKind,

    /// Syslog socket path; the platform default when unset.
    pub syslog_path: Option<PathBuf>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::default(),
            sink: SinkKind::default(),
            syslog_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Syslog when its socket exists, stderr otherwise.
    #[default]
    Auto,
    Stderr,
    Syslog,
}
