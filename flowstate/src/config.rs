//! Configuration for execution contexts and logging.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable enabling output logging.
pub const ENV_LOG_OUTPUTS: &str = "FLOWSTATE_LOG_OUTPUTS";
/// Environment variable setting the view data directory.
pub const ENV_VIEW_DATA_DIR: &str = "FLOWSTATE_VIEW_DATA_DIR";
/// Environment variable setting the log filter.
pub const ENV_LOG: &str = "FLOWSTATE_LOG";
/// Environment variable switching logs to JSON.
pub const ENV_LOG_JSON: &str = "FLOWSTATE_LOG_JSON";

/// Configuration for building execution contexts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Log every output notification at debug level.
    #[serde(default)]
    pub log_outputs: bool,
    /// Directory side-input data is published to. Publication is
    /// unsupported when unset.
    #[serde(default)]
    pub view_data_dir: Option<PathBuf>,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ExecutionConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Builds a configuration from `FLOWSTATE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_LOG_OUTPUTS) {
            config.log_outputs = parse_flag(&value);
        }
        if let Some(dir) = lookup(ENV_VIEW_DATA_DIR).filter(|d| !d.trim().is_empty()) {
            config.view_data_dir = Some(PathBuf::from(dir));
        }
        if let Some(filter) = lookup(ENV_LOG).filter(|f| !f.trim().is_empty()) {
            config.logging.filter = filter;
        }
        if let Some(value) = lookup(ENV_LOG_JSON) {
            config.logging.json = parse_flag(&value);
        }
        config
    }

    /// Enables or disables output logging.
    #[must_use]
    pub fn with_log_outputs(mut self, enabled: bool) -> Self {
        self.log_outputs = enabled;
        self
    }

    /// Sets the view data directory.
    #[must_use]
    pub fn with_view_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.view_data_dir = Some(dir.into());
        self
    }

    /// Sets the logging configuration.
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive string. `RUST_LOG` takes precedence when set.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "flowstate=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Sets the filter directive.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Enables or disables JSON output.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
