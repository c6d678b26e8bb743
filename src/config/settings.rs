//! Configuration sections
//!
//! Each struct maps to one table of `config.toml`. Every field has a default,
//! so a partial file (or none at all) still yields a complete configuration.
//!
//! # Main Types
//!
//! - [`ApiConfig`] - Orchestration API location and request timeout
//! - [`EditorSettings`] - Edge policy and optimistic concurrency
//! - [`RunSettings`] - Run monitor polling
//! - [`LoggingConfig`] - Log filter, format and optional log file

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use crate::pipeline::store::EdgePolicy;

/// Default API base URL
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default run polling interval in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// Default number of consecutive failed run polls tolerated while watching
pub const DEFAULT_MAX_POLL_ERRORS: u32 = 5;

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "info,etl_studio=debug";

/// `[api]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://etl.example.com/api/v1`
    pub base_url: String,
    /// Per-request timeout applied by the HTTP transport
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `[editor]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub edge_policy: EdgePolicy,
    /// Refuse to save when someone else saved a newer version since load
    pub optimistic_concurrency: bool,
}

/// `[runs]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub poll_interval_secs: u64,
    /// Consecutive failed polls tolerated before a watch gives up
    pub max_poll_errors: u32,
}

impl RunSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_poll_errors: DEFAULT_MAX_POLL_ERRORS,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Full format with timestamp and targets
    #[default]
    Full,
    /// Compact single-line format
    Compact,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Full => write!(f, "full"),
            LogFormat::Compact => write!(f, "compact"),
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    pub format: LogFormat,
    /// Additional log file (daily rotation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::Full,
            file: None,
        }
    }
}
