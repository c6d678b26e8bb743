//! Configuration module for ETL Studio
//!
//! Configuration is a single TOML file with one table per concern
//! (`[api]`, `[layout]`, `[editor]`, `[runs]`, `[logging]`).
//!
//! # Config Location
//!
//! - **Linux**: `~/.local/share/dev.etl-studio/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.etl-studio/config.toml`
//! - **Windows**: `%APPDATA%\dev.etl-studio\config.toml`
//!
//! A missing file yields defaults. `ETL_STUDIO_API_URL` overrides
//! `api.base_url`.
//!
//! # Example
//!
//! ```ignore
//! use etl_studio::config::StudioConfig;
//!
//! let config = StudioConfig::load_or_default();
//! let backend = HttpBackend::from_config(&config.api)?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Result, StudioError};
use crate::pipeline::layout::LayoutOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.etl-studio";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Environment variable overriding the API base URL
pub const ENV_API_URL: &str = "ETL_STUDIO_API_URL";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        StudioError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            StudioError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the default config file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== Studio Config ====================

/// Complete console configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub api: ApiConfig,
    pub layout: LayoutOptions,
    pub editor: EditorSettings,
    pub runs: RunSettings,
    pub logging: LoggingConfig,
}

impl StudioConfig {
    /// Load from the default location, applying environment overrides
    pub fn load() -> Result<Self> {
        let path = config_path().ok_or_else(|| {
            StudioError::Config("Could not determine config path".to_string())
        })?;
        Self::load_from(path)
    }

    /// Load from an explicit path, applying environment overrides.
    ///
    /// A missing file yields defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                StudioError::Config(format!("Failed to read config {:?}: {}", path, e))
            })?;
            toml::from_str::<StudioConfig>(&content).map_err(|e| {
                StudioError::Config(format!("Failed to parse config {:?}: {}", path, e))
            })?
        } else {
            tracing::debug!(?path, "No config file, using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            let mut config = Self::default();
            config.apply_env_overrides();
            config
        })
    }

    /// Save to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(dir.join(CONFIG_FILE))
    }

    /// Save to an explicit path, creating parent directories
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StudioError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| StudioError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            StudioError::Config(format!("Failed to write config {:?}: {}", path, e))
        })
    }

    /// Apply `ETL_STUDIO_API_URL` if set and non-empty
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            let url = url.trim();
            if !url.is_empty() {
                self.api.base_url = url.to_string();
            }
        }
    }

    /// Reject values the console cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(StudioError::Config("api.base_url is empty".to_string()));
        }
        if self.api.timeout_secs == 0 {
            return Err(StudioError::Config(
                "api.timeout_secs must be positive".to_string(),
            ));
        }
        if self.runs.poll_interval_secs == 0 {
            return Err(StudioError::Config(
                "runs.poll_interval_secs must be positive".to_string(),
            ));
        }
        if self.layout.node_width <= 0.0 || self.layout.node_height <= 0.0 {
            return Err(StudioError::Config(
                "layout node size must be positive".to_string(),
            ));
        }
        if self.layout.rank_sep < 0.0 || self.layout.node_sep < 0.0 {
            return Err(StudioError::Config(
                "layout separation must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

// ==================== Tests ====================
