//! Application configuration module
//!
//! Provides the configuration types shared by the library and the CLI.
//! A configuration can be built in code through [`AppConfigBuilder`] or
//! read from a TOML document:
//!
//! ```toml
//! remote_url = "https://script.example.com/exec"
//! snapshot_dir = "/var/lib/escape-progress"
//! stage_count = 6
//! request_timeout_secs = 10
//! ```
//!
//! Every field is optional. Leaving `remote_url` unset is valid: the remote
//! client then short-circuits every request and progress stays local.

use crate::shared::progress::StageLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Five rooms plus the exit stage
pub const DEFAULT_STAGE_COUNT: u32 = 6;

/// Per-request timeout for the remote store
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the remote progress store
    pub remote_url: Option<String>,
    /// Directory holding the local snapshot
    pub snapshot_dir: Option<PathBuf>,
    /// Number of stages, terminal stage included
    pub stage_count: u32,
    /// Timeout applied to each remote request
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            snapshot_dir: None,
            stage_count: DEFAULT_STAGE_COUNT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.remote_url {
            let parsed =
                reqwest::Url::parse(url).map_err(|e| ConfigError::InvalidUrl(format!("{url}: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidUrl(format!(
                    "{url}: unsupported scheme '{}'",
                    parsed.scheme()
                )));
            }
        }
        if self.stage_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stage_count",
                message: "at least one stage is required".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs",
                message: "timeout must be at least one second".to_string(),
            });
        }
        Ok(())
    }

    /// Stage layout described by this configuration
    pub fn stage_layout(&self) -> StageLayout {
        StageLayout::new(self.stage_count)
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the remote store URL; an empty string leaves it unset
    pub fn remote_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.config.remote_url = if url.trim().is_empty() { None } else { Some(url) };
        self
    }

    /// Set the snapshot directory
    pub fn snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.snapshot_dir = Some(dir.into());
        self
    }

    /// Set the number of stages, terminal stage included
    pub fn stage_count(mut self, stage_count: u32) -> Self {
        self.config.stage_count = stage_count;
        self
    }

    /// Set the per-request timeout in seconds
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
    #[error("failed to read configuration: {0}")]
    Io(String),
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}
