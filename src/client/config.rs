use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};
use crate::shared::progress::StageLayout;
use std::path::PathBuf;
use std::time::Duration;

/// Path to an optional TOML configuration file
pub const ENV_CONFIG_FILE: &str = "PROGRESS_CONFIG";
/// Base URL of the remote progress store
pub const ENV_REMOTE_URL: &str = "PROGRESS_REMOTE_URL";
/// Directory holding the local snapshot
pub const ENV_SNAPSHOT_DIR: &str = "PROGRESS_SNAPSHOT_DIR";
/// Number of stages, terminal stage included
pub const ENV_STAGE_COUNT: &str = "PROGRESS_STAGE_COUNT";
/// Per-request timeout in seconds
pub const ENV_REQUEST_TIMEOUT: &str = "PROGRESS_REQUEST_TIMEOUT_SECS";

/// Directory name used under the platform data directory
const APP_DIR_NAME: &str = "escape-progress";

/// Client configuration wrapper.
///
/// Resolves the shared [`AppConfig`] against the environment and the
/// platform directories.
#[derive(Debug, Clone, Default)]
pub struct Config {
    app: AppConfig,
}

impl Config {
    pub fn new(app: AppConfig) -> Self {
        Self { app }
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self { app: builder.build()? })
    }

    /// Load the TOML file named by `PROGRESS_CONFIG` (if any), then apply
    /// the `PROGRESS_*` environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut app = match env_value(ENV_CONFIG_FILE) {
            Some(path) => AppConfig::from_toml_file(path)?,
            None => AppConfig::default(),
        };

        if let Some(url) = env_value(ENV_REMOTE_URL) {
            app.remote_url = Some(url);
        }
        if let Some(dir) = env_value(ENV_SNAPSHOT_DIR) {
            app.snapshot_dir = Some(PathBuf::from(dir));
        }
        if let Some(count) = env_value(ENV_STAGE_COUNT) {
            app.stage_count = count.parse().map_err(|_| ConfigError::InvalidValue {
                field: "stage_count",
                message: format!("'{count}' is not a stage count"),
            })?;
        }
        if let Some(secs) = env_value(ENV_REQUEST_TIMEOUT) {
            app.request_timeout_secs = secs.parse().map_err(|_| ConfigError::InvalidValue {
                field: "request_timeout_secs",
                message: format!("'{secs}' is not a number of seconds"),
            })?;
        }

        app.validate()?;
        Ok(Self { app })
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    /// Remote store URL, if one is configured
    pub fn remote_url(&self) -> Option<&str> {
        self.app.remote_url.as_deref()
    }

    /// Snapshot directory, defaulting to the platform's local data directory
    pub fn snapshot_dir(&self) -> PathBuf {
        match &self.app.snapshot_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR_NAME),
        }
    }

    pub fn stage_layout(&self) -> StageLayout {
        self.app.stage_layout()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.app.request_timeout_secs)
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
