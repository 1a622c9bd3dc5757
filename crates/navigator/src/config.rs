use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{NavigatorError, Result};
use crate::search::{SearchSettings, DEFAULT_MAX_RESULTS};

pub const CONFIG_FILENAME: &str = "navigator.json";
pub const CONFIG_VERSION: &str = "1.0.0";
pub const DATA_DIR_ENV: &str = "NAVIGATOR_DATA_DIR";
pub const APP_DIR_NAME: &str = "file-navigator";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    pub version: String,
    pub max_results: usize,
    pub search_workers: usize,
    pub cancel_poll_interval_ms: u64,
    pub cancel_wait_timeout_ms: u64,
    /// Directory the first browser opens when nothing was restored.
    pub home_dir: Option<String>,
    pub event_capacity: usize,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            search_workers: 2,
            cancel_poll_interval_ms: 10,
            cancel_wait_timeout_ms: 2000,
            home_dir: None,
            event_capacity: 256,
        }
    }
}

impl NavigatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_results == 0 {
            return Err(NavigatorError::InvalidArgument(
                "max_results must be at least 1".to_string(),
            ));
        }
        if self.search_workers == 0 {
            return Err(NavigatorError::InvalidArgument(
                "search_workers must be at least 1".to_string(),
            ));
        }
        if self.cancel_poll_interval_ms == 0 {
            return Err(NavigatorError::InvalidArgument(
                "cancel_poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            max_results: self.max_results,
            poll_interval: Duration::from_millis(self.cancel_poll_interval_ms),
            wait_timeout: Duration::from_millis(self.cancel_wait_timeout_ms),
        }
    }

    /// Start directory: the configured one, else the user's home.
    pub fn start_dir(&self) -> Option<PathBuf> {
        self.home_dir
            .as_ref()
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
    }
}

/// Reads `navigator.json` from `dir`, writing defaults first when it does not
/// exist yet.
pub fn load_or_create_config(dir: &Path) -> Result<NavigatorConfig> {
    std::fs::create_dir_all(dir).map_err(|error| {
        NavigatorError::Internal(format!(
            "failed to create data directory {}: {error}",
            dir.display()
        ))
    })?;

    let path = config_path(dir);
    if !path.exists() {
        let config = NavigatorConfig::default();
        write_config(&path, &config)?;
        log::info!("wrote default config to {}", path.display());
        return Ok(config);
    }

    let data = std::fs::read_to_string(&path)?;
    let mut config: NavigatorConfig = serde_json::from_str(&data).map_err(|error| {
        NavigatorError::Serialization(format!(
            "failed to parse config {}: {error}",
            path.display()
        ))
    })?;

    if config.version != CONFIG_VERSION {
        config = migrate_config(config)?;
        write_config(&path, &config)?;
    }

    config.validate()?;
    Ok(config)
}

pub fn migrate_config(mut config: NavigatorConfig) -> Result<NavigatorConfig> {
    log::info!(
        "migrating config from version {} to {CONFIG_VERSION}",
        config.version
    );
    config.version = CONFIG_VERSION.to_string();
    Ok(config)
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILENAME)
}

pub fn write_config(path: &Path, config: &NavigatorConfig) -> Result<()> {
    let data = serde_json::to_string_pretty(config).map_err(|error| {
        NavigatorError::Serialization(format!("failed to serialize config: {error}"))
    })?;
    std::fs::write(path, data)?;
    Ok(())
}

/// `$NAVIGATOR_DATA_DIR` when set, else the platform data directory.
pub fn default_data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| NavigatorError::Internal("no platform data directory".to_string()))
}
