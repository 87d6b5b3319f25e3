use std::{
    env,
    path::{Path, PathBuf},
};

use reqwest::Url;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    InvalidUrl {
        key: &'static str,
        value: String,
        reason: String,
    },
}

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const CONFIG_DIR_KEY: &str = "TASKBOARD_CONFIG_DIR";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: Url,
    pub config_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let key = "TASKBOARD_API_BASE_URL";
        let raw_url = try_load(key, DEFAULT_API_BASE_URL);
        let api_base_url = Url::parse(&raw_url).map_err(|e| ConfigError::InvalidUrl {
            key,
            value: raw_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            api_base_url,
            config_dir: Self::config_dir(),
        })
    }

    /// Resolved on its own so logging can start before the rest loads.
    pub fn config_dir() -> PathBuf {
        config_dir_from(env::var(CONFIG_DIR_KEY).ok())
    }

    pub fn log_path(config_dir: &Path) -> PathBuf {
        config_dir.join("taskboard.log")
    }
}

fn try_load(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn config_dir_from(value: Option<String>) -> PathBuf {
    match value {
        Some(dir) => PathBuf::from(dir),
        None => {
            let dir = default_config_dir();
            info!("{CONFIG_DIR_KEY} not set, using default: {}", dir.display());
            dir
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskboard")
}
