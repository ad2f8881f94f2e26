//! Pipeline configuration.
//!
//! Paths and suite selection are supplied externally — from a TOML file or
//! from the environment at startup — and passed down explicitly. No stage
//! reads process state after this point.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the credentials directory.
pub const ENV_CONFIG_DIR: &str = "CLIMATEPIPE_CONFIG_DIR";
/// Environment variable naming the staging scratch directory.
pub const ENV_STAGING_DIR: &str = "CLIMATEPIPE_STAGING_DIR";
/// Environment variable naming the destination directory for the store.
pub const ENV_DATA_DIR: &str = "CLIMATEPIPE_DATA_DIR";

/// File name of the SQLite store inside the destination directory.
const STORE_FILE_NAME: &str = "climate.sqlite";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Externally supplied paths plus the suites to run, in order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory holding the hosting-service credentials file.
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Scratch directory for downloaded archives and extracted files.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Path of the SQLite store the pipeline writes.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Suites to run, in order.
    #[serde(default = "default_suites")]
    pub suites: Vec<String>,
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("config")
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("staging")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("data").join(STORE_FILE_NAME)
}

fn default_suites() -> Vec<String> {
    crate::datasets::suite_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            staging_dir: default_staging_dir(),
            output_path: default_output_path(),
            suites: default_suites(),
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Assemble a config from environment variables, with defaults for
    /// anything unset. The data-dir variable names a directory; the store
    /// file lands inside it.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
            config.config_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var(ENV_STAGING_DIR) {
            config.staging_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            config.output_path = PathBuf::from(dir).join(STORE_FILE_NAME);
        }
        config
    }
}
