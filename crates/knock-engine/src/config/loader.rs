//! Configuration loading.
//!
//! Sources in order: `./knock.yaml`, `~/.knock/config.yaml`, built-in
//! defaults. A malformed file is reported and skipped rather than
//! aborting the run.

use super::schema::KnockConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the first readable source, falling back to defaults.
    pub fn load() -> KnockConfig {
        for path in Self::search_paths() {
            if !path.exists() {
                continue;
            }
            match Self::load_from(&path) {
                Ok(config) => {
                    debug!(path = %path.display(), "loaded configuration");
                    return config;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable config");
                }
            }
        }
        debug!("using default configuration");
        KnockConfig::default()
    }

    pub fn load_from(path: &Path) -> Result<KnockConfig, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("knock.yaml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".knock").join("config.yaml"));
        }
        paths
    }
}
