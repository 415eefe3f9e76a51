//! Application configuration: an optional TOML file plus environment
//! overrides.

use std::path::{Path, PathBuf};

use peace_map_acled_models::AcledConfig;
use peace_map_cache::CacheConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Config file read from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "peace_map.toml";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`AppConfig`].
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Everything the CLI needs to build a client and a cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// ACLED credentials and endpoint.
    pub acled: AcledConfig,
    /// Response cache settings.
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Loads the config file, then applies environment overrides.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`]
    /// is read if present and defaults are used otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.is_file().then_some(default)
            }
        };

        let mut config = match path {
            Some(path) => {
                log::debug!("Loading config from {}", path.display());
                let text = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Io { path, source })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parses a TOML document. Missing sections and keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the document is malformed.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies `ACLED_EMAIL`, `ACLED_ACCESS_KEY`, `ACLED_BASE_URL` and
    /// `PEACE_MAP_CACHE_DIR`. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(email) = var("ACLED_EMAIL") {
            self.acled.email = email;
        }
        if let Some(key) = var("ACLED_ACCESS_KEY") {
            self.acled.access_key = key;
        }
        if let Some(url) = var("ACLED_BASE_URL") {
            self.acled.base_url = url;
        }
        if let Some(dir) = var("PEACE_MAP_CACHE_DIR") {
            self.cache.dir = PathBuf::from(dir);
        }
    }
}
