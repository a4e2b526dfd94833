//! Asset loader configuration
//!
//! Loaded from the `[assets]` table of `tessera.toml`, or built in code from
//! one of the presets.
//!
//! ```toml
//! [assets]
//! cache_enabled = true
//! cache_dir_name = "tessera_url_assets"
//! http_timeout_secs = 30
//! resource_categories = ["raw", "drawable"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Categories searched for bundled resources, in order
pub const DEFAULT_RESOURCE_CATEGORIES: &[&str] = &["raw", "drawable"];

/// Directory created inside the host cache area for downloaded assets
pub const DEFAULT_CACHE_DIR_NAME: &str = "tessera_url_assets";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings for resolving, fetching and caching assets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetLoaderConfig {
    /// Whether downloaded URL assets are cached on disk
    pub cache_enabled: bool,
    /// Directory name inside the cache root
    pub cache_dir_name: String,
    /// Cache root override; the host cache area is used when unset
    pub cache_root: Option<PathBuf>,
    /// Per-request timeout for HTTP downloads, in seconds
    pub http_timeout_secs: u64,
    /// Bundled resource categories, searched in order
    pub resource_categories: Vec<String>,
    /// User agent sent with HTTP requests
    pub user_agent: Option<String>,
}

impl Default for AssetLoaderConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    assets: AssetLoaderConfig,
}

impl AssetLoaderConfig {
    /// Standard configuration for app use
    pub fn standard() -> Self {
        Self {
            cache_enabled: true,
            cache_dir_name: DEFAULT_CACHE_DIR_NAME.to_string(),
            cache_root: None,
            http_timeout_secs: 30,
            resource_categories: DEFAULT_RESOURCE_CATEGORIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            user_agent: None,
        }
    }

    /// Every URL is fetched; nothing touches the disk cache
    pub fn uncached() -> Self {
        Self {
            cache_enabled: false,
            ..Self::standard()
        }
    }

    /// Isolated cache under `root` with a short timeout
    pub fn testing(root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: Some(root.into()),
            http_timeout_secs: 5,
            ..Self::standard()
        }
    }

    /// Parse the `[assets]` table of a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.assets)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Per-request timeout, never below one second
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }

    pub fn with_cache_dir_name(mut self, name: impl Into<String>) -> Self {
        self.cache_dir_name = name.into();
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_resource_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }
}
