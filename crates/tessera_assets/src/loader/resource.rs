use std::sync::Arc;

use async_trait::async_trait;
use tessera_platform::assets::global_asset_loader;
use tessera_platform::{AssetLoader, PlatformError};

use super::DataLoader;
use crate::config::DEFAULT_RESOURCE_CATEGORIES;
use crate::error::{DataLoaderError, Result};
use crate::source::DataSource;

/// Reads resources bundled with the host application
///
/// Names are looked up in each category in order; the first match wins. The
/// platform asset loader is taken from the global registry unless one was
/// given explicitly.
#[derive(Clone)]
pub struct ResourceLoader {
    categories: Vec<String>,
    asset_loader: Option<Arc<dyn AssetLoader>>,
}

impl ResourceLoader {
    pub fn new(categories: Vec<String>) -> Self {
        Self {
            categories,
            asset_loader: None,
        }
    }

    /// Use `loader` instead of the global asset loader
    pub fn with_asset_loader(mut self, loader: Arc<dyn AssetLoader>) -> Self {
        self.asset_loader = Some(loader);
        self
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Load a resource by name without extension
    pub async fn load_named(&self, name: &str) -> Result<Vec<u8>> {
        let loader = self
            .asset_loader
            .clone()
            .or_else(global_asset_loader)
            .ok_or(DataLoaderError::NoContext)?;

        let categories = self.categories.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || read_first_match(loader.as_ref(), &categories, &name))
            .await
            .map_err(|e| DataLoaderError::Io(e.to_string()))?
    }
}

fn read_first_match(loader: &dyn AssetLoader, categories: &[String], name: &str) -> Result<Vec<u8>> {
    for category in categories {
        let Some(path) = loader.find_resource(category, name) else {
            continue;
        };
        tracing::trace!("Resource {} found at {} ({})", name, path, loader.platform_name());
        return loader.load(&path).map_err(|e| match e {
            PlatformError::AssetNotFound(_) => DataLoaderError::ResourceNotFound(name.to_string()),
            PlatformError::NoContext(_) => DataLoaderError::NoContext,
            other => DataLoaderError::Io(other.to_string()),
        });
    }
    Err(DataLoaderError::ResourceNotFound(name.to_string()))
}

impl Default for ResourceLoader {
    fn default() -> Self {
        Self::new(
            DEFAULT_RESOURCE_CATEGORIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        )
    }
}

#[async_trait]
impl DataLoader for ResourceLoader {
    async fn load(&self, source: &DataSource) -> Result<Vec<u8>> {
        match source {
            DataSource::Resource(name) => self.load_named(name).await,
            _ => Err(DataLoaderError::InvalidSource),
        }
    }
}
