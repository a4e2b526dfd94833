//! Standalone image loading
//!
//! Unlike referenced-asset batches, these calls propagate every error and
//! bypass the URL cache.

use std::sync::Arc;

use tessera_core::{AssetFactory, AssetKind, DecodedAsset, ImageHandle};

use crate::error::{DataLoaderError, Result};
use crate::loader::Loaders;
use crate::source::DataSource;

/// Loads and decodes images into [`ImageHandle`]s
#[derive(Clone)]
pub struct ImageFactory {
    loaders: Loaders,
    decoder: Arc<dyn AssetFactory>,
}

impl ImageFactory {
    pub fn new(loaders: Loaders, decoder: Arc<dyn AssetFactory>) -> Self {
        Self { loaders, decoder }
    }

    pub async fn load_from_url_async(&self, url: &str) -> Result<ImageHandle> {
        self.load_from_source(&DataSource::from_url(url)?).await
    }

    /// Load a bundled image, given with its extension
    pub async fn load_from_resource_async(&self, name: &str) -> Result<ImageHandle> {
        self.load_from_source(&DataSource::resource(name)).await
    }

    pub async fn load_from_bytes_async(&self, bytes: Vec<u8>) -> Result<ImageHandle> {
        self.load_from_source(&DataSource::Bytes(bytes)).await
    }

    pub async fn load_from_source(&self, source: &DataSource) -> Result<ImageHandle> {
        let bytes = self.loaders.load(source).await?;
        let decoder = Arc::clone(&self.decoder);
        let decoded = tokio::task::spawn_blocking(move || decoder.decode(AssetKind::Image, &bytes))
            .await
            .map_err(|e| DataLoaderError::Decode(e.to_string()))??;

        match decoded {
            DecodedAsset::Image(handle) => Ok(handle),
            other => Err(DataLoaderError::Decode(format!(
                "expected an image, decoder produced {}",
                other.kind()
            ))),
        }
    }
}
