//! Client facade
//!
//! [`TesseraRuntime`] bundles the asset stack behind the calls a reactive
//! client makes: loading files with referenced assets, pushing asset
//! updates and loading standalone images.

use std::sync::Arc;

use anyhow::Context;
use tessera_assets::loader::ResourceLoader;
use tessera_assets::{
    AssetFileFactory, AssetLoaderConfig, DataLoaderError, DefaultAssetFactory, ImageFactory,
    Loaders, ReferencedAssetLoader, UrlAssetCache,
};
use tessera_core::{AssetFactory, FileParser, ImageHandle};
use tessera_platform::AssetLoader;
use tokio::runtime::Handle;

/// Entry point for clients of the asset stack
pub struct TesseraRuntime {
    config: AssetLoaderConfig,
    assets: ReferencedAssetLoader,
    files: AssetFileFactory,
    images: ImageFactory,
}

impl TesseraRuntime {
    pub fn builder(parser: Arc<dyn FileParser>) -> TesseraRuntimeBuilder {
        TesseraRuntimeBuilder::new(parser)
    }

    pub fn config(&self) -> &AssetLoaderConfig {
        &self.config
    }

    /// Coordinator shared by every file this runtime creates
    pub fn asset_loader(&self) -> &ReferencedAssetLoader {
        &self.assets
    }

    /// Factory for asset-aware engine files
    pub fn files(&self) -> &AssetFileFactory {
        &self.files
    }

    pub fn images(&self) -> &ImageFactory {
        &self.images
    }

    pub async fn load_from_url_async(&self, url: &str) -> Result<ImageHandle, DataLoaderError> {
        self.images.load_from_url_async(url).await
    }

    pub async fn load_from_resource_async(
        &self,
        name: &str,
    ) -> Result<ImageHandle, DataLoaderError> {
        self.images.load_from_resource_async(name).await
    }

    pub async fn load_from_bytes_async(
        &self,
        bytes: Vec<u8>,
    ) -> Result<ImageHandle, DataLoaderError> {
        self.images.load_from_bytes_async(bytes).await
    }

    /// Drop every cached URL asset
    pub fn clear_url_cache(&self) {
        self.assets.cache().clear();
    }
}

/// Builder for [`TesseraRuntime`]
pub struct TesseraRuntimeBuilder {
    parser: Arc<dyn FileParser>,
    decoder: Option<Arc<dyn AssetFactory>>,
    config: AssetLoaderConfig,
    runtime: Option<Handle>,
    asset_loader: Option<Arc<dyn AssetLoader>>,
    loaders: Option<Loaders>,
}

impl TesseraRuntimeBuilder {
    fn new(parser: Arc<dyn FileParser>) -> Self {
        Self {
            parser,
            decoder: None,
            config: AssetLoaderConfig::default(),
            runtime: None,
            asset_loader: None,
            loaders: None,
        }
    }

    /// Engine decoder; defaults to [`DefaultAssetFactory`]
    pub fn with_decoder(mut self, decoder: Arc<dyn AssetFactory>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn with_config(mut self, config: AssetLoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Runtime that asset tasks are spawned on; defaults to the current one
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Bundled-resource loader used instead of the global one
    ///
    /// Replaces the resource loader of [`with_loaders`](Self::with_loaders)
    /// too when both are set.
    pub fn with_asset_loader(mut self, loader: Arc<dyn AssetLoader>) -> Self {
        self.asset_loader = Some(loader);
        self
    }

    /// Replace the default data loaders
    pub fn with_loaders(mut self, loaders: Loaders) -> Self {
        self.loaders = Some(loaders);
        self
    }

    pub fn build(self) -> anyhow::Result<TesseraRuntime> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().context("TesseraRuntime needs a tokio runtime")?,
        };
        let decoder = self
            .decoder
            .unwrap_or_else(|| Arc::new(DefaultAssetFactory));

        let mut loaders = self.loaders.unwrap_or_else(|| Loaders::new(&self.config));
        if let Some(asset_loader) = self.asset_loader {
            loaders = loaders.with_resource(Arc::new(
                ResourceLoader::new(self.config.resource_categories.clone())
                    .with_asset_loader(asset_loader),
            ));
        }
        let cache = Arc::new(UrlAssetCache::from_config(&self.config));

        tracing::debug!(
            "Tessera runtime ready (cache: {})",
            cache
                .directory()
                .map_or_else(|| "disabled".to_string(), |dir| dir.display().to_string())
        );

        let assets =
            ReferencedAssetLoader::from_parts(runtime, Arc::clone(&decoder), loaders.clone(), cache);
        Ok(TesseraRuntime {
            files: AssetFileFactory::new(self.parser, assets.clone()),
            images: ImageFactory::new(loaders, decoder),
            config: self.config,
            assets,
        })
    }
}
