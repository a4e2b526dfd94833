//! Data loaders
//!
//! One loader per [`DataSource`] kind. Each loader only accepts its own
//! variant and fails with
//! [`DataLoaderError::InvalidSource`](crate::error::DataLoaderError::InvalidSource)
//! otherwise.
//! [`Loaders`] bundles one of each and dispatches by variant.

mod bytes;
mod file;
mod http;
mod resource;

use std::sync::Arc;

use async_trait::async_trait;

pub use bytes::BytesLoader;
pub use file::FileLoader;
pub use http::HttpLoader;
pub use resource::ResourceLoader;

use crate::config::AssetLoaderConfig;
use crate::error::Result;
use crate::source::DataSource;

/// Reads the bytes behind a [`DataSource`]
#[async_trait]
pub trait DataLoader: Send + Sync {
    async fn load(&self, source: &DataSource) -> Result<Vec<u8>>;
}

/// One loader per source kind
///
/// Members are public so hosts and tests can swap individual loaders.
#[derive(Clone)]
pub struct Loaders {
    pub http: Arc<dyn DataLoader>,
    pub file: Arc<dyn DataLoader>,
    pub resource: Arc<dyn DataLoader>,
    pub bytes: Arc<dyn DataLoader>,
}

impl Loaders {
    /// Default loaders configured from `config`
    pub fn new(config: &AssetLoaderConfig) -> Self {
        Self {
            http: Arc::new(HttpLoader::from_config(config)),
            file: Arc::new(FileLoader),
            resource: Arc::new(ResourceLoader::new(config.resource_categories.clone())),
            bytes: Arc::new(BytesLoader),
        }
    }

    pub fn with_http(mut self, loader: Arc<dyn DataLoader>) -> Self {
        self.http = loader;
        self
    }

    pub fn with_file(mut self, loader: Arc<dyn DataLoader>) -> Self {
        self.file = loader;
        self
    }

    pub fn with_resource(mut self, loader: Arc<dyn DataLoader>) -> Self {
        self.resource = loader;
        self
    }

    /// The loader responsible for `source`
    pub fn for_source(&self, source: &DataSource) -> &Arc<dyn DataLoader> {
        match source {
            DataSource::Http(_) => &self.http,
            DataSource::File(_) => &self.file,
            DataSource::Resource(_) => &self.resource,
            DataSource::Bytes(_) => &self.bytes,
        }
    }

    /// Load `source` with its loader
    pub async fn load(&self, source: &DataSource) -> Result<Vec<u8>> {
        self.for_source(source).load(source).await
    }
}

impl Default for Loaders {
    fn default() -> Self {
        Self::new(&AssetLoaderConfig::default())
    }
}
