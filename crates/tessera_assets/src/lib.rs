//! Tessera Assets
//!
//! Resolves asset descriptors to data sources, loads their bytes, caches
//! downloads on disk and assigns decoded assets into engine slots.
//!
//! - [`resolver`] - descriptor to [`DataSource`] precedence rules
//! - [`loader`] - one [`DataLoader`](loader::DataLoader) per source kind
//! - [`cache`] - content-addressed URL cache
//! - [`coordinator`] - concurrent batch loading with a single refresh
//! - [`file`] - engine files wired to a custom asset loader
//! - [`image`] - standalone image loading
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tessera_assets::{ReferencedAsset, ReferencedAssets, ReferencedAssetLoader};
//! use tessera_assets::decode::DefaultAssetFactory;
//!
//! let loader = ReferencedAssetLoader::new(handle, Arc::new(DefaultAssetFactory));
//! let assets = ReferencedAssets::new()
//!     .with("hero", ReferencedAsset::url("https://cdn.example.com/hero.png"))
//!     .with("Inter", ReferencedAsset::bundled("Inter-594377.ttf"));
//! loader.update_assets(&assets, &slots, || println!("refresh"));
//! ```

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod decode;
pub mod error;
pub mod file;
pub mod image;
pub mod loader;
pub mod resolver;
pub mod source;

#[cfg(test)]
mod test_support;

pub use cache::UrlAssetCache;
pub use config::{AssetLoaderConfig, ConfigError};
pub use coordinator::{BatchReport, ReferencedAssetLoader, SlotCache};
pub use decode::DefaultAssetFactory;
pub use error::{AssetFileError, DataLoaderError, Result};
pub use file::{AssetFile, AssetFileFactory, ViewRegistry};
pub use image::ImageFactory;
pub use loader::{DataLoader, Loaders};
pub use source::{DataSource, ReferencedAsset, ReferencedAssets};
