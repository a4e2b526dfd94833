//! Tessera iOS Host
//!
//! Registers the main bundle as the global bundled-resource loader. The URL
//! cache uses `Library/Caches`, which is the default cache area on iOS.

pub mod assets;

pub use assets::IOSAssetLoader;

use std::sync::Arc;

/// Install the iOS asset loader
pub fn init() {
    tessera_platform::assets::set_global_asset_loader(Arc::new(IOSAssetLoader::new()));
    match tessera_platform::cache_area::cache_root() {
        Some(root) => tracing::debug!("URL cache area: {}", root.display()),
        None => tracing::warn!("No cache area, URL assets will not be cached"),
    }
}
