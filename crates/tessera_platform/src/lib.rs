//! Tessera Platform Abstraction Layer
//!
//! Host capabilities the asset stack needs but cannot provide portably:
//!
//! - [`assets::AssetLoader`] - reading resources bundled with the application
//! - [`cache_area`] - the host directory where downloaded assets may be cached
//!
//! # Platform Implementations
//!
//! - [`assets::FilesystemAssetLoader`] - desktop and headless hosts
//! - `tessera_platform_android` - APK asset categories via the NDK
//! - `tessera_platform_ios` - main bundle resources
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tessera_platform::assets::{set_global_asset_loader, FilesystemAssetLoader};
//!
//! set_global_asset_loader(Arc::new(FilesystemAssetLoader::new("resources")));
//! tessera_platform::cache_area::set_cache_root("/var/cache/my-app");
//! ```

pub mod assets;
pub mod cache_area;
mod error;

pub use assets::{AssetLoader, AssetPath, FilesystemAssetLoader};
pub use error::{PlatformError, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::assets::{
        global_asset_loader, set_global_asset_loader, AssetLoader, AssetPath,
        FilesystemAssetLoader,
    };
    pub use crate::error::{PlatformError, Result};
}
