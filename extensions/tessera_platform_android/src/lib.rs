//! Tessera Android Host
//!
//! Registers the APK asset manager as the global bundled-resource loader
//! and the app cache directory as the URL cache area.
//!
//! ```ignore
//! #[no_mangle]
//! fn android_main(app: android_activity::AndroidApp) {
//!     tessera_platform_android::init(&app);
//!     // ...
//! }
//! ```

pub mod assets;

pub use assets::AndroidAssetLoader;

/// Install the Android asset loader and cache area
#[cfg(target_os = "android")]
pub fn init(app: &android_activity::AndroidApp) {
    use std::sync::Arc;

    tessera_platform::assets::set_global_asset_loader(Arc::new(AndroidAssetLoader::new(
        app.asset_manager(),
    )));

    // Context.cacheDir is a sibling of the files directory
    match app.internal_data_path().and_then(|files| files.parent().map(|p| p.join("cache"))) {
        Some(cache) => tessera_platform::cache_area::set_cache_root(cache),
        None => tracing::warn!("No internal data path, URL cache uses the default area"),
    }
}
