//! Host cache area
//!
//! Mobile hosts own a per-app cache directory (`Context.cacheDir` on Android,
//! `Library/Caches` on iOS) that the OS may purge. Hosts register it once at
//! startup; desktop falls back to the user cache directory.

use std::path::PathBuf;

use parking_lot::RwLock;

static CACHE_ROOT: RwLock<Option<PathBuf>> = RwLock::new(None);

/// Register the host's cache directory
pub fn set_cache_root(path: impl Into<PathBuf>) {
    let path = path.into();
    tracing::debug!("Cache root set to {}", path.display());
    *CACHE_ROOT.write() = Some(path);
}

/// Forget the registered cache directory
pub fn clear_cache_root() {
    *CACHE_ROOT.write() = None;
}

/// The host cache directory
///
/// Returns the registered root, or the OS user cache directory when the
/// host did not register one. `None` means caching is unavailable.
pub fn cache_root() -> Option<PathBuf> {
    if let Some(root) = CACHE_ROOT.read().clone() {
        return Some(root);
    }
    dirs::cache_dir()
}
