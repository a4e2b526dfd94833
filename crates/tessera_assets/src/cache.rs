//! URL asset cache
//!
//! Disk-backed, content-addressed cache for assets downloaded over HTTP.
//! Every URL maps to one file named `hex(sha256(url))` holding the raw bytes.
//!
//! The cache is strictly best effort: read failures are misses, write and
//! clear failures are logged and swallowed. A corrupt or unwritable cache
//! directory degrades to always fetching.

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::config::{AssetLoaderConfig, DEFAULT_CACHE_DIR_NAME};
use crate::error::Result;

static GLOBAL_CACHE: OnceLock<Arc<UrlAssetCache>> = OnceLock::new();

/// Cache of downloaded URL assets
#[derive(Debug, Clone)]
pub struct UrlAssetCache {
    /// `None` disables caching
    dir: Option<PathBuf>,
}

impl UrlAssetCache {
    /// Cache stored directly in `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Cache that never stores anything
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Cache in `<host cache area>/<dir_name>`
    pub fn in_cache_area(dir_name: &str) -> Self {
        match tessera_platform::cache_area::cache_root() {
            Some(root) => Self::new(root.join(dir_name)),
            None => {
                tracing::warn!("No cache area available, URL assets will not be cached");
                Self::disabled()
            }
        }
    }

    pub fn from_config(config: &AssetLoaderConfig) -> Self {
        if !config.cache_enabled {
            return Self::disabled();
        }
        match &config.cache_root {
            Some(root) => Self::new(root.join(&config.cache_dir_name)),
            None => Self::in_cache_area(&config.cache_dir_name),
        }
    }

    /// Process-wide cache in the host cache area
    ///
    /// The location is fixed by the first call; register the host cache
    /// root before that.
    pub fn global() -> Arc<UrlAssetCache> {
        GLOBAL_CACHE
            .get_or_init(|| Arc::new(Self::in_cache_area(DEFAULT_CACHE_DIR_NAME)))
            .clone()
    }

    /// File name used for `url`
    pub fn cache_key(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    /// The cache directory, `None` when caching is disabled
    pub fn directory(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn entry_path(&self, url: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(Self::cache_key(url)))
    }

    /// Cached bytes for `url`; missing, empty and unreadable entries are misses
    pub fn cached_data(&self, url: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(url)?;
        match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => None,
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Failed to read from cache {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store `bytes` for `url`
    ///
    /// The entry is written to a temporary file and renamed into place, so
    /// readers never see partial data. The last writer wins.
    pub fn save(&self, url: &str, bytes: &[u8]) {
        let (Some(dir), Some(path)) = (self.dir.as_ref(), self.entry_path(url)) else {
            return;
        };
        if let Err(e) = write_atomically(dir, &path, bytes) {
            tracing::warn!("Failed to save to cache {}: {}", path.display(), e);
        }
    }

    /// Remove every entry
    pub fn clear(&self) {
        let Some(dir) = self.dir.as_ref() else {
            return;
        };
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                tracing::warn!("Failed to clear cache {}: {}", dir.display(), e);
                return;
            }
        };
        for entry in entries.flatten() {
            if let Err(e) = std::fs::remove_file(entry.path()) {
                tracing::warn!("Failed to remove {}: {}", entry.path().display(), e);
            }
        }
        tracing::debug!("Cleared URL asset cache {}", dir.display());
    }

    /// Serve `url` from the cache, or run `fetch` and write the result through
    ///
    /// Disk access runs on the blocking pool.
    pub async fn read_through<F>(self: &Arc<Self>, url: &str, fetch: F) -> Result<Vec<u8>>
    where
        F: Future<Output = Result<Vec<u8>>>,
    {
        let cache = Arc::clone(self);
        let key = url.to_string();
        let cached = tokio::task::spawn_blocking(move || cache.cached_data(&key))
            .await
            .ok()
            .flatten();
        if let Some(bytes) = cached {
            tracing::debug!("Cache hit for {}", url);
            return Ok(bytes);
        }

        tracing::debug!("Cache miss for {}", url);
        let bytes = fetch.await?;

        let cache = Arc::clone(self);
        let key = url.to_string();
        let data = bytes.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || cache.save(&key, &data)).await {
            tracing::warn!("Cache write task failed for {}: {}", url, e);
        }
        Ok(bytes)
    }
}

fn write_atomically(dir: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataLoaderError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const URL: &str = "https://cdn.example.com/hero.png";

    #[test]
    fn test_cache_key_is_sha256_hex() {
        assert_eq!(
            UrlAssetCache::cache_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_save_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let cache = UrlAssetCache::new(dir.path().join("urls"));
        assert_eq!(cache.cached_data(URL), None);

        cache.save(URL, b"hero bytes");
        assert_eq!(cache.cached_data(URL), Some(b"hero bytes".to_vec()));
        assert!(dir
            .path()
            .join("urls")
            .join(UrlAssetCache::cache_key(URL))
            .is_file());
    }

    #[test]
    fn test_empty_entry_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = UrlAssetCache::new(dir.path());
        std::fs::write(dir.path().join(UrlAssetCache::cache_key(URL)), b"").unwrap();
        assert_eq!(cache.cached_data(URL), None);
    }

    #[test]
    fn test_clear_removes_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = UrlAssetCache::new(dir.path());
        cache.save(URL, b"one");
        cache.save("https://cdn.example.com/two.png", b"two");

        cache.clear();
        assert_eq!(cache.cached_data(URL), None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unwritable_cache_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let cache = UrlAssetCache::new(&blocker);
        cache.save(URL, b"bytes");
        assert_eq!(cache.cached_data(URL), None);
        cache.clear();
    }

    #[test]
    fn test_disabled_cache() {
        let cache = UrlAssetCache::from_config(&AssetLoaderConfig::uncached());
        assert!(cache.directory().is_none());
        cache.save(URL, b"bytes");
        assert_eq!(cache.cached_data(URL), None);
    }

    #[tokio::test]
    async fn test_read_through_fetches_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(UrlAssetCache::new(dir.path()));
        let fetches = AtomicUsize::new(0);

        for _ in 0..3 {
            let bytes = cache
                .read_through(URL, async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(b"remote".to_vec())
                })
                .await
                .unwrap();
            assert_eq!(bytes, b"remote");
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        let failed = cache
            .read_through("https://cdn.example.com/missing.png", async {
                Err(DataLoaderError::HttpError {
                    status_code: 404,
                    url: "https://cdn.example.com/missing.png".to_string(),
                })
            })
            .await;
        assert!(failed.is_err());
        assert_eq!(cache.cached_data("https://cdn.example.com/missing.png"), None);
    }
}
