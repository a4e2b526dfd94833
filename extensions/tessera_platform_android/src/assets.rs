//! Android APK asset loading
//!
//! Bundled resources live under `assets/<category>/` in the APK and are read
//! through the NDK `AAssetManager`.

use tessera_platform::assets::{AssetLoader, AssetPath};
use tessera_platform::{PlatformError, Result};

#[cfg(target_os = "android")]
use ndk::asset::AssetManager;

#[cfg(target_os = "android")]
use std::ffi::CString;

/// Android APK asset loader
#[cfg(target_os = "android")]
pub struct AndroidAssetLoader {
    manager: AssetManager,
}

#[cfg(target_os = "android")]
impl AndroidAssetLoader {
    pub fn new(manager: AssetManager) -> Self {
        Self { manager }
    }

    fn c_path(path: &AssetPath) -> Result<CString> {
        CString::new(path.as_str())
            .map_err(|_| PlatformError::AssetLoad(format!("Invalid asset path: {}", path)))
    }
}

#[cfg(target_os = "android")]
impl AssetLoader for AndroidAssetLoader {
    fn load(&self, path: &AssetPath) -> Result<Vec<u8>> {
        if let AssetPath::Absolute(abs) = path {
            return std::fs::read(abs)
                .map_err(|e| PlatformError::AssetLoad(format!("{}: {}", abs, e)));
        }

        let c_path = Self::c_path(path)?;
        let mut asset = self
            .manager
            .open(&c_path)
            .ok_or_else(|| PlatformError::AssetNotFound(path.to_string()))?;
        let bytes = asset
            .buffer()
            .map_err(|e| PlatformError::AssetLoad(format!("{}: {}", path, e)))?;
        tracing::debug!("Loaded Android asset {} ({} bytes)", path, bytes.len());
        Ok(bytes.to_vec())
    }

    fn exists(&self, path: &AssetPath) -> bool {
        match path {
            AssetPath::Absolute(abs) => std::path::Path::new(abs).is_file(),
            _ => Self::c_path(path)
                .ok()
                .and_then(|c_path| self.manager.open(&c_path))
                .is_some(),
        }
    }

    /// Match `name` against file stems in `assets/<category>/`
    fn find_resource(&self, category: &str, name: &str) -> Option<AssetPath> {
        let dir = CString::new(category).ok()?;
        let mut matches: Vec<String> = self
            .manager
            .open_dir(&dir)?
            .filter_map(|entry| entry.into_string().ok())
            .filter(|file| file == name || file.rsplit_once('.').map(|(stem, _)| stem) == Some(name))
            .collect();
        matches.sort();
        matches
            .into_iter()
            .next()
            .map(|file| AssetPath::in_category(category, &file))
    }

    fn platform_name(&self) -> &'static str {
        "android"
    }
}

/// Placeholder for non-Android builds
#[cfg(not(target_os = "android"))]
pub struct AndroidAssetLoader;

#[cfg(not(target_os = "android"))]
impl AndroidAssetLoader {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(target_os = "android"))]
impl Default for AndroidAssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "android"))]
impl AssetLoader for AndroidAssetLoader {
    fn load(&self, _path: &AssetPath) -> Result<Vec<u8>> {
        Err(PlatformError::Unsupported(
            "Android asset loader not available on this platform".to_string(),
        ))
    }

    fn exists(&self, _path: &AssetPath) -> bool {
        false
    }

    fn find_resource(&self, _category: &str, _name: &str) -> Option<AssetPath> {
        None
    }

    fn platform_name(&self) -> &'static str {
        "android-stub"
    }
}
