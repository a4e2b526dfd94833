//! iOS bundle asset loading
//!
//! Resources live in the main bundle's resource directory. Categories map
//! to bundle sub-directories, and a flat bundle is searched as a fallback.

use std::path::Path;

use tessera_platform::assets::{find_by_stem, AssetLoader, AssetPath};
use tessera_platform::{PlatformError, Result};

#[cfg(target_os = "ios")]
use std::path::PathBuf;

/// Find `name` in `bundle/category`, then at the bundle root
#[cfg_attr(not(target_os = "ios"), allow(dead_code))]
fn find_in_bundle(bundle: &Path, category: &str, name: &str) -> Option<AssetPath> {
    if let Some(found) = find_by_stem(&bundle.join(category), name) {
        return Some(AssetPath::in_category(category, found.file_name()?.to_str()?));
    }
    let found = find_by_stem(bundle, name)?;
    Some(AssetPath::Relative(found.file_name()?.to_str()?.to_string()))
}

#[cfg_attr(not(target_os = "ios"), allow(dead_code))]
fn read_bundle_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PlatformError::AssetNotFound(path.display().to_string()),
        _ => PlatformError::AssetLoad(format!("Failed to load '{}': {}", path.display(), e)),
    })
}

/// Asset loader over the main bundle
#[cfg(target_os = "ios")]
pub struct IOSAssetLoader {
    bundle: Option<PathBuf>,
}

#[cfg(target_os = "ios")]
impl IOSAssetLoader {
    pub fn new() -> Self {
        let bundle = objc2::rc::autoreleasepool(|_| unsafe {
            objc2_foundation::NSBundle::mainBundle()
                .resourcePath()
                .map(|path| PathBuf::from(path.to_string()))
        });
        match &bundle {
            Some(path) => tracing::debug!("Bundle resources at {}", path.display()),
            None => tracing::warn!("Main bundle has no resource path"),
        }
        Self { bundle }
    }

    fn full_path(&self, path: &AssetPath) -> Option<PathBuf> {
        match path {
            AssetPath::Absolute(abs) => Some(PathBuf::from(abs)),
            AssetPath::Relative(rel) => self.bundle.as_ref().map(|b| b.join(rel)),
            AssetPath::Embedded(rel) => self.bundle.as_ref().map(|b| b.join(rel)),
        }
    }
}

#[cfg(target_os = "ios")]
impl Default for IOSAssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "ios")]
impl AssetLoader for IOSAssetLoader {
    fn load(&self, path: &AssetPath) -> Result<Vec<u8>> {
        let full = self
            .full_path(path)
            .ok_or_else(|| PlatformError::NoContext("No bundle resource path".to_string()))?;
        tracing::trace!("Reading bundle file {}", full.display());
        read_bundle_file(&full)
    }

    fn exists(&self, path: &AssetPath) -> bool {
        self.full_path(path).is_some_and(|p| p.is_file())
    }

    fn find_resource(&self, category: &str, name: &str) -> Option<AssetPath> {
        find_in_bundle(self.bundle.as_deref()?, category, name)
    }

    fn platform_name(&self) -> &'static str {
        "ios"
    }
}

/// Placeholder for non-iOS builds
#[cfg(not(target_os = "ios"))]
pub struct IOSAssetLoader;

#[cfg(not(target_os = "ios"))]
impl IOSAssetLoader {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(target_os = "ios"))]
impl Default for IOSAssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "ios"))]
impl AssetLoader for IOSAssetLoader {
    fn load(&self, _path: &AssetPath) -> Result<Vec<u8>> {
        Err(PlatformError::Unsupported(
            "iOS asset loader not available on this platform".to_string(),
        ))
    }

    fn exists(&self, _path: &AssetPath) -> bool {
        false
    }

    fn find_resource(&self, _category: &str, _name: &str) -> Option<AssetPath> {
        None
    }

    fn platform_name(&self) -> &'static str {
        "ios-stub"
    }
}
