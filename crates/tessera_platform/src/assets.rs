//! Bundled asset loading
//!
//! Hosts ship assets inside their application package: an APK's `assets/`
//! tree on Android, the main bundle on iOS, a resource directory on desktop.
//! Each host registers one [`AssetLoader`] and the rest of the stack goes
//! through [`global_asset_loader`] to reach it.
//!
//! Bundled resources are addressed by *name without extension* inside a
//! *category* (`raw`, `drawable`, ...). [`AssetLoader::find_resource`] maps a
//! `(category, name)` pair to a concrete [`AssetPath`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{PlatformError, Result};

/// Location of an asset inside the host package
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetPath {
    /// Path relative to the host's asset root
    Relative(String),
    /// Absolute filesystem path
    Absolute(String),
    /// Name compiled into the binary
    Embedded(&'static str),
}

impl AssetPath {
    /// Path relative to a resource category directory
    pub fn in_category(category: &str, file_name: &str) -> Self {
        if category.is_empty() {
            AssetPath::Relative(file_name.to_string())
        } else {
            AssetPath::Relative(format!("{}/{}", category, file_name))
        }
    }

    /// The path as written
    pub fn as_str(&self) -> &str {
        match self {
            AssetPath::Relative(s) | AssetPath::Absolute(s) => s,
            AssetPath::Embedded(s) => s,
        }
    }
}

impl From<String> for AssetPath {
    fn from(path: String) -> Self {
        if Path::new(&path).is_absolute() {
            AssetPath::Absolute(path)
        } else {
            AssetPath::Relative(path)
        }
    }
}

impl From<&str> for AssetPath {
    fn from(path: &str) -> Self {
        AssetPath::from(path.to_string())
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host capability for reading bundled assets
pub trait AssetLoader: Send + Sync {
    /// Read the full contents of an asset
    fn load(&self, path: &AssetPath) -> Result<Vec<u8>>;

    /// Whether the asset exists
    fn exists(&self, path: &AssetPath) -> bool;

    /// Find a resource by extension-less name within a category
    ///
    /// The default implementation only matches files stored without an
    /// extension; hosts that can list their package override it.
    fn find_resource(&self, category: &str, name: &str) -> Option<AssetPath> {
        let path = AssetPath::in_category(category, name);
        self.exists(&path).then_some(path)
    }

    /// Short host name used in log lines
    fn platform_name(&self) -> &'static str;
}

static GLOBAL_ASSET_LOADER: RwLock<Option<Arc<dyn AssetLoader>>> = RwLock::new(None);

/// Install the process-wide asset loader, replacing any previous one
pub fn set_global_asset_loader(loader: Arc<dyn AssetLoader>) {
    tracing::debug!("Installing {} asset loader", loader.platform_name());
    *GLOBAL_ASSET_LOADER.write() = Some(loader);
}

/// Remove the process-wide asset loader
pub fn clear_global_asset_loader() {
    *GLOBAL_ASSET_LOADER.write() = None;
}

/// The process-wide asset loader, if the host installed one
pub fn global_asset_loader() -> Option<Arc<dyn AssetLoader>> {
    GLOBAL_ASSET_LOADER.read().clone()
}

/// Find a file in `dir` whose name without extension equals `stem`
///
/// Exact file name matches win over stem matches. When several files share
/// the stem the lexicographically first one is returned, so lookups are
/// stable across runs.
pub fn find_by_stem(dir: &Path, stem: &str) -> Option<PathBuf> {
    let exact = dir.join(stem);
    if exact.is_file() {
        return Some(exact);
    }

    let entries = std::fs::read_dir(dir).ok()?;
    let mut matches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.file_stem().and_then(|s| s.to_str()) == Some(stem))
        .collect();
    matches.sort();
    matches.into_iter().next()
}

/// Desktop asset loader backed by a resource directory
///
/// Categories map to sub-directories of the root, so `("raw", "intro")`
/// finds `<root>/raw/intro.riv`.
pub struct FilesystemAssetLoader {
    root: PathBuf,
}

impl FilesystemAssetLoader {
    /// Create a loader rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The resource root
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve_path(&self, path: &AssetPath) -> PathBuf {
        match path {
            AssetPath::Relative(rel) => self.root.join(rel),
            AssetPath::Absolute(abs) => PathBuf::from(abs),
            AssetPath::Embedded(name) => self.root.join(name),
        }
    }
}

impl AssetLoader for FilesystemAssetLoader {
    fn load(&self, path: &AssetPath) -> Result<Vec<u8>> {
        let full_path = self.resolve_path(path);
        std::fs::read(&full_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                PlatformError::AssetNotFound(full_path.display().to_string())
            }
            _ => PlatformError::AssetLoad(format!("{}: {}", full_path.display(), e)),
        })
    }

    fn exists(&self, path: &AssetPath) -> bool {
        self.resolve_path(path).is_file()
    }

    fn find_resource(&self, category: &str, name: &str) -> Option<AssetPath> {
        let dir = if category.is_empty() {
            self.root.clone()
        } else {
            self.root.join(category)
        };
        let found = find_by_stem(&dir, name)?;
        let file_name = found.file_name()?.to_str()?;
        Some(AssetPath::in_category(category, file_name))
    }

    fn platform_name(&self) -> &'static str {
        "filesystem"
    }
}
