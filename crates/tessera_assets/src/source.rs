//! Asset descriptors and data sources

use std::fmt;
use std::path::PathBuf;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tessera_core::ImageHandle;
use url::Url;

use crate::error::{DataLoaderError, Result};

/// Where the bytes of an asset come from
#[derive(Clone, PartialEq, Eq)]
pub enum DataSource {
    /// `http://` or `https://` URL
    Http(String),
    /// Local file
    File(PathBuf),
    /// Bundled resource, by name without extension
    Resource(String),
    /// In-memory buffer
    Bytes(Vec<u8>),
}

impl DataSource {
    /// Source for a URL string: `file://` URLs read the file, anything else
    /// is fetched over HTTP
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|_| DataLoaderError::InvalidUrl(url.to_string()))?;
        if parsed.scheme() == "file" {
            let path = parsed
                .to_file_path()
                .map_err(|_| DataLoaderError::InvalidUrl(url.to_string()))?;
            Ok(DataSource::File(path))
        } else {
            Ok(DataSource::Http(url.to_string()))
        }
    }

    /// Bundled resource from a file name; the extension is dropped
    pub fn resource(name_with_extension: &str) -> Self {
        DataSource::Resource(strip_extension(name_with_extension).to_string())
    }

    /// Short kind name used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            DataSource::Http(_) => "http",
            DataSource::File(_) => "file",
            DataSource::Resource(_) => "resource",
            DataSource::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Http(url) => f.debug_tuple("Http").field(url).finish(),
            DataSource::File(path) => f.debug_tuple("File").field(path).finish(),
            DataSource::Resource(name) => f.debug_tuple("Resource").field(name).finish(),
            // Payloads can be megabytes
            DataSource::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
        }
    }
}

/// Drop the last `.ext` from a file name
///
/// Dot files (`.hidden`) and names without a dot are returned unchanged.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    }
}

/// How the client describes one referenced asset
///
/// Resolution order is `source_url`, then `source_asset_id`, then
/// `source_asset`. A pre-decoded `image` wins over all of them.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencedAsset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_asset_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_asset: Option<String>,

    /// Directory hint for bundled assets; not used for resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip)]
    pub image: Option<ImageHandle>,
}

impl ReferencedAsset {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            source_url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn asset_id(id: impl Into<String>) -> Self {
        Self {
            source_asset_id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn bundled(name: impl Into<String>) -> Self {
        Self {
            source_asset: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn image(image: ImageHandle) -> Self {
        Self {
            image: Some(image),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Batch of referenced assets keyed by asset name
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReferencedAssets {
    #[serde(default)]
    pub data: FxHashMap<String, ReferencedAsset>,
}

impl ReferencedAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one entry
    pub fn with(mut self, key: impl Into<String>, asset: ReferencedAsset) -> Self {
        self.data.insert(key.into(), asset);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ReferencedAsset> {
        self.data.get(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
