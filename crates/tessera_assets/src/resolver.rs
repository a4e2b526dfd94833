//! Source resolution
//!
//! Maps a [`ReferencedAsset`] to the [`DataSource`] its bytes come from.

use url::{ParseError, Url};

use crate::error::{DataLoaderError, Result};
use crate::source::{DataSource, ReferencedAsset};

/// Resolve a descriptor
///
/// Returns `Ok(None)` when no source field is populated; callers skip such
/// assets silently. A pre-decoded image is not a byte source and is handled
/// by the caller before resolution.
pub fn resolve(asset: &ReferencedAsset) -> Result<Option<DataSource>> {
    if let Some(url) = &asset.source_url {
        return resolve_url(url).map(Some);
    }
    if let Some(id) = &asset.source_asset_id {
        return resolve_asset_id(id).map(Some);
    }
    if let Some(name) = &asset.source_asset {
        return Ok(Some(DataSource::resource(name)));
    }
    Ok(None)
}

/// Resolve a URL; only `file`, `http` and `https` are accepted
pub fn resolve_url(url: &str) -> Result<DataSource> {
    let parsed = Url::parse(url).map_err(|_| DataLoaderError::InvalidUrl(url.to_string()))?;
    match parsed.scheme() {
        "file" => parsed
            .to_file_path()
            .map(DataSource::File)
            .map_err(|_| DataLoaderError::InvalidUrl(url.to_string())),
        "http" | "https" => Ok(DataSource::Http(url.to_string())),
        _ => Err(DataLoaderError::InvalidUrl(url.to_string())),
    }
}

/// Resolve an asset id: ids with a scheme are URLs, the rest name bundled
/// resources
fn resolve_asset_id(id: &str) -> Result<DataSource> {
    match Url::parse(id) {
        Ok(_) => resolve_url(id),
        Err(ParseError::RelativeUrlWithoutBase) => Ok(DataSource::Resource(id.to_string())),
        Err(_) => Err(DataLoaderError::InvalidUrl(id.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_url_schemes() {
        assert_eq!(
            resolve(&ReferencedAsset::url("file:///a/b.png")).unwrap(),
            Some(DataSource::File(PathBuf::from("/a/b.png")))
        );
        assert_eq!(
            resolve(&ReferencedAsset::url("https://x/y.png")).unwrap(),
            Some(DataSource::Http("https://x/y.png".to_string()))
        );
        assert_eq!(
            resolve(&ReferencedAsset::url("ftp://x")),
            Err(DataLoaderError::InvalidUrl("ftp://x".to_string()))
        );
    }

    #[test]
    fn test_bundled_asset_drops_extension() {
        assert_eq!(
            resolve(&ReferencedAsset::bundled("Inter-594377.ttf")).unwrap(),
            Some(DataSource::Resource("Inter-594377".to_string()))
        );
        // path is carried but does not change resolution
        assert_eq!(
            resolve(&ReferencedAsset::bundled("hero.png").with_path("images")).unwrap(),
            Some(DataSource::Resource("hero".to_string()))
        );
    }

    #[test]
    fn test_asset_id_with_and_without_scheme() {
        assert_eq!(
            resolve(&ReferencedAsset::asset_id("click_sound")).unwrap(),
            Some(DataSource::Resource("click_sound".to_string()))
        );
        assert_eq!(
            resolve(&ReferencedAsset::asset_id("http://host/click.wav")).unwrap(),
            Some(DataSource::Http("http://host/click.wav".to_string()))
        );
        assert!(matches!(
            resolve(&ReferencedAsset::asset_id("asset:click")),
            Err(DataLoaderError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_precedence_and_empty() {
        let mut asset = ReferencedAsset::bundled("fallback.png");
        asset.source_asset_id = Some("by_id".to_string());
        assert_eq!(
            resolve(&asset).unwrap(),
            Some(DataSource::Resource("by_id".to_string()))
        );
        asset.source_url = Some("https://x/by_url.png".to_string());
        assert_eq!(
            resolve(&asset).unwrap(),
            Some(DataSource::Http("https://x/by_url.png".to_string()))
        );
        assert_eq!(resolve(&ReferencedAsset::default()).unwrap(), None);
    }
}
