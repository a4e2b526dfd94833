//! Asset-aware engine files
//!
//! [`AssetFileFactory`] fetches file bytes from any [`DataSource`], parses
//! them with the engine and wires a custom asset loader in when referenced
//! assets are given. The resulting [`AssetFile`] owns the slot cache the
//! loader fills and the views that must re-render when slots change.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tessera_core::{AssetSlot, EngineFile, FileParser, RefreshTarget};
use tokio::task::JoinHandle;

use crate::coordinator::{BatchReport, ReferencedAssetLoader, SlotCache};
use crate::error::AssetFileError;
use crate::source::{DataSource, ReferencedAssets};

/// Views depending on one file, held weakly
#[derive(Default)]
pub struct ViewRegistry {
    views: Mutex<Vec<Weak<dyn RefreshTarget>>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, view: &Arc<dyn RefreshTarget>) {
        let mut views = self.views.lock();
        views.retain(|v| v.strong_count() > 0);
        if !views.iter().any(|v| same_view(v, view)) {
            views.push(Arc::downgrade(view));
        }
    }

    pub fn unregister(&self, view: &Arc<dyn RefreshTarget>) {
        self.views
            .lock()
            .retain(|v| v.strong_count() > 0 && !same_view(v, view));
    }

    /// Live registered views
    pub fn len(&self) -> usize {
        self.views.lock().iter().filter(|v| v.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Refresh every live view; dead entries are pruned
    pub fn refresh_all(&self) {
        let live: Vec<Arc<dyn RefreshTarget>> = {
            let mut views = self.views.lock();
            views.retain(|v| v.strong_count() > 0);
            views.iter().filter_map(Weak::upgrade).collect()
        };
        tracing::trace!("Refreshing {} views after asset change", live.len());
        for view in live {
            view.refresh_after_asset_change();
        }
    }

    fn clear(&self) {
        self.views.lock().clear();
    }
}

fn same_view(registered: &Weak<dyn RefreshTarget>, view: &Arc<dyn RefreshTarget>) -> bool {
    registered.as_ptr() as *const () == Arc::as_ptr(view) as *const ()
}

/// A parsed engine file together with its asset plumbing
pub struct AssetFile {
    file: Arc<dyn EngineFile>,
    slots: SlotCache,
    views: Arc<ViewRegistry>,
    loader: ReferencedAssetLoader,
    released: AtomicBool,
}

impl AssetFile {
    /// The engine-native file
    pub fn engine_file(&self) -> &Arc<dyn EngineFile> {
        &self.file
    }

    pub fn register_view(&self, view: &Arc<dyn RefreshTarget>) {
        self.views.register(view);
    }

    pub fn unregister_view(&self, view: &Arc<dyn RefreshTarget>) {
        self.views.unregister(view);
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Asset keys the custom loader has taken over
    pub fn slot_keys(&self) -> Vec<String> {
        self.slots.lock().keys().cloned().collect()
    }

    /// Load `assets` into the slots recorded during parsing
    ///
    /// Fire-and-forget for hosts; Rust callers may await the handle. Every
    /// registered view refreshes once after the batch settles, and only if
    /// at least one key matched a recorded slot.
    pub fn update_referenced_assets(
        &self,
        assets: &ReferencedAssets,
    ) -> Option<JoinHandle<BatchReport>> {
        if self.is_released() {
            tracing::debug!("Ignoring asset update for released file");
            return None;
        }
        let snapshot: FxHashMap<String, Arc<dyn AssetSlot>> = self.slots.lock().clone();
        let views = Arc::clone(&self.views);
        self.loader
            .update_assets(assets, &snapshot, move || views.refresh_all())
    }

    /// Ask every registered view to re-render
    pub fn refresh_after_asset_change(&self) {
        self.views.refresh_all();
    }

    /// Drop engine resources; further asset loads are not scheduled
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.loader.dispose();
        self.slots.lock().clear();
        self.views.clear();
        self.file.release();
        tracing::debug!("Asset file released");
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl Drop for AssetFile {
    fn drop(&mut self) {
        self.release();
    }
}

/// Creates [`AssetFile`]s from URLs, files, bundled resources or bytes
#[derive(Clone)]
pub struct AssetFileFactory {
    parser: Arc<dyn FileParser>,
    loader: ReferencedAssetLoader,
}

impl AssetFileFactory {
    pub fn new(parser: Arc<dyn FileParser>, loader: ReferencedAssetLoader) -> Self {
        Self { parser, loader }
    }

    /// Download and parse a remote file
    pub async fn from_url(
        &self,
        url: &str,
        assets: Option<&ReferencedAssets>,
    ) -> Result<AssetFile, AssetFileError> {
        let source = DataSource::from_url(url)?;
        self.from_source(&source, assets).await
    }

    /// Parse a local `file://` URL
    pub async fn from_file_url(
        &self,
        url: &str,
        assets: Option<&ReferencedAssets>,
    ) -> Result<AssetFile, AssetFileError> {
        if !url.starts_with("file://") {
            return Err(AssetFileError::NotFileUrl(url.to_string()));
        }
        let source = DataSource::from_url(url)?;
        self.from_source(&source, assets).await
    }

    /// Parse a bundled resource, given with its extension
    pub async fn from_resource(
        &self,
        name: &str,
        assets: Option<&ReferencedAssets>,
    ) -> Result<AssetFile, AssetFileError> {
        self.from_source(&DataSource::resource(name), assets).await
    }

    pub async fn from_bytes(
        &self,
        bytes: Vec<u8>,
        assets: Option<&ReferencedAssets>,
    ) -> Result<AssetFile, AssetFileError> {
        self.parse(bytes, assets).await
    }

    async fn from_source(
        &self,
        source: &DataSource,
        assets: Option<&ReferencedAssets>,
    ) -> Result<AssetFile, AssetFileError> {
        let bytes = self.loader.loaders().load(source).await?;
        tracing::debug!("Loaded {} byte file from {}", bytes.len(), source.kind());
        self.parse(bytes, assets).await
    }

    async fn parse(
        &self,
        bytes: Vec<u8>,
        assets: Option<&ReferencedAssets>,
    ) -> Result<AssetFile, AssetFileError> {
        let loader = self.loader.scoped();
        let slots: SlotCache = Arc::default();
        let views = Arc::new(ViewRegistry::new());

        let refresh_views = Arc::downgrade(&views);
        let custom_loader = loader.create_custom_loader(assets, Arc::clone(&slots), move || {
            if let Some(views) = refresh_views.upgrade() {
                views.refresh_all();
            }
        });

        let parser = Arc::clone(&self.parser);
        let file = tokio::task::spawn_blocking(move || parser.parse(&bytes, custom_loader))
            .await
            .map_err(|e| AssetFileError::Task(e.to_string()))??;

        Ok(AssetFile {
            file,
            slots,
            views,
            loader,
            released: AtomicBool::new(false),
        })
    }
}
