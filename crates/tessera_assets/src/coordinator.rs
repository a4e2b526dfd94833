//! Asset load coordination
//!
//! [`ReferencedAssetLoader`] turns client asset descriptors into decoded
//! engine assets. It has two entry points:
//!
//! - [`update_assets`](ReferencedAssetLoader::update_assets): a batch
//!   `{asset key -> descriptor}` against the slots a file already knows.
//!   Every asset loads as its own task; the single refresh runs once the
//!   whole batch has settled.
//! - [`create_custom_loader`](ReferencedAssetLoader::create_custom_loader):
//!   the hook the engine calls synchronously for each referenced asset while
//!   parsing a file.
//!
//! Failures never propagate out of a batch. Each failing asset is logged and
//! counted in the [`BatchReport`]; its slot is left untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tessera_core::{AssetFactory, AssetKind, AssetSlot, DecodedAsset, FileAssetLoader, ImageHandle};
use tokio::runtime::Handle;
use tokio::task::{JoinHandle, JoinSet};

use crate::cache::UrlAssetCache;
use crate::config::AssetLoaderConfig;
use crate::error::{DataLoaderError, Result};
use crate::loader::Loaders;
use crate::resolver;
use crate::source::{strip_extension, DataSource, ReferencedAsset, ReferencedAssets};

/// Live engine slots of one file, keyed by asset key
pub type SlotCache = Arc<Mutex<FxHashMap<String, Arc<dyn AssetSlot>>>>;

/// Tally of one settled batch
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    /// Assets decoded and assigned into their slot
    pub loaded: usize,
    /// Assets whose resolution, load or decode failed
    pub failed: usize,
    /// Assets with no source, empty data or a slot of another kind
    pub skipped: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Loaded => self.loaded += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.loaded + self.failed + self.skipped
    }
}

/// Result of loading one asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Loaded,
    Failed,
    Skipped,
}

struct Inner {
    loaders: Loaders,
    cache: Arc<UrlAssetCache>,
    factory: Arc<dyn AssetFactory>,
    runtime: Handle,
    disposed: AtomicBool,
}

/// Resolves, fetches, decodes and assigns referenced assets
#[derive(Clone)]
pub struct ReferencedAssetLoader {
    inner: Arc<Inner>,
}

impl ReferencedAssetLoader {
    /// Loader with default loaders and the global URL cache
    pub fn new(runtime: Handle, factory: Arc<dyn AssetFactory>) -> Self {
        Self::from_parts(runtime, factory, Loaders::default(), UrlAssetCache::global())
    }

    /// Loader configured from `config`
    pub fn from_config(
        runtime: Handle,
        factory: Arc<dyn AssetFactory>,
        config: &AssetLoaderConfig,
    ) -> Self {
        Self::from_parts(
            runtime,
            factory,
            Loaders::new(config),
            Arc::new(UrlAssetCache::from_config(config)),
        )
    }

    pub fn from_parts(
        runtime: Handle,
        factory: Arc<dyn AssetFactory>,
        loaders: Loaders,
        cache: Arc<UrlAssetCache>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                loaders,
                cache,
                factory,
                runtime,
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Loader sharing these loaders, cache and decoder with its own
    /// disposal state
    pub fn scoped(&self) -> Self {
        Self::from_parts(
            self.inner.runtime.clone(),
            Arc::clone(&self.inner.factory),
            self.inner.loaders.clone(),
            Arc::clone(&self.inner.cache),
        )
    }

    pub fn runtime(&self) -> &Handle {
        &self.inner.runtime
    }

    pub fn loaders(&self) -> &Loaders {
        &self.inner.loaders
    }

    pub fn cache(&self) -> &Arc<UrlAssetCache> {
        &self.inner.cache
    }

    /// Fetch the bytes behind `source`; HTTP sources go through the cache
    pub async fn fetch(&self, source: &DataSource) -> Result<Vec<u8>> {
        self.inner.fetch(source).await
    }

    /// Load a batch into the matching slots, then call `refresh` once
    ///
    /// Keys without a known slot are ignored. Returns `None` when nothing
    /// matched (no refresh happens) or the loader was disposed. The returned
    /// handle resolves after `refresh` ran.
    pub fn update_assets<R>(
        &self,
        assets: &ReferencedAssets,
        slots: &FxHashMap<String, Arc<dyn AssetSlot>>,
        refresh: R,
    ) -> Option<JoinHandle<BatchReport>>
    where
        R: FnOnce() + Send + 'static,
    {
        if self.is_disposed() {
            tracing::debug!("Asset loader disposed, ignoring batch of {}", assets.len());
            return None;
        }

        let mut report = BatchReport::default();
        let mut tasks = JoinSet::new();
        let mut matched = 0;

        for (key, asset) in &assets.data {
            let Some(slot) = slots.get(key) else {
                continue;
            };
            matched += 1;

            if let Some(image) = &asset.image {
                report.record(assign_image(key, slot.as_ref(), image));
                continue;
            }

            let inner = Arc::clone(&self.inner);
            tasks.spawn_on(
                inner.load_into(key.clone(), asset.clone(), Arc::clone(slot)),
                &self.inner.runtime,
            );
        }

        if matched == 0 {
            return None;
        }

        Some(self.inner.runtime.spawn(async move {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(outcome) => report.record(outcome),
                    Err(e) => {
                        tracing::error!("Asset load task failed: {}", e);
                        report.failed += 1;
                    }
                }
            }
            tracing::debug!(
                "Asset batch settled: {} loaded, {} failed, {} skipped",
                report.loaded,
                report.failed,
                report.skipped
            );
            refresh();
            report
        }))
    }

    /// Build the hook the engine calls for each referenced asset while
    /// parsing
    ///
    /// Returns `None` without descriptors. Every slot the hook takes over is
    /// recorded in `slots`; `refresh` runs after each of its loads that
    /// assigned an asset.
    pub fn create_custom_loader<R>(
        &self,
        assets: Option<&ReferencedAssets>,
        slots: SlotCache,
        refresh: R,
    ) -> Option<Arc<dyn FileAssetLoader>>
    where
        R: Fn() + Send + Sync + 'static,
    {
        let assets = assets?;
        Some(Arc::new(CustomAssetLoader {
            inner: Arc::clone(&self.inner),
            assets: assets.data.clone(),
            slots,
            refresh: Arc::new(refresh),
        }))
    }

    /// Stop scheduling new loads; in-flight loads run to completion
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Asset loader disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }
}

impl Inner {
    async fn fetch(&self, source: &DataSource) -> Result<Vec<u8>> {
        match source {
            DataSource::Http(url) => {
                self.cache
                    .read_through(url, self.loaders.http.load(source))
                    .await
            }
            _ => self.loaders.load(source).await,
        }
    }

    async fn load_into(
        self: Arc<Self>,
        key: String,
        asset: ReferencedAsset,
        slot: Arc<dyn AssetSlot>,
    ) -> Outcome {
        if let Some(image) = &asset.image {
            return assign_image(&key, slot.as_ref(), image);
        }

        let source = match resolver::resolve(&asset) {
            Ok(Some(source)) => source,
            Ok(None) => {
                tracing::debug!("Asset {} has no source, skipping", key);
                return Outcome::Skipped;
            }
            Err(e) => {
                tracing::error!("Failed to resolve asset {}: {}", key, e);
                return Outcome::Failed;
            }
        };

        let bytes = match self.fetch(&source).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Failed to load asset {} from {}: {}", key, source.kind(), e);
                return Outcome::Failed;
            }
        };
        if bytes.is_empty() {
            tracing::debug!("Asset {} loaded no data, skipping", key);
            return Outcome::Skipped;
        }

        let factory = Arc::clone(&self.factory);
        let kind = slot.kind();
        let decoded = tokio::task::spawn_blocking(move || factory.decode(kind, &bytes))
            .await
            .map_err(|e| DataLoaderError::Decode(e.to_string()))
            .and_then(|decoded| decoded.map_err(DataLoaderError::from));

        match decoded {
            Ok(decoded) => assign_checked(&key, slot.as_ref(), decoded),
            Err(e) => {
                tracing::error!("Failed to decode {} asset {}: {}", kind, key, e);
                Outcome::Failed
            }
        }
    }
}

fn assign_checked(key: &str, slot: &dyn AssetSlot, asset: DecodedAsset) -> Outcome {
    if asset.kind() != slot.kind() {
        tracing::warn!(
            "Asset {} decoded as {} but its slot holds {}",
            key,
            asset.kind(),
            slot.kind()
        );
        return Outcome::Skipped;
    }
    slot.assign(asset);
    tracing::debug!("Assigned {} asset {}", slot.kind(), key);
    Outcome::Loaded
}

fn assign_image(key: &str, slot: &dyn AssetSlot, image: &ImageHandle) -> Outcome {
    if slot.kind() != AssetKind::Image {
        tracing::warn!("Pre-decoded image given for {} slot {}", slot.kind(), key);
        return Outcome::Skipped;
    }
    assign_checked(key, slot, DecodedAsset::Image(image.clone()))
}

struct CustomAssetLoader {
    inner: Arc<Inner>,
    assets: FxHashMap<String, ReferencedAsset>,
    slots: SlotCache,
    refresh: Arc<dyn Fn() + Send + Sync>,
}

impl CustomAssetLoader {
    /// Descriptor for a slot: unique name without extension, then plain name
    fn lookup(&self, slot: &dyn AssetSlot) -> Option<(String, &ReferencedAsset)> {
        let unique = strip_extension(slot.unique_name());
        if let Some(asset) = self.assets.get(unique) {
            return Some((unique.to_string(), asset));
        }
        self.assets
            .get(slot.name())
            .map(|asset| (slot.name().to_string(), asset))
    }
}

impl FileAssetLoader for CustomAssetLoader {
    fn load_contents(&self, slot: Arc<dyn AssetSlot>, _in_band_bytes: &[u8]) -> bool {
        let Some((key, asset)) = self.lookup(slot.as_ref()) else {
            return false;
        };
        self.slots.lock().insert(key.clone(), Arc::clone(&slot));

        if self.inner.disposed.load(Ordering::Acquire) {
            tracing::debug!("Asset loader disposed, not loading {}", key);
            return true;
        }

        let inner = Arc::clone(&self.inner);
        let refresh = Arc::clone(&self.refresh);
        let asset = asset.clone();
        self.inner.runtime.spawn(async move {
            if inner.load_into(key, asset, slot).await == Outcome::Loaded {
                refresh();
            }
        });
        true
    }
}
