//! In-memory engine stand-ins
//!
//! Headless implementations of the [`crate::engine`] traits. Desktop hosts use
//! them when no animation runtime is linked, and the test suites use them to
//! observe subscription counts, slot assignments and refreshes.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::engine::{
    AssetKind, DecodedAsset, Emitter, EngineError, EngineFile, FileAssetLoader, FileParser,
    ImageAccess, ImageHandle, ListAccess, Observable, RefreshTarget, TriggerAccess,
    UpstreamSubscription, ValueAccess,
};

// ─────────────────────────────────────────────────────────────────────────────
// Emitter bookkeeping
// ─────────────────────────────────────────────────────────────────────────────

struct EmitterSet<T> {
    emitters: Arc<Mutex<BTreeMap<u64, Emitter<T>>>>,
    last: Mutex<Option<Emitter<T>>>,
    next_id: AtomicU64,
    subscribe_count: AtomicUsize,
}

impl<T: Clone + 'static> EmitterSet<T> {
    fn new() -> Self {
        Self {
            emitters: Arc::new(Mutex::new(BTreeMap::new())),
            last: Mutex::new(None),
            next_id: AtomicU64::new(0),
            subscribe_count: AtomicUsize::new(0),
        }
    }

    fn register(&self, emitter: Emitter<T>) -> UpstreamSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribe_count.fetch_add(1, Ordering::SeqCst);
        self.emitters.lock().insert(id, emitter.clone());
        *self.last.lock() = Some(emitter);

        let emitters: Weak<Mutex<BTreeMap<u64, Emitter<T>>>> = Arc::downgrade(&self.emitters);
        UpstreamSubscription::new(move || {
            if let Some(emitters) = emitters.upgrade() {
                emitters.lock().remove(&id);
            }
        })
    }

    fn emit(&self, value: T) {
        // Snapshot so a subscriber may cancel while being notified
        let emitters: Vec<Emitter<T>> = self.emitters.lock().values().cloned().collect();
        for emitter in emitters {
            emitter.emit(value.clone());
        }
    }

    fn active(&self) -> usize {
        self.emitters.lock().len()
    }
}

macro_rules! impl_subscription_stats {
    ($ty:ty) => {
        impl $ty {
            /// Total number of subscriptions ever made
            pub fn subscribe_count(&self) -> usize {
                self.emitters.subscribe_count.load(Ordering::SeqCst)
            }

            /// Subscriptions that have not been cancelled
            pub fn active_subscriptions(&self) -> usize {
                self.emitters.active()
            }
        }
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

/// A value property
pub struct MemoryProperty<T> {
    value: Mutex<T>,
    emitters: EmitterSet<T>,
}

impl<T: Clone + Send + 'static> MemoryProperty<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: Mutex::new(initial),
            emitters: EmitterSet::new(),
        }
    }

    /// Store and broadcast a value, as if the engine changed it
    pub fn emit(&self, value: T) {
        *self.value.lock() = value.clone();
        self.emitters.emit(value);
    }

    /// The most recent emitter handed to a subscriber
    pub fn last_emitter(&self) -> Option<Emitter<T>> {
        self.emitters.last.lock().clone()
    }

    pub fn subscribe_count(&self) -> usize {
        self.emitters.subscribe_count.load(Ordering::SeqCst)
    }

    pub fn active_subscriptions(&self) -> usize {
        self.emitters.active()
    }
}

impl<T: Clone + Send + 'static> Observable<T> for MemoryProperty<T> {
    fn subscribe(&self, emitter: Emitter<T>) -> UpstreamSubscription {
        self.emitters.register(emitter)
    }
}

impl<T: Clone + Send + 'static> ValueAccess<T> for MemoryProperty<T> {
    fn get(&self) -> T {
        self.value.lock().clone()
    }

    fn set(&self, value: T) {
        self.emit(value);
    }
}

/// A trigger; emits a synthetic value to every new subscriber
pub struct MemoryTrigger {
    fired: AtomicUsize,
    emitters: EmitterSet<()>,
}

impl MemoryTrigger {
    pub fn new() -> Self {
        Self {
            fired: AtomicUsize::new(0),
            emitters: EmitterSet::new(),
        }
    }

    pub fn fire(&self) {
        self.fired.fetch_add(1, Ordering::SeqCst);
        self.emitters.emit(());
    }

    /// Number of times the trigger fired
    pub fn fire_count(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Default for MemoryTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl_subscription_stats!(MemoryTrigger);

impl Observable<()> for MemoryTrigger {
    fn subscribe(&self, emitter: Emitter<()>) -> UpstreamSubscription {
        let subscription = self.emitters.register(emitter.clone());
        emitter.emit(());
        subscription
    }
}

impl TriggerAccess for MemoryTrigger {
    fn trigger(&self) {
        self.fire();
    }
}

/// A list of instances, tracked by length only
pub struct MemoryList {
    len: AtomicUsize,
    emitters: EmitterSet<()>,
}

impl MemoryList {
    pub fn new(len: usize) -> Self {
        Self {
            len: AtomicUsize::new(len),
            emitters: EmitterSet::new(),
        }
    }

    pub fn push(&self) {
        self.len.fetch_add(1, Ordering::SeqCst);
        self.emitters.emit(());
    }

    pub fn clear(&self) {
        self.len.store(0, Ordering::SeqCst);
        self.emitters.emit(());
    }
}

impl_subscription_stats!(MemoryList);

impl Observable<()> for MemoryList {
    fn subscribe(&self, emitter: Emitter<()>) -> UpstreamSubscription {
        self.emitters.register(emitter)
    }
}

impl ListAccess for MemoryList {
    fn len(&self) -> usize {
        self.len.load(Ordering::SeqCst)
    }
}

/// An image property
pub struct MemoryImage {
    image: Mutex<Option<ImageHandle>>,
    emitters: EmitterSet<()>,
}

impl MemoryImage {
    pub fn new() -> Self {
        Self {
            image: Mutex::new(None),
            emitters: EmitterSet::new(),
        }
    }

    /// The image currently bound
    pub fn image(&self) -> Option<ImageHandle> {
        self.image.lock().clone()
    }
}

impl Default for MemoryImage {
    fn default() -> Self {
        Self::new()
    }
}

impl_subscription_stats!(MemoryImage);

impl Observable<()> for MemoryImage {
    fn subscribe(&self, emitter: Emitter<()>) -> UpstreamSubscription {
        self.emitters.register(emitter)
    }
}

impl ImageAccess for MemoryImage {
    fn set_image(&self, image: Option<&ImageHandle>) {
        *self.image.lock() = image.cloned();
        self.emitters.emit(());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Assets, files and views
// ─────────────────────────────────────────────────────────────────────────────

/// An asset slot that remembers what was assigned into it
pub struct MemoryAssetSlot {
    name: String,
    unique_name: String,
    kind: AssetKind,
    assigned: Mutex<Option<DecodedAsset>>,
    assign_count: AtomicUsize,
}

impl MemoryAssetSlot {
    pub fn new(name: impl Into<String>, unique_name: impl Into<String>, kind: AssetKind) -> Self {
        Self {
            name: name.into(),
            unique_name: unique_name.into(),
            kind,
            assigned: Mutex::new(None),
            assign_count: AtomicUsize::new(0),
        }
    }

    pub fn assigned(&self) -> Option<DecodedAsset> {
        self.assigned.lock().clone()
    }

    pub fn assign_count(&self) -> usize {
        self.assign_count.load(Ordering::SeqCst)
    }
}

impl crate::engine::AssetSlot for MemoryAssetSlot {
    fn name(&self) -> &str {
        &self.name
    }

    fn unique_name(&self) -> &str {
        &self.unique_name
    }

    fn kind(&self) -> AssetKind {
        self.kind
    }

    fn assign(&self, asset: DecodedAsset) {
        *self.assigned.lock() = Some(asset);
        self.assign_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// A view that counts refresh requests
#[derive(Default)]
pub struct MemoryView {
    refreshes: AtomicUsize,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl RefreshTarget for MemoryView {
    fn refresh_after_asset_change(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Referenced asset declared by files produced by [`MemoryFileParser`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotDeclaration {
    pub name: String,
    pub unique_name: String,
    pub kind: AssetKind,
}

impl SlotDeclaration {
    pub fn new(name: impl Into<String>, unique_name: impl Into<String>, kind: AssetKind) -> Self {
        Self {
            name: name.into(),
            unique_name: unique_name.into(),
            kind,
        }
    }
}

/// A parsed in-memory file
pub struct MemoryFile {
    bytes: Vec<u8>,
    slots: Vec<Arc<MemoryAssetSlot>>,
    released: AtomicBool,
}

impl MemoryFile {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn slots(&self) -> &[Arc<MemoryAssetSlot>] {
        &self.slots
    }

    pub fn slot(&self, name: &str) -> Option<&Arc<MemoryAssetSlot>> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl EngineFile for MemoryFile {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Parser producing [`MemoryFile`]s that reference a fixed set of assets
///
/// Each declared asset is offered to the custom asset loader during parsing,
/// with no in-band bytes.
#[derive(Default)]
pub struct MemoryFileParser {
    declarations: Vec<SlotDeclaration>,
    parse_count: AtomicUsize,
}

impl MemoryFileParser {
    pub fn new(declarations: Vec<SlotDeclaration>) -> Self {
        Self {
            declarations,
            parse_count: AtomicUsize::new(0),
        }
    }

    pub fn parse_count(&self) -> usize {
        self.parse_count.load(Ordering::SeqCst)
    }
}

impl FileParser for MemoryFileParser {
    fn parse(
        &self,
        bytes: &[u8],
        asset_loader: Option<Arc<dyn FileAssetLoader>>,
    ) -> Result<Arc<dyn EngineFile>, EngineError> {
        if bytes.is_empty() {
            return Err(EngineError::Parse("empty file".to_string()));
        }
        self.parse_count.fetch_add(1, Ordering::SeqCst);

        let slots: Vec<Arc<MemoryAssetSlot>> = self
            .declarations
            .iter()
            .map(|d| Arc::new(MemoryAssetSlot::new(&d.name, &d.unique_name, d.kind)))
            .collect();

        if let Some(loader) = asset_loader {
            for slot in &slots {
                let handled = loader.load_contents(slot.clone(), &[]);
                tracing::trace!("Asset {} handled by custom loader: {}", slot.name, handled);
            }
        }

        Ok(Arc::new(MemoryFile {
            bytes: bytes.to_vec(),
            slots,
            released: AtomicBool::new(false),
        }))
    }
}
