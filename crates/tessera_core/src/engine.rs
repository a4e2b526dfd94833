//! Animation engine collaborator interfaces
//!
//! The engine owns artboards, view-model instances and decoded assets. This
//! module describes the small surface Tessera needs from it:
//!
//! - property access and raw change notifications ([`ValueAccess`], [`Observable`])
//! - asset slots and decoding ([`AssetSlot`], [`AssetFactory`])
//! - the custom asset loader hook invoked while parsing ([`FileAssetLoader`])
//! - file parsing and view refresh ([`FileParser`], [`RefreshTarget`])
//!
//! Host bindings implement these traits on top of the real engine runtime.
//! [`crate::memory`] provides in-process implementations for headless use.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::value::Color;

/// Errors reported by the engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Asset bytes could not be decoded into a native object
    #[error("Decode failed: {0}")]
    Decode(String),

    /// File bytes could not be parsed
    #[error("Parse failed: {0}")]
    Parse(String),
}

// ============================================================================
// Change Notifications
// ============================================================================

/// Sink the engine pushes property changes into
pub struct Emitter<T> {
    sink: Arc<dyn Fn(T) + Send + Sync>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<T: 'static> Emitter<T> {
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Push one change
    pub fn emit(&self, value: T) {
        (self.sink)(value)
    }

    /// Adapt an emitter so the engine can feed it values of another type
    pub fn contramap<U, F>(self, f: F) -> Emitter<U>
    where
        U: 'static,
        F: Fn(U) -> T + Send + Sync + 'static,
    {
        Emitter::new(move |value: U| self.emit(f(value)))
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter").finish_non_exhaustive()
    }
}

/// Live registration with an engine change stream
///
/// Dropping the subscription (or calling [`cancel`](Self::cancel)) detaches
/// it from the engine.
#[must_use = "dropping an UpstreamSubscription cancels it"]
pub struct UpstreamSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl UpstreamSubscription {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Subscription with nothing to tear down
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Detach from the engine now
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for UpstreamSubscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for UpstreamSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamSubscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// A raw per-property change stream
pub trait Observable<T>: Send + Sync {
    /// Start delivering changes to `emitter` until the subscription is dropped
    fn subscribe(&self, emitter: Emitter<T>) -> UpstreamSubscription;
}

/// A readable and writable engine property
pub trait ValueAccess<T>: Observable<T> {
    fn get(&self) -> T;
    fn set(&self, value: T);
}

/// A fire-only engine property
///
/// Trigger streams emit one synthetic value right after subscription.
pub trait TriggerAccess: Observable<()> {
    fn trigger(&self);
}

/// A list of view-model instances; emissions carry no payload
pub trait ListAccess: Observable<()> {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A write-only image property
pub trait ImageAccess: Observable<()> {
    fn set_image(&self, image: Option<&ImageHandle>);
}

/// Engine-side color property access in packed ARGB
pub trait ColorAccess: ValueAccess<Color> {}

impl<T: ValueAccess<Color> + ?Sized> ColorAccess for T {}

// ============================================================================
// Assets
// ============================================================================

/// Concrete kind of an engine asset slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Font,
    Audio,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Image => f.write_str("image"),
            AssetKind::Font => f.write_str("font"),
            AssetKind::Audio => f.write_str("audio"),
        }
    }
}

/// Type-erased engine object (render image, font, audio source)
#[derive(Clone)]
pub struct NativeObject(Arc<dyn Any + Send + Sync>);

impl NativeObject {
    pub fn new<T: Any + Send + Sync>(object: T) -> Self {
        Self(Arc::new(object))
    }

    /// Borrow the object as its concrete engine type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Whether two handles point at the same object
    pub fn ptr_eq(&self, other: &NativeObject) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for NativeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NativeObject").finish()
    }
}

/// A decoded image together with the size of its encoded bytes
#[derive(Clone, Debug)]
pub struct ImageHandle {
    native: NativeObject,
    byte_size: usize,
}

impl ImageHandle {
    pub fn new(native: NativeObject, byte_size: usize) -> Self {
        Self { native, byte_size }
    }

    /// Size of the encoded data the image was decoded from
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub fn native(&self) -> &NativeObject {
        &self.native
    }
}

/// An asset decoded into engine-native form
#[derive(Clone, Debug)]
pub enum DecodedAsset {
    Image(ImageHandle),
    Font(NativeObject),
    Audio(NativeObject),
}

impl DecodedAsset {
    pub fn kind(&self) -> AssetKind {
        match self {
            DecodedAsset::Image(_) => AssetKind::Image,
            DecodedAsset::Font(_) => AssetKind::Font,
            DecodedAsset::Audio(_) => AssetKind::Audio,
        }
    }
}

/// Engine decoder for out-of-band asset bytes
pub trait AssetFactory: Send + Sync {
    fn decode(&self, kind: AssetKind, bytes: &[u8]) -> Result<DecodedAsset, EngineError>;
}

/// An asset referenced by a file, owned by the engine
pub trait AssetSlot: Send + Sync {
    /// Name as authored
    fn name(&self) -> &str;

    /// Name made unique by the exporter, usually `<name>-<id>.<ext>`
    fn unique_name(&self) -> &str;

    fn kind(&self) -> AssetKind;

    /// Replace the slot's contents
    ///
    /// Callers only pass assets whose kind matches [`AssetSlot::kind`].
    fn assign(&self, asset: DecodedAsset);
}

/// Hook the engine calls for every referenced asset while parsing a file
pub trait FileAssetLoader: Send + Sync {
    /// Returns `true` when the asset was taken over by this loader
    fn load_contents(&self, slot: Arc<dyn AssetSlot>, in_band_bytes: &[u8]) -> bool;
}

// ============================================================================
// Files and Views
// ============================================================================

/// A parsed engine file
pub trait EngineFile: Send + Sync {
    /// Borrow as the concrete engine type
    fn as_any(&self) -> &dyn Any;

    /// Free engine resources; the default does nothing
    fn release(&self) {}
}

/// Engine file parser
pub trait FileParser: Send + Sync {
    fn parse(
        &self,
        bytes: &[u8],
        asset_loader: Option<Arc<dyn FileAssetLoader>>,
    ) -> Result<Arc<dyn EngineFile>, EngineError>;
}

/// A view that renders content depending on a file's assets
pub trait RefreshTarget: Send + Sync {
    /// Re-render after asset slots changed
    fn refresh_after_asset_change(&self);
}
