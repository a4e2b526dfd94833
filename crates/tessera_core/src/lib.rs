//! Tessera Core
//!
//! This crate provides the engine-facing primitives of Tessera:
//!
//! - **Engine Interfaces**: traits the animation engine implements for property
//!   access, asset slots, file parsing and view refresh
//! - **Property Listener Hub**: many client listeners over one upstream
//!   subscription per property
//! - **Typed Properties**: number, boolean, string, enum, color, trigger, list
//!   and image wrappers
//! - **Dispatch Bridge**: relays changes to callbacks owned by another
//!   execution context
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tessera_core::memory::MemoryProperty;
//! use tessera_core::property::{NumberProperty, PropertyListeners};
//!
//! let engine = Arc::new(MemoryProperty::new(0.0_f32));
//! let score = NumberProperty::new("player/score", engine.clone());
//!
//! let token = score.add_listener(|value| println!("score: {}", value));
//! score.set_value(10.0);
//! assert_eq!(score.value(), 10.0);
//!
//! token.remove();
//! score.dispose();
//! ```

pub mod dispatch;
pub mod engine;
pub mod listeners;
pub mod memory;
pub mod property;
pub mod value;

pub use dispatch::{
    box_callback, install_dispatcher, BoxedCallback, CallbackToken, ContextId, DispatchBridge,
    Relay, RelayMessage,
};
pub use engine::{
    AssetFactory, AssetKind, AssetSlot, DecodedAsset, Emitter, EngineError, EngineFile,
    FileAssetLoader, FileParser, ImageHandle, NativeObject, Observable, RefreshTarget,
    UpstreamSubscription, ValueAccess,
};
pub use listeners::{ListenerHub, ListenerId, ListenerToken};
pub use property::{
    BooleanProperty, ColorProperty, EnumProperty, ImageProperty, ListProperty, NumberProperty,
    Property, PropertyListeners, StringProperty, TriggerProperty,
};
pub use value::{Color, PropertyValue, ValueMismatch};
