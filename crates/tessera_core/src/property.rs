//! Typed view-model property wrappers
//!
//! Each wrapper pairs the engine accessor for one property with a
//! [`ListenerHub`], so any number of client listeners share one upstream
//! subscription.
//!
//! | wrapper | engine accessor | listener payload |
//! |---|---|---|
//! | [`Property<T>`] (boolean, string, enum, color) | [`ValueAccess<T>`] | `T` |
//! | [`NumberProperty`] | `ValueAccess<f32>` | `f64` |
//! | [`TriggerProperty`] | [`TriggerAccess`] | none, first emission dropped |
//! | [`ListProperty`] | [`ListAccess`] | none |
//! | [`ImageProperty`] | [`ImageAccess`] | none |

use std::sync::Arc;

use crate::dispatch::BoxedCallback;
use crate::engine::{
    Emitter, ImageAccess, ImageHandle, ListAccess, Observable, TriggerAccess,
    UpstreamSubscription, ValueAccess,
};
use crate::listeners::{ListenerHub, ListenerToken};
use crate::value::{Color, PropertyValue};

/// Listener management shared by every property wrapper
pub trait PropertyListeners {
    type Value: Clone + Send + 'static;

    fn hub(&self) -> &ListenerHub<Self::Value>;

    /// Deliver changes to a callback boxed on another execution context
    fn add_boxed_listener(&self, callback: BoxedCallback) -> ListenerToken
    where
        Self: Sized,
    {
        let convert = self.relay_converter();
        self.hub().add_listener(move |value| callback.call(convert(value)))
    }

    /// Conversion from an emission into a relay payload
    fn relay_converter(&self) -> fn(Self::Value) -> PropertyValue;

    fn to_relay_value(&self, value: Self::Value) -> PropertyValue {
        (self.relay_converter())(value)
    }

    /// Remove every listener and release the upstream subscription
    fn remove_listeners(&self) {
        self.hub().remove_listeners();
    }

    /// Release the upstream subscription; the property stays usable
    fn dispose(&self) {
        self.hub().dispose();
    }

    fn listener_count(&self) -> usize {
        self.hub().listener_count()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Value properties
// ─────────────────────────────────────────────────────────────────────────────

/// A readable, writable and observable property
pub struct Property<T> {
    access: Arc<dyn ValueAccess<T>>,
    hub: ListenerHub<T>,
    to_relay: fn(T) -> PropertyValue,
}

pub type BooleanProperty = Property<bool>;
pub type StringProperty = Property<String>;
pub type EnumProperty = Property<String>;
pub type ColorProperty = Property<Color>;

impl<T> Property<T>
where
    T: Clone + Send + Into<PropertyValue> + 'static,
{
    pub fn new<A>(path: impl Into<String>, access: Arc<A>) -> Self
    where
        A: ValueAccess<T> + 'static,
    {
        Self::with_relay(path, access, <T as Into<PropertyValue>>::into)
    }
}

impl<T: Clone + Send + 'static> Property<T> {
    fn with_relay<A>(
        path: impl Into<String>,
        access: Arc<A>,
        to_relay: fn(T) -> PropertyValue,
    ) -> Self
    where
        A: ValueAccess<T> + 'static,
    {
        let source: Arc<dyn Observable<T>> = access.clone();
        Self {
            access,
            hub: ListenerHub::new(path, source),
            to_relay,
        }
    }

    pub fn value(&self) -> T {
        self.access.get()
    }

    pub fn set_value(&self, value: T) {
        self.access.set(value);
    }

    /// Register a change listener
    pub fn add_listener<F>(&self, callback: F) -> ListenerToken
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.hub.add_listener(callback)
    }
}

impl Property<String> {
    /// Enum property; relayed values carry the selected case name
    pub fn new_enum<A>(path: impl Into<String>, access: Arc<A>) -> Self
    where
        A: ValueAccess<String> + 'static,
    {
        Self::with_relay(path, access, PropertyValue::Enum)
    }
}

impl<T: Clone + Send + 'static> PropertyListeners for Property<T> {
    type Value = T;

    fn hub(&self) -> &ListenerHub<T> {
        &self.hub
    }

    fn relay_converter(&self) -> fn(T) -> PropertyValue {
        self.to_relay
    }
}

/// Engine numbers are single precision; the client sees `f64`
struct WidenedNumber(Arc<dyn ValueAccess<f32>>);

impl Observable<f64> for WidenedNumber {
    fn subscribe(&self, emitter: Emitter<f64>) -> UpstreamSubscription {
        self.0.subscribe(emitter.contramap(f64::from))
    }
}

/// A numeric property
pub struct NumberProperty {
    access: Arc<dyn ValueAccess<f32>>,
    hub: ListenerHub<f64>,
}

impl NumberProperty {
    pub fn new<A>(path: impl Into<String>, access: Arc<A>) -> Self
    where
        A: ValueAccess<f32> + 'static,
    {
        let access: Arc<dyn ValueAccess<f32>> = access;
        let source: Arc<dyn Observable<f64>> = Arc::new(WidenedNumber(access.clone()));
        Self {
            access,
            hub: ListenerHub::new(path, source),
        }
    }

    pub fn value(&self) -> f64 {
        f64::from(self.access.get())
    }

    pub fn set_value(&self, value: f64) {
        self.access.set(value as f32);
    }

    pub fn add_listener<F>(&self, callback: F) -> ListenerToken
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.hub.add_listener(callback)
    }
}

impl PropertyListeners for NumberProperty {
    type Value = f64;

    fn hub(&self) -> &ListenerHub<f64> {
        &self.hub
    }

    fn relay_converter(&self) -> fn(f64) -> PropertyValue {
        PropertyValue::Number
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Void properties
// ─────────────────────────────────────────────────────────────────────────────

fn unit(_: ()) -> PropertyValue {
    PropertyValue::Unit
}

macro_rules! void_listeners {
    ($ty:ty) => {
        impl $ty {
            /// Register a listener called on every change
            pub fn add_listener<F>(&self, callback: F) -> ListenerToken
            where
                F: Fn() + Send + Sync + 'static,
            {
                self.hub.add_listener(move |()| callback())
            }
        }

        impl PropertyListeners for $ty {
            type Value = ();

            fn hub(&self) -> &ListenerHub<()> {
                &self.hub
            }

            fn relay_converter(&self) -> fn(()) -> PropertyValue {
                unit
            }
        }
    };
}

/// A fire-only property
///
/// The engine replays a synthetic emission on subscribe; listeners only see
/// real firings.
pub struct TriggerProperty {
    access: Arc<dyn TriggerAccess>,
    hub: ListenerHub<()>,
}

impl TriggerProperty {
    pub fn new<A>(path: impl Into<String>, access: Arc<A>) -> Self
    where
        A: TriggerAccess + 'static,
    {
        let source: Arc<dyn Observable<()>> = access.clone();
        Self {
            access,
            hub: ListenerHub::with_initial_skip(path, source, 1),
        }
    }

    pub fn trigger(&self) {
        self.access.trigger();
    }
}

void_listeners!(TriggerProperty);

/// A list of view-model instances
pub struct ListProperty {
    access: Arc<dyn ListAccess>,
    hub: ListenerHub<()>,
}

impl ListProperty {
    pub fn new<A>(path: impl Into<String>, access: Arc<A>) -> Self
    where
        A: ListAccess + 'static,
    {
        let source: Arc<dyn Observable<()>> = access.clone();
        Self {
            access,
            hub: ListenerHub::new(path, source),
        }
    }

    pub fn length(&self) -> usize {
        self.access.len()
    }
}

void_listeners!(ListProperty);

/// A write-only image property
pub struct ImageProperty {
    access: Arc<dyn ImageAccess>,
    hub: ListenerHub<()>,
}

impl ImageProperty {
    pub fn new<A>(path: impl Into<String>, access: Arc<A>) -> Self
    where
        A: ImageAccess + 'static,
    {
        let source: Arc<dyn Observable<()>> = access.clone();
        Self {
            access,
            hub: ListenerHub::new(path, source),
        }
    }

    /// Bind an image, or clear the binding with `None`
    pub fn set(&self, image: Option<&ImageHandle>) {
        self.access.set_image(image);
    }
}

void_listeners!(ImageProperty);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NativeObject;
    use crate::memory::{MemoryImage, MemoryList, MemoryProperty, MemoryTrigger};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_number_property_widens() {
        let engine = Arc::new(MemoryProperty::new(0.5_f32));
        let property = NumberProperty::new("speed", engine.clone());
        assert_eq!(property.value(), 0.5);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        property.add_listener(move |v| sink.lock().push(v));
        property.set_value(2.0);
        assert_eq!(engine.get(), 2.0_f32);
        assert_eq!(*seen.lock(), vec![2.0]);
    }

    #[test]
    fn test_enum_relay_value() {
        let engine = Arc::new(MemoryProperty::new("idle".to_string()));
        let enum_property = EnumProperty::new_enum("state", engine.clone());
        let string_property = StringProperty::new("state", engine);
        assert_eq!(
            enum_property.to_relay_value("run".into()),
            PropertyValue::Enum("run".into())
        );
        assert_eq!(
            string_property.to_relay_value("run".into()),
            PropertyValue::String("run".into())
        );
    }

    #[test]
    fn test_trigger_listener_sees_only_real_firings() {
        let engine = Arc::new(MemoryTrigger::new());
        let property = TriggerProperty::new("jump", engine.clone());
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        property.add_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 0);

        property.trigger();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        property.dispose();
        assert_eq!(engine.active_subscriptions(), 0);
    }

    #[test]
    fn test_list_and_image_properties() {
        let list = Arc::new(MemoryList::new(2));
        let property = ListProperty::new("items", list.clone());
        let changes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&changes);
        property.add_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        list.push();
        assert_eq!(property.length(), 3);
        assert_eq!(changes.load(Ordering::SeqCst), 1);

        let engine = Arc::new(MemoryImage::new());
        let image = ImageProperty::new("avatar", engine.clone());
        let handle = ImageHandle::new(NativeObject::new(()), 64);
        image.set(Some(&handle));
        assert_eq!(engine.image().map(|i| i.byte_size()), Some(64));
        image.set(None);
        assert!(engine.image().is_none());
    }

    #[test]
    fn test_color_property_round_trip() {
        let engine = Arc::new(MemoryProperty::new(Color::from_argb(0)));
        let property = ColorProperty::new("tint", engine);
        property.set_value(Color::from_argb(0xFF00FF00));
        assert_eq!(property.value().green(), 0xFF);
        assert_eq!(property.listener_count(), 0);
    }
}
