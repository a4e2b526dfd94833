//! Cross-context Dispatch Bridge
//!
//! Property changes are emitted on the engine's thread, while client
//! callbacks may belong to another execution context (a UI worklet runtime,
//! a script thread). The bridge relays each emission to the context that
//! registered the callback.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   RelayMessage { token, value }   ┌──────────────────────┐
//! │  engine context      │ ────────────── channel ─────────▶ │  target context      │
//! │  hub listener calls  │                                   │  wake hook schedules │
//! │  BoxedCallback::call │                                   │  Relay::drain()      │
//! └──────────────────────┘                                   └──────────────────────┘
//! ```
//!
//! Delivery is asynchronous: `call` enqueues and returns. Messages from one
//! emitting thread arrive in order; nothing is guaranteed across threads.
//!
//! # Example
//!
//! ```ignore
//! use tessera_core::dispatch::{box_callback, install_dispatcher, set_wake_hook};
//!
//! // On the target context, once
//! install_dispatcher();
//! set_wake_hook(|| ui_loop.post(tessera_core::dispatch::drain_dispatcher));
//!
//! let callback = box_callback(|value| println!("changed: {:?}", value));
//! let token = property.add_boxed_listener(callback);
//! ```

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::value::PropertyValue;

// ============================================================================
// Types
// ============================================================================

/// Global relay for the context that installed the dispatcher
static DISPATCH_BRIDGE: OnceLock<Arc<Relay>> = OnceLock::new();

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_CONTEXT: Cell<Option<ContextId>> = const { Cell::new(None) };
}

/// Identifies an execution context that owns a relay
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextId(u64);

/// Identifies a callback registered with a relay
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackToken(u64);

/// One relayed emission
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub token: CallbackToken,
    pub value: PropertyValue,
}

type RelayCallback = Arc<dyn Fn(PropertyValue) + Send + Sync>;

/// The context bound to the calling thread, if any
pub fn current_context() -> Option<ContextId> {
    CURRENT_CONTEXT.with(|current| current.get())
}

// ============================================================================
// Relay
// ============================================================================

/// Message queue owned by one target context
pub struct Relay {
    context: ContextId,
    sender: Sender<RelayMessage>,
    receiver: Mutex<Receiver<RelayMessage>>,
    callbacks: Mutex<FxHashMap<CallbackToken, RelayCallback>>,
    wake: RwLock<Option<Arc<dyn Fn() + Send + Sync>>>,
    active: AtomicBool,
    next_token: AtomicU64,
}

impl Relay {
    /// Create a relay and bind it to the calling thread
    pub fn new() -> Arc<Self> {
        let context = ContextId(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed));
        CURRENT_CONTEXT.with(|current| current.set(Some(context)));

        let (sender, receiver) = mpsc::channel();
        Arc::new(Self {
            context,
            sender,
            receiver: Mutex::new(receiver),
            callbacks: Mutex::new(FxHashMap::default()),
            wake: RwLock::new(None),
            active: AtomicBool::new(true),
            next_token: AtomicU64::new(1),
        })
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Hook invoked after every enqueue, used to schedule [`drain`](Self::drain)
    /// on the target loop
    pub fn set_wake_hook<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.wake.write() = Some(Arc::new(hook));
    }

    /// Register a callback to run on this relay's context
    pub fn box_callback<F>(self: &Arc<Self>, callback: F) -> BoxedCallback
    where
        F: Fn(PropertyValue) + Send + Sync + 'static,
    {
        let token = CallbackToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.callbacks.lock().insert(token, Arc::new(callback));
        BoxedCallback {
            target: Target::Relay {
                relay: Arc::downgrade(self),
                token,
            },
        }
    }

    /// Enqueue a message for the target context
    pub fn post(&self, message: RelayMessage) {
        if !self.is_active() {
            tracing::trace!("Relay {:?} inactive, dropping message", self.context);
            return;
        }
        if self.sender.send(message).is_err() {
            return;
        }
        let wake = self.wake.read().clone();
        if let Some(wake) = wake {
            wake();
        }
    }

    /// Invoke callbacks for every queued message, in arrival order
    ///
    /// Returns the number of callbacks invoked. Messages for unregistered
    /// tokens are discarded.
    pub fn drain(&self) -> usize {
        if current_context() != Some(self.context) {
            tracing::debug!("Relay {:?} drained off its own context", self.context);
        }

        let mut delivered = 0;
        loop {
            let next = self.receiver.lock().try_recv();
            let Ok(message) = next else {
                break;
            };
            if !self.is_active() {
                continue;
            }
            let callback = self.callbacks.lock().get(&message.token).cloned();
            match callback {
                Some(callback) => {
                    callback(message.value);
                    delivered += 1;
                }
                None => {
                    tracing::trace!("Discarding message for released {:?}", message.token)
                }
            }
        }
        delivered
    }

    /// Stop delivery; queued and future messages are discarded
    pub fn deactivate(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            tracing::debug!("Relay {:?} deactivated", self.context);
        }
    }

    pub fn activate(&self) {
        self.active.store(true, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Number of registered callbacks
    pub fn callback_count(&self) -> usize {
        self.callbacks.lock().len()
    }

    fn unregister(&self, token: CallbackToken) {
        let removed = self.callbacks.lock().remove(&token);
        drop(removed);
    }
}

impl fmt::Debug for Relay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relay")
            .field("context", &self.context)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Boxed Callbacks
// ============================================================================

enum Target {
    Relay {
        relay: Weak<Relay>,
        token: CallbackToken,
    },
    Inline(RelayCallback),
}

/// A callback that may be invoked from any thread
///
/// Relay-backed callbacks run on the relay's context once it drains; inline
/// callbacks run synchronously on the emitting thread. Dropping the callback
/// unregisters it.
pub struct BoxedCallback {
    target: Target,
}

impl BoxedCallback {
    /// A callback that runs on the emitting thread
    pub fn inline<F>(callback: F) -> Self
    where
        F: Fn(PropertyValue) + Send + Sync + 'static,
    {
        Self {
            target: Target::Inline(Arc::new(callback)),
        }
    }

    /// Deliver a value; never blocks on the target context
    pub fn call(&self, value: PropertyValue) {
        match &self.target {
            Target::Relay { relay, token } => {
                if let Some(relay) = relay.upgrade() {
                    relay.post(RelayMessage {
                        token: *token,
                        value,
                    });
                }
            }
            Target::Inline(callback) => callback(value),
        }
    }

    /// Token on the relay, `None` for inline callbacks
    pub fn token(&self) -> Option<CallbackToken> {
        match &self.target {
            Target::Relay { token, .. } => Some(*token),
            Target::Inline(_) => None,
        }
    }
}

impl Drop for BoxedCallback {
    fn drop(&mut self) {
        if let Target::Relay { relay, token } = &self.target {
            if let Some(relay) = relay.upgrade() {
                relay.unregister(*token);
            }
        }
    }
}

impl fmt::Debug for BoxedCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedCallback")
            .field("token", &self.token())
            .finish()
    }
}

// ============================================================================
// Global Bridge
// ============================================================================

/// Process-wide dispatcher singleton
pub struct DispatchBridge;

impl DispatchBridge {
    /// Install the relay on the calling context
    ///
    /// Later calls return the existing relay untouched, so a relay the host
    /// deactivated stays inactive.
    pub fn install() -> Arc<Relay> {
        let mut created = false;
        let relay = DISPATCH_BRIDGE.get_or_init(|| {
            created = true;
            Relay::new()
        });
        if created {
            tracing::debug!("Dispatcher installed on {:?}", relay.context());
        } else {
            tracing::debug!("Dispatcher already installed");
        }
        Arc::clone(relay)
    }

    /// The installed relay, if any
    pub fn try_get() -> Option<Arc<Relay>> {
        DISPATCH_BRIDGE.get().cloned()
    }

    pub fn is_installed() -> bool {
        DISPATCH_BRIDGE.get().is_some()
    }
}

/// Install the process-wide relay on the calling context
///
/// Convenience wrapper around [`DispatchBridge::install`].
pub fn install_dispatcher() -> Arc<Relay> {
    DispatchBridge::install()
}

/// Box a callback for the installed relay
///
/// Without an installed relay the callback runs inline on the emitting
/// thread.
pub fn box_callback<F>(callback: F) -> BoxedCallback
where
    F: Fn(PropertyValue) + Send + Sync + 'static,
{
    match DispatchBridge::try_get() {
        Some(relay) => relay.box_callback(callback),
        None => {
            tracing::debug!("No dispatcher installed, callback will run inline");
            BoxedCallback::inline(callback)
        }
    }
}

/// Drain the installed relay; returns the number of callbacks invoked
pub fn drain_dispatcher() -> usize {
    DispatchBridge::try_get().map_or(0, |relay| relay.drain())
}

/// Set the wake hook of the installed relay
pub fn set_wake_hook<F>(hook: F)
where
    F: Fn() + Send + Sync + 'static,
{
    match DispatchBridge::try_get() {
        Some(relay) => relay.set_wake_hook(hook),
        None => tracing::warn!("set_wake_hook called before install_dispatcher"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_relay_delivers_in_order_on_drain() {
        let relay = Relay::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback = relay.box_callback(move |value| sink.lock().push(value));

        let emitter = std::thread::spawn(move || {
            for i in 0..5 {
                callback.call(PropertyValue::Number(i as f64));
            }
            callback
        });
        let callback = emitter.join().unwrap();
        assert!(seen.lock().is_empty());

        assert_eq!(relay.drain(), 5);
        let values: Vec<f64> = seen
            .lock()
            .iter()
            .cloned()
            .map(|v| f64::try_from(v).unwrap())
            .collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        drop(callback);
    }

    #[test]
    fn test_wake_hook_runs_per_message() {
        let relay = Relay::new();
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        relay.set_wake_hook(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let callback = relay.box_callback(|_| {});
        callback.call(PropertyValue::Unit);
        callback.call(PropertyValue::Boolean(true));
        assert_eq!(wakes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_dropped_callback_messages_are_discarded() {
        let relay = Relay::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let callback = relay.box_callback(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        callback.call(PropertyValue::Unit);
        assert_eq!(relay.callback_count(), 1);

        drop(callback);
        assert_eq!(relay.callback_count(), 0);
        assert_eq!(relay.drain(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_deactivated_relay_discards() {
        let relay = Relay::new();
        let callback = relay.box_callback(|_| panic!("must not be delivered"));
        callback.call(PropertyValue::Unit);
        relay.deactivate();
        callback.call(PropertyValue::Unit);
        assert_eq!(relay.drain(), 0);
    }

    #[test]
    fn test_inline_callback_runs_immediately() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let callback = BoxedCallback::inline(move |value| *sink.lock() = Some(value));
        callback.call(PropertyValue::String("now".into()));
        assert_eq!(*seen.lock(), Some(PropertyValue::String("now".into())));
        assert!(callback.token().is_none());
    }

    #[test]
    fn test_install_is_idempotent() {
        let first = install_dispatcher();
        let second = install_dispatcher();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(DispatchBridge::is_installed());

        first.deactivate();
        let third = install_dispatcher();
        assert!(!third.is_active());
        first.activate();
        assert!(third.is_active());
    }

    #[test]
    fn test_relay_message_serializes() {
        let message = RelayMessage {
            token: CallbackToken(7),
            value: PropertyValue::Boolean(true),
        };
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(json, r#"{"token":7,"value":{"type":"boolean","value":true}}"#);
    }
}
