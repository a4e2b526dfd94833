//! Property Listener Hub
//!
//! Multiplexes any number of client listeners onto a single upstream engine
//! subscription per property.
//!
//! # Lifecycle
//!
//! ```text
//!   Unsubscribed ──add_listener (first)──▶ Subscribed
//!        ▲                                     │
//!        └── last token removed / remove_listeners / dispose
//! ```
//!
//! - The upstream subscription is created lazily by the first listener and
//!   torn down as soon as the registry empties.
//! - [`ListenerToken`]s hold a weak back-reference, so removing through a
//!   token after the hub was dropped or disposed is a no-op.
//! - Every (re)subscription gets a new generation; emissions from a torn-down
//!   subscription are ignored.
//!
//! Mutation and notification are serialized by a re-entrant lock, so a
//! callback may add or remove listeners on the same property while it runs.
//!
//! # Example
//!
//! ```ignore
//! use tessera_core::listeners::ListenerHub;
//!
//! let hub = ListenerHub::new("player/score", engine_property);
//! let token = hub.add_listener(|score: f64| println!("score: {}", score));
//! // ...
//! token.remove();
//! ```

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::ReentrantMutex;
use slotmap::{new_key_type, SlotMap};

use crate::engine::{Emitter, Observable, UpstreamSubscription};

new_key_type! {
    /// Identifies one registered listener within its hub
    pub struct ListenerId;
}

type Listener<T> = Arc<dyn Fn(T) + Send + Sync>;

struct HubState<T> {
    listeners: SlotMap<ListenerId, Listener<T>>,
    upstream: Option<UpstreamSubscription>,
    /// Bumped on every subscribe and teardown
    generation: u64,
}

struct HubShared<T> {
    path: String,
    source: Arc<dyn Observable<T>>,
    /// Emissions dropped at the start of each subscription
    initial_skip: usize,
    state: ReentrantMutex<RefCell<HubState<T>>>,
}

/// Fan-out registry for one engine property
pub struct ListenerHub<T> {
    shared: Arc<HubShared<T>>,
}

impl<T: Clone + Send + 'static> ListenerHub<T> {
    /// Create a hub over an engine change stream
    pub fn new(path: impl Into<String>, source: Arc<dyn Observable<T>>) -> Self {
        Self::with_initial_skip(path, source, 0)
    }

    /// Create a hub that drops the first `count` emissions of every
    /// subscription
    ///
    /// Trigger streams emit a synthetic value on subscribe; hubs over them use
    /// a skip count of one.
    pub fn with_initial_skip(
        path: impl Into<String>,
        source: Arc<dyn Observable<T>>,
        count: usize,
    ) -> Self {
        Self {
            shared: Arc::new(HubShared {
                path: path.into(),
                source,
                initial_skip: count,
                state: ReentrantMutex::new(RefCell::new(HubState {
                    listeners: SlotMap::with_key(),
                    upstream: None,
                    generation: 0,
                })),
            }),
        }
    }

    /// Register a callback for every subsequent change
    ///
    /// The first listener subscribes upstream.
    pub fn add_listener<F>(&self, callback: F) -> ListenerToken
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let shared = &self.shared;
        let guard = shared.state.lock();

        let (id, subscribe_generation) = {
            let mut state = guard.borrow_mut();
            let id = state.listeners.insert(Arc::new(callback));
            if state.upstream.is_none() {
                state.generation += 1;
                (id, Some(state.generation))
            } else {
                (id, None)
            }
        };

        if let Some(generation) = subscribe_generation {
            // No borrow is held: the engine may emit synchronously here
            let subscription = shared.source.subscribe(shared.emitter(generation));
            let rejected = {
                let mut state = guard.borrow_mut();
                if state.generation == generation && !state.listeners.is_empty() {
                    state.upstream = Some(subscription);
                    None
                } else {
                    Some(subscription)
                }
            };
            match rejected {
                Some(stale) => drop(stale),
                None => tracing::debug!("Subscribed upstream for {}", shared.path),
            }
        }

        let hub: Weak<HubShared<T>> = Arc::downgrade(shared);
        ListenerToken { hub, id }
    }

    /// Remove every listener and tear the upstream subscription down
    pub fn remove_listeners(&self) {
        self.shared.teardown();
    }

    /// Release the upstream subscription and all listeners
    ///
    /// The hub stays usable: a later [`add_listener`](Self::add_listener)
    /// subscribes again.
    pub fn dispose(&self) {
        self.shared.teardown();
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        let guard = self.shared.state.lock();
        let count = guard.borrow().listeners.len();
        count
    }

    /// Whether an upstream subscription is currently held
    pub fn is_subscribed(&self) -> bool {
        let guard = self.shared.state.lock();
        let subscribed = guard.borrow().upstream.is_some();
        subscribed
    }

    /// Property path used in log lines
    pub fn path(&self) -> &str {
        &self.shared.path
    }
}

impl<T> fmt::Debug for ListenerHub<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHub")
            .field("path", &self.shared.path)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + Send + 'static> HubShared<T> {
    fn emitter(self: &Arc<Self>, generation: u64) -> Emitter<T> {
        let hub = Arc::downgrade(self);
        let skip = AtomicUsize::new(self.initial_skip);
        Emitter::new(move |value: T| {
            let Some(hub) = hub.upgrade() else {
                return;
            };
            let skipped = skip
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                .is_ok();
            if skipped {
                return;
            }
            hub.notify(generation, value);
        })
    }

    fn notify(&self, generation: u64, value: T) {
        let guard = self.state.lock();
        let callbacks: Vec<Listener<T>> = {
            let state = guard.borrow();
            if state.generation != generation {
                tracing::trace!("Dropping stale emission for {}", self.path);
                return;
            }
            state.listeners.values().cloned().collect()
        };

        for callback in callbacks {
            callback(value.clone());
        }
    }

    fn teardown(&self) {
        let guard = self.state.lock();
        let (listeners, upstream) = {
            let mut state = guard.borrow_mut();
            state.generation += 1;
            // drain() bumps slot versions, so outstanding tokens stay dead
            let listeners: Vec<Listener<T>> =
                state.listeners.drain().map(|(_, listener)| listener).collect();
            (listeners, state.upstream.take())
        };
        if upstream.is_some() {
            tracing::debug!("Unsubscribed upstream for {}", self.path);
        }
        drop(upstream);
        drop(listeners);
    }
}

trait RemoveListener: Send + Sync {
    fn remove_listener(&self, id: ListenerId);
}

impl<T: Clone + Send + 'static> RemoveListener for HubShared<T> {
    fn remove_listener(&self, id: ListenerId) {
        let guard = self.state.lock();
        let (removed, upstream) = {
            let mut state = guard.borrow_mut();
            let removed = state.listeners.remove(id);
            let upstream = if removed.is_some() && state.listeners.is_empty() {
                state.generation += 1;
                state.upstream.take()
            } else {
                None
            };
            (removed, upstream)
        };
        if upstream.is_some() {
            tracing::debug!("Last listener removed, unsubscribed upstream for {}", self.path);
        }
        drop(upstream);
        drop(removed);
    }
}

/// Handle that removes one listener from its hub
///
/// Removal is idempotent and a no-op once the hub is gone. Dropping the token
/// does not remove the listener.
#[derive(Clone)]
pub struct ListenerToken {
    hub: Weak<dyn RemoveListener>,
    id: ListenerId,
}

impl ListenerToken {
    /// Remove this token's listener
    pub fn remove(&self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove_listener(self.id);
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl fmt::Debug for ListenerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerToken")
            .field("id", &self.id)
            .field("live", &(self.hub.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryProperty, MemoryTrigger};
    use parking_lot::Mutex;

    fn recorder<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(T) + Send + Sync + Clone) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |v: T| sink.lock().push(v))
    }

    #[test]
    fn test_single_upstream_subscription_for_many_listeners() {
        let property = Arc::new(MemoryProperty::new(0.0_f64));
        let hub = ListenerHub::new("score", property.clone() as Arc<dyn Observable<f64>>);

        let (seen_a, record_a) = recorder();
        let (seen_b, record_b) = recorder();
        let a = hub.add_listener(record_a);
        let b = hub.add_listener(record_b);
        assert_eq!(property.subscribe_count(), 1);
        assert_eq!(property.active_subscriptions(), 1);

        property.emit(3.0);
        assert_eq!(*seen_a.lock(), vec![3.0]);
        assert_eq!(*seen_b.lock(), vec![3.0]);

        a.remove();
        assert!(hub.is_subscribed());
        property.emit(4.0);
        assert_eq!(*seen_a.lock(), vec![3.0]);
        assert_eq!(*seen_b.lock(), vec![3.0, 4.0]);

        b.remove();
        assert!(!hub.is_subscribed());
        assert_eq!(property.active_subscriptions(), 0);

        let (_, record_c) = recorder::<f64>();
        hub.add_listener(record_c);
        assert_eq!(property.subscribe_count(), 2);
        assert_eq!(property.active_subscriptions(), 1);
    }

    #[test]
    fn test_token_removal_is_idempotent() {
        let property = Arc::new(MemoryProperty::new(false));
        let hub = ListenerHub::new("flag", property.clone() as Arc<dyn Observable<bool>>);
        let (_, record) = recorder::<bool>();
        let first = hub.add_listener(record.clone());
        let second = hub.add_listener(record);

        first.remove();
        first.remove();
        assert_eq!(hub.listener_count(), 1);
        assert!(hub.is_subscribed());
        second.remove();
        assert_eq!(property.active_subscriptions(), 0);
    }

    #[test]
    fn test_remove_listeners_tears_down() {
        let property = Arc::new(MemoryProperty::new(String::new()));
        let hub = ListenerHub::new("title", property.clone() as Arc<dyn Observable<String>>);
        let (seen, record) = recorder::<String>();
        hub.add_listener(record.clone());
        hub.add_listener(record);

        hub.remove_listeners();
        assert_eq!(hub.listener_count(), 0);
        assert_eq!(property.active_subscriptions(), 0);
        property.emit("ignored".to_string());
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_token_after_dispose_is_noop() {
        let property = Arc::new(MemoryProperty::new(1.0_f64));
        let hub = ListenerHub::new("speed", property.clone() as Arc<dyn Observable<f64>>);
        let (_, record) = recorder::<f64>();
        let token = hub.add_listener(record.clone());

        hub.dispose();
        token.remove();
        assert_eq!(property.active_subscriptions(), 0);

        // A fresh listener after dispose must not be removed by the old token
        hub.add_listener(record);
        token.remove();
        assert_eq!(hub.listener_count(), 1);
        assert!(hub.is_subscribed());

        drop(hub);
        token.remove();
        assert_eq!(property.active_subscriptions(), 0);
    }

    #[test]
    fn test_trigger_drops_initial_emission() {
        let trigger = Arc::new(MemoryTrigger::new());
        let hub =
            ListenerHub::with_initial_skip("fire", trigger.clone() as Arc<dyn Observable<()>>, 1);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let token = hub.add_listener(move |()| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 0);

        trigger.fire();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Every new subscription drops its own initial emission
        token.remove();
        let counter = Arc::clone(&count);
        hub.add_listener(move |()| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
        trigger.fire();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_callback_may_mutate_its_own_hub() {
        let property = Arc::new(MemoryProperty::new(0.0_f64));
        let hub = Arc::new(ListenerHub::new(
            "level",
            property.clone() as Arc<dyn Observable<f64>>,
        ));

        let slot: Arc<Mutex<Option<ListenerToken>>> = Arc::new(Mutex::new(None));
        let own = Arc::clone(&slot);
        let token = hub.add_listener(move |_| {
            if let Some(token) = own.lock().take() {
                token.remove();
            }
        });
        *slot.lock() = Some(token);

        property.emit(1.0);
        assert_eq!(hub.listener_count(), 0);
        assert_eq!(property.active_subscriptions(), 0);
    }

    #[test]
    fn test_stale_emitter_is_ignored() {
        let property = Arc::new(MemoryProperty::new(0.0_f64));
        let hub = ListenerHub::new("stale", property.clone() as Arc<dyn Observable<f64>>);
        let (seen, record) = recorder::<f64>();
        hub.add_listener(record.clone());
        let stale = property.last_emitter().unwrap();

        hub.remove_listeners();
        hub.add_listener(record);
        stale.emit(9.0);
        assert!(seen.lock().is_empty());

        property.emit(10.0);
        assert_eq!(*seen.lock(), vec![10.0]);
    }
}
