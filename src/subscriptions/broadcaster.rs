//! Broadcaster holding the latest value and fanning it out to listeners.

use parking_lot::{ReentrantMutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::types::{Listener, Subscription, SubscriptionId};

/// Latest value plus a set of listeners.
///
/// A new listener is called with the latest value as soon as it subscribes.
/// Every `next` stores the value and calls all listeners synchronously, in
/// subscription order. No lock on the listener set is held while a listener
/// runs, so listeners may subscribe or unsubscribe from inside a callback.
pub struct Broadcaster<T> {
    /// Most recent value.
    latest: RwLock<T>,
    /// Active listeners by ID.
    listeners: RwLock<BTreeMap<SubscriptionId, Listener<T>>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
    /// Serializes emissions across threads; reentrant for nested emissions.
    emit_lock: ReentrantMutex<()>,
}

impl<T: Clone + Send + Sync + 'static> Broadcaster<T> {
    /// Create a broadcaster seeded with `initial`.
    pub fn new(initial: T) -> Arc<Self> {
        Arc::new(Self {
            latest: RwLock::new(initial),
            listeners: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            emit_lock: ReentrantMutex::new(()),
        })
    }

    /// Current value.
    pub fn value(&self) -> T {
        self.latest.read().clone()
    }

    /// Store `value` and deliver it to every listener.
    pub fn next(&self, value: T) {
        let _emit = self.emit_lock.lock();

        *self.latest.write() = value.clone();

        let listeners: Vec<(SubscriptionId, Listener<T>)> = self
            .listeners
            .read()
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        for (id, listener) in listeners {
            tracing::trace!(subscription = %id, "delivering value");
            listener(&value);
        }
    }

    /// Register a listener. It immediately receives the latest value.
    pub fn subscribe(self: &Arc<Self>, listener: Listener<T>) -> Subscription {
        let _emit = self.emit_lock.lock();

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().insert(id, Arc::clone(&listener));
        tracing::debug!(subscription = %id, "subscribed");

        let current = self.value();
        listener(&current);

        let weak: Weak<Self> = Arc::downgrade(self);
        Subscription::with_id(id, move || {
            if let Some(broadcaster) = weak.upgrade() {
                broadcaster.unsubscribe(id);
            }
        })
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.listeners.write().remove(&id).is_some();
        if removed {
            tracing::debug!(subscription = %id, "unsubscribed");
        }
        removed
    }

    /// Get listener count.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.read().len()
    }
}
