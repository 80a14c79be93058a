//! Subscription types for snapshot streams.

use crossbeam_channel::Receiver;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked with every value a stream delivers.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Unique identifier for a listener registered on a broadcaster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Options for [`StateHandler::observable`](crate::StateHandler::observable).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObservableOptions {
    /// Suppress a snapshot equal to the one delivered just before it.
    /// Default: true
    pub use_distinct_until_changed: bool,
}

impl Default for ObservableOptions {
    fn default() -> Self {
        Self {
            use_distinct_until_changed: true,
        }
    }
}

impl ObservableOptions {
    /// Deliver every snapshot, duplicates included.
    pub fn all() -> Self {
        Self {
            use_distinct_until_changed: false,
        }
    }
}

/// Ownership handle for a live subscription.
///
/// Releasing consumes the handle, so a subscription is released exactly once.
/// Dropping an unreleased handle releases it as well.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: Option<SubscriptionId>,
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Create a subscription that runs `teardown` on release.
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id: None,
            teardown: Some(Box::new(teardown)),
        }
    }

    pub(crate) fn with_id(id: SubscriptionId, teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id: Some(id),
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A subscription with nothing to release.
    pub fn empty() -> Self {
        Self {
            id: None,
            teardown: None,
        }
    }

    /// Listener id on the underlying broadcaster, if any.
    pub fn id(&self) -> Option<SubscriptionId> {
        self.id
    }

    /// Stop delivery to this subscription's listener.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.teardown.is_some())
            .finish()
    }
}

/// A subscription that delivers into a channel instead of a callback.
///
/// Suited to render loops that poll for the latest snapshot.
pub struct SnapshotReceiver<T> {
    subscription: Subscription,
    /// Channel to receive snapshots.
    pub receiver: Receiver<T>,
}

impl<T> SnapshotReceiver<T> {
    pub(crate) fn new(subscription: Subscription, receiver: Receiver<T>) -> Self {
        Self {
            subscription,
            receiver,
        }
    }

    /// Receive the next snapshot (blocking).
    pub fn recv(&self) -> Result<T, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a snapshot (non-blocking).
    pub fn try_recv(&self) -> Result<T, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Take everything currently buffered, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Take only the newest buffered snapshot.
    pub fn latest(&self) -> Option<T> {
        self.receiver.try_iter().last()
    }

    /// Stop delivery. Already buffered snapshots are discarded.
    pub fn unsubscribe(self) {
        self.subscription.unsubscribe();
    }
}
