//! Composable snapshot streams.

use crossbeam_channel::unbounded;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use super::broadcaster::Broadcaster;
use super::types::{Listener, SnapshotReceiver, Subscription};

type SubscribeFn<T> = dyn Fn(Listener<T>) -> Subscription + Send + Sync;

/// A stream of values that listeners can subscribe to.
///
/// An observable is a recipe: operators like [`map`](Self::map) and
/// [`distinct_until_changed`](Self::distinct_until_changed) build a new
/// recipe, and nothing runs until [`subscribe`](Self::subscribe) is called.
/// Each subscription gets its own operator state.
pub struct Observable<T> {
    source: Arc<SubscribeFn<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    /// Observe a broadcaster: latest value first, then every update.
    pub fn from_broadcaster(broadcaster: &Arc<Broadcaster<T>>) -> Self {
        let broadcaster = Arc::clone(broadcaster);
        Self {
            source: Arc::new(move |listener: Listener<T>| broadcaster.subscribe(listener)),
        }
    }

    /// Call `listener` with every value the stream delivers.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        (self.source)(Arc::new(listener))
    }

    /// Deliver values into a channel.
    pub fn subscribe_channel(&self) -> SnapshotReceiver<T> {
        let (sender, receiver) = unbounded();
        let subscription = self.subscribe(move |value: &T| {
            // Receiver gone means the consumer stopped listening.
            let _ = sender.send(value.clone());
        });
        SnapshotReceiver::new(subscription, receiver)
    }

    /// Transform every value.
    pub fn map<U, F>(&self, f: F) -> Observable<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let source = Arc::clone(&self.source);
        let f = Arc::new(f);
        Observable {
            source: Arc::new(move |listener: Listener<U>| {
                let f = Arc::clone(&f);
                source(Arc::new(move |value: &T| listener(&f(value))))
            }),
        }
    }

    /// Drop values equal to the value delivered just before them.
    pub fn distinct_until_changed(&self) -> Self
    where
        T: PartialEq,
    {
        self.distinct_until_changed_by(|a, b| a == b)
    }

    /// Drop values that `same` reports equal to the previously delivered one.
    pub fn distinct_until_changed_by<F>(&self, same: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        let source = Arc::clone(&self.source);
        let same = Arc::new(same);
        Self {
            source: Arc::new(move |listener: Listener<T>| {
                let same = Arc::clone(&same);
                let last: Mutex<Option<T>> = Mutex::new(None);
                source(Arc::new(move |value: &T| {
                    {
                        let mut last = last.lock();
                        if let Some(previous) = last.as_ref() {
                            if same(previous, value) {
                                return;
                            }
                        }
                        *last = Some(value.clone());
                    }
                    listener(value);
                }))
            }),
        }
    }
}
