//! Binding a render cycle to a handler's snapshot stream.
//!
//! A [`StateBinding`] starts with the handler's initial state, so the first
//! render never waits on a subscription. Every snapshot the handler publishes
//! afterwards is stored and passed to the render callback. Unmounting (or
//! dropping) the binding unsubscribes and then destroys the handler.

use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::state::{StateSingleton, StateSubscriptionHandler};
use crate::subscriptions::Subscription;

pub struct StateBinding<H: StateSubscriptionHandler> {
    handler: Arc<H>,
    actions: H::Actions,
    current: Arc<RwLock<H::State>>,
    renders: Arc<AtomicUsize>,
    subscription: Option<Subscription>,
}

impl<H: StateSubscriptionHandler> StateBinding<H> {
    /// Subscribe `render` to `handler`.
    pub fn mount<F>(handler: Arc<H>, render: F) -> Self
    where
        F: Fn(&H::State) + Send + Sync + 'static,
    {
        let current = Arc::new(RwLock::new(handler.initial_state()));
        let renders = Arc::new(AtomicUsize::new(0));
        let actions = handler.actions();

        let sink = Arc::clone(&current);
        let counter = Arc::clone(&renders);
        let subscription = handler.observable().subscribe(move |state: &H::State| {
            *sink.write() = state.clone();
            counter.fetch_add(1, Ordering::SeqCst);
            render(state);
        });

        Self {
            handler,
            actions,
            current,
            renders,
            subscription: Some(subscription),
        }
    }

    /// Bind to the singleton's shared instance.
    pub fn from_singleton<F>(singleton: &StateSingleton<H>, render: F) -> Self
    where
        F: Fn(&H::State) + Send + Sync + 'static,
    {
        Self::mount(singleton.get_instance(), render)
    }

    /// Bind to a handler built just for this binding.
    pub fn from_factory<P, F>(factory: P, render: F) -> Self
    where
        P: FnOnce() -> H,
        F: Fn(&H::State) + Send + Sync + 'static,
    {
        Self::mount(Arc::new(factory()), render)
    }

    /// The snapshot last delivered to the render callback.
    pub fn state(&self) -> H::State {
        self.current.read().clone()
    }

    pub fn actions(&self) -> &H::Actions {
        &self.actions
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// How many times the render callback has run.
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    /// Unsubscribe, then destroy the handler.
    pub fn unmount(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            self.handler.destroy();
        }
    }
}

impl<H: StateSubscriptionHandler> Drop for StateBinding<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<H: StateSubscriptionHandler> fmt::Debug for StateBinding<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateBinding")
            .field("mounted", &self.is_mounted())
            .field("renders", &self.render_count())
            .finish()
    }
}
