//! Lazily constructed, permanently cached handler instances.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Builds one instance on first use and hands out that same instance forever.
pub struct StateSingleton<H> {
    factory: Box<dyn Fn() -> H + Send + Sync>,
    instance: Mutex<Option<Arc<H>>>,
}

impl<H> StateSingleton<H> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            instance: Mutex::new(None),
        }
    }

    /// The cached instance, constructing it on the first call.
    pub fn get_instance(&self) -> Arc<H> {
        let mut instance = self.instance.lock();
        match instance.as_ref() {
            Some(existing) => Arc::clone(existing),
            None => {
                tracing::debug!("constructing singleton instance");
                let created = Arc::new((self.factory)());
                *instance = Some(Arc::clone(&created));
                created
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.instance.lock().is_some()
    }
}

impl<H> fmt::Debug for StateSingleton<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSingleton")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// Wrap `factory` in a [`StateSingleton`].
pub fn make_state_singleton<H, F>(factory: F) -> StateSingleton<H>
where
    F: Fn() -> H + Send + Sync + 'static,
{
    StateSingleton::new(factory)
}
