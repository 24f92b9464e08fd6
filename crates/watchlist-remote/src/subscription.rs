use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    callbacks: Vec<(u64, Callback<T>)>,
}

/// Explicit observer list. Callbacks run synchronously, in subscription order,
/// on the thread that calls [`Observers::notify`].
pub struct Observers<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for Observers<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Observers<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                callbacks: Vec::new(),
            })),
        }
    }

    fn lock(registry: &Mutex<Registry<T>>) -> MutexGuard<'_, Registry<T>> {
        // A panicking callback never runs under the lock, so the data is still consistent
        registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Calls every current subscriber with `value`.
    pub fn notify(&self, value: &T) {
        // Snapshot first so callbacks may subscribe or unsubscribe without deadlocking
        let callbacks: Vec<Callback<T>> = Self::lock(&self.registry)
            .callbacks
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(value);
        }
    }
}

impl<T: 'static> Observers<T> {
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = Self::lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.callbacks.push((id, Arc::new(callback)));
            id
        };

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription {
            detach: Some(Box::new(move || match weak.upgrade() {
                Some(registry) => {
                    let mut registry = Self::lock(&registry);
                    let before = registry.callbacks.len();
                    registry.callbacks.retain(|(existing, _)| *existing != id);
                    registry.callbacks.len() != before
                }
                None => false,
            })),
        }
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the callback registered;
/// call [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() -> bool + Send + Sync>>,
}

impl Subscription {
    /// Removes the callback. Returns false if it was already gone.
    pub fn unsubscribe(mut self) -> bool {
        match self.detach.take() {
            Some(detach) => detach(),
            None => false,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}
