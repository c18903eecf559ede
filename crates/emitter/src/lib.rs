//! Value-caching publish/subscribe channel.
//!
//! An [`Emitter`] remembers the last value it emitted and replays it to each
//! new subscriber before adding that subscriber to its fan-out list. Delivery
//! is synchronous and follows subscription order. A panicking listener is
//! caught at the call site and logged; it never reaches the caller of
//! [`Emitter::emit`] or [`Emitter::subscribe`] and never stops delivery to the
//! listeners after it.
//!
//! Every `emit`, including one issued from inside a listener, delivers to a
//! snapshot of the listener list taken when that `emit` starts.

use std::{
    any::Any,
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, Weak},
};

use parking_lot::{Mutex, ReentrantMutex};
use thiserror::Error;
use tracing::error;

/// Callback observing emitted values. `None` means nothing was ever emitted.
pub type Listener<V> = Arc<dyn Fn(Option<&V>) + Send + Sync>;

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("listener panicked: {message}")]
    Panicked { message: String },
}

impl ListenerError {
    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked { message }
    }
}

struct Registration<V> {
    id: u64,
    listener: Listener<V>,
}

struct EmitterState<V> {
    last_emitted_value: Option<V>,
    listeners: Vec<Registration<V>>,
    next_id: u64,
}

struct Shared<V> {
    // Serializes emit/subscribe across threads; re-entrant so a listener may
    // emit on the thread that is already delivering.
    delivery: ReentrantMutex<()>,
    state: Mutex<EmitterState<V>>,
}

pub struct Emitter<V> {
    shared: Arc<Shared<V>>,
}

impl<V> Clone for Emitter<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V: Clone + Send + 'static> Default for Emitter<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for Emitter<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Emitter")
            .field("last_emitted_value", &state.last_emitted_value)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

impl<V: Clone + Send + 'static> Emitter<V> {
    pub fn new() -> Self {
        Self::from_initial(None)
    }

    pub fn with_initial_value(value: V) -> Self {
        Self::from_initial(Some(value))
    }

    fn from_initial(last_emitted_value: Option<V>) -> Self {
        Self {
            shared: Arc::new(Shared {
                delivery: ReentrantMutex::new(()),
                state: Mutex::new(EmitterState {
                    last_emitted_value,
                    listeners: Vec::new(),
                    next_id: 0,
                }),
            }),
        }
    }

    pub fn last_emitted_value(&self) -> Option<V> {
        self.shared.state.lock().last_emitted_value.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.shared.state.lock().listeners.len()
    }

    /// Stores `value` and hands it to every current listener in subscription
    /// order.
    pub fn emit(&self, value: V) {
        let _turn = self.shared.delivery.lock();
        let snapshot: Vec<Listener<V>> = {
            let mut state = self.shared.state.lock();
            state.last_emitted_value = Some(value.clone());
            state
                .listeners
                .iter()
                .map(|registration| Arc::clone(&registration.listener))
                .collect()
        };

        for listener in &snapshot {
            deliver(listener, Some(&value));
        }
    }

    /// Replays the current value to `listener`, then registers it.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&V>) + Send + Sync + 'static,
    {
        self.subscribe_shared(Arc::new(listener))
    }

    /// Like [`Emitter::subscribe`] for a listener that may be registered more
    /// than once. Each call yields its own independently disposable
    /// registration.
    pub fn subscribe_shared(&self, listener: Listener<V>) -> Subscription {
        let _turn = self.shared.delivery.lock();
        let current = self.shared.state.lock().last_emitted_value.clone();
        deliver(&listener, current.as_ref());

        let id = {
            let mut state = self.shared.state.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.listeners.push(Registration { id, listener });
            id
        };

        let shared = Arc::downgrade(&self.shared);
        Subscription {
            dispose: Some(Box::new(move || remove_registration(&shared, id))),
        }
    }
}

fn deliver<V>(listener: &Listener<V>, value: Option<&V>) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener(value))) {
        let err = ListenerError::from_panic(payload);
        error!(error = %err, "emitter listener failed");
    }
}

fn remove_registration<V>(shared: &Weak<Shared<V>>, id: u64) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    let removed = {
        let mut state = shared.state.lock();
        let index = state
            .listeners
            .iter()
            .position(|registration| registration.id == id);
        index.map(|index| state.listeners.remove(index))
    };
    // Released outside the state lock: the listener's captures may touch
    // this emitter when dropped.
    drop(removed);
}

/// Handle to one listener registration.
///
/// Dropping the handle disposes the registration. Use
/// [`Subscription::detach`] to keep the listener for the emitter's lifetime.
#[must_use = "dropping a Subscription disposes it immediately"]
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn dispose(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }

    pub fn is_active(&self) -> bool {
        self.dispose.is_some()
    }

    pub fn detach(mut self) {
        self.dispose = None;
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
