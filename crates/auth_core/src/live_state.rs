use emitter::{Emitter, Subscription};
use shared::domain::AuthState;
use tokio::sync::watch;

/// Latest auth state, kept current by a subscription on the controller's
/// state emitter. Dropping it releases the subscription.
pub struct LiveAuthState<U> {
    receiver: watch::Receiver<AuthState<U>>,
    _subscription: Subscription,
}

impl<U> LiveAuthState<U>
where
    U: Clone + Send + Sync + 'static,
{
    pub(crate) fn attach(state_change: &Emitter<AuthState<U>>) -> Self {
        let (sender, mut receiver) = watch::channel(AuthState::unready());
        let subscription = state_change.subscribe(move |state: Option<&AuthState<U>>| {
            sender.send_replace(state.cloned().unwrap_or_default());
        });
        // The replay above is the starting point, not a change.
        receiver.borrow_and_update();
        Self {
            receiver,
            _subscription: subscription,
        }
    }

    pub fn get(&self) -> AuthState<U> {
        self.receiver.borrow().clone()
    }

    /// Waits for the next published state. Returns `None` once the controller
    /// owning the emitter is gone.
    pub async fn changed(&mut self) -> Option<AuthState<U>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Returns the first state, current one included, matching `predicate`.
    pub async fn wait_for<F>(&mut self, mut predicate: F) -> Option<AuthState<U>>
    where
        F: FnMut(&AuthState<U>) -> bool,
    {
        let state = self.receiver.wait_for(|state| predicate(state)).await.ok()?;
        Some((*state).clone())
    }

    pub async fn ready(&mut self) -> Option<AuthState<U>> {
        self.wait_for(|state| state.ready).await
    }
}
