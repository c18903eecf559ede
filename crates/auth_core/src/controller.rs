use std::sync::Arc;

use anyhow::Result;
use emitter::Emitter;
use shared::{
    domain::{AuthSeed, AuthState, ReadinessCheck},
    error::RuntimeUnavailableError,
};
use tokio::{runtime::Handle, sync::watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{live_state::LiveAuthState, service::AuthService};

/// Operational handle to one auth controller.
///
/// Clones share the same state emitter and service. Overlapping
/// sign-in/sign-up/sign-out calls are not serialized: whichever service call
/// resolves last decides the published state.
pub struct AuthController<S: AuthService> {
    inner: Arc<ControllerInner<S>>,
}

struct ControllerInner<S: AuthService> {
    service: Arc<S>,
    state_change: Emitter<AuthState<S::User>>,
    readiness: watch::Sender<ReadinessCheck>,
    cancel: CancellationToken,
}

impl<S: AuthService> Clone for AuthController<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: AuthService> AuthController<S> {
    /// Builds a controller and spawns its readiness check on the current
    /// tokio runtime. Fails when called outside one.
    pub fn start(
        service: Arc<S>,
        seed: AuthSeed<S::User>,
    ) -> Result<Self, RuntimeUnavailableError> {
        let runtime = Handle::try_current().map_err(|_| RuntimeUnavailableError)?;
        let controller = Self::new(service, seed);
        let workflow = controller.clone();
        runtime.spawn(async move { workflow.run_readiness_check().await });
        Ok(controller)
    }

    fn new(service: Arc<S>, seed: AuthSeed<S::User>) -> Self {
        let (readiness, _) = watch::channel(ReadinessCheck::Pending);
        Self {
            inner: Arc::new(ControllerInner {
                service,
                state_change: Emitter::with_initial_value(AuthState::seeded(seed)),
                readiness,
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn service(&self) -> &Arc<S> {
        &self.inner.service
    }

    pub fn state_change(&self) -> &Emitter<AuthState<S::User>> {
        &self.inner.state_change
    }

    pub fn state(&self) -> AuthState<S::User> {
        self.inner
            .state_change
            .last_emitted_value()
            .unwrap_or_default()
    }

    pub fn live_state(&self) -> LiveAuthState<S::User> {
        LiveAuthState::attach(&self.inner.state_change)
    }

    pub fn readiness(&self) -> ReadinessCheck {
        self.inner.readiness.borrow().clone()
    }

    /// Resolves once the readiness check has completed, failed or been
    /// cancelled.
    pub async fn wait_ready(&self) -> ReadinessCheck {
        let mut readiness = self.inner.readiness.subscribe();
        let check = match readiness.wait_for(ReadinessCheck::is_settled).await {
            Ok(check) => (*check).clone(),
            Err(_) => self.readiness(),
        };
        check
    }

    /// Stops the readiness check and suppresses every later state emission.
    pub fn shutdown(&self) {
        if !self.inner.cancel.is_cancelled() {
            debug!("auth controller shutting down");
        }
        self.inner.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    pub async fn is_authenticated(&self) -> Result<bool> {
        self.inner.service.is_authenticated().await
    }

    pub async fn current_user_info(&self) -> Result<S::User> {
        self.inner.service.current_user_info().await
    }

    pub async fn sign_in(&self, options: S::SignInOptions) -> Result<S::User> {
        let user = self.inner.service.sign_in(options).await?;
        self.publish(AuthState::authenticated(user.clone()));
        Ok(user)
    }

    pub async fn sign_up(&self, options: S::SignUpOptions) -> Result<S::User> {
        let user = self.inner.service.sign_up(options).await?;
        self.publish(AuthState::authenticated(user.clone()));
        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.inner.service.sign_out().await?;
        self.publish(AuthState::unauthenticated());
        Ok(())
    }

    fn publish(&self, state: AuthState<S::User>) {
        if self.inner.cancel.is_cancelled() {
            debug!(logged = state.logged, "auth controller shut down; state change dropped");
            return;
        }
        debug!(logged = state.logged, "publishing auth state");
        self.inner.state_change.emit(state);
    }

    async fn run_readiness_check(&self) {
        debug!("auth readiness check started");
        let outcome = tokio::select! {
            biased;
            _ = self.inner.cancel.cancelled() => None,
            resolved = self.resolve_initial_state() => Some(resolved),
        };

        match outcome {
            Some(Ok(state)) if !self.inner.cancel.is_cancelled() => {
                info!(logged = state.logged, "auth readiness check completed");
                self.inner.state_change.emit(state);
                self.set_readiness(ReadinessCheck::Completed);
            }
            Some(Err(err)) => {
                // Nothing is emitted: the state stays unready (or seeded).
                let reason = format!("{err:#}");
                error!(%reason, "auth readiness check failed");
                self.set_readiness(ReadinessCheck::Failed(reason));
            }
            Some(Ok(_)) | None => {
                debug!("auth readiness check cancelled");
                self.set_readiness(ReadinessCheck::Cancelled);
            }
        }
    }

    async fn resolve_initial_state(&self) -> Result<AuthState<S::User>> {
        let service = &self.inner.service;
        service.init().await?;
        if service.is_authenticated().await? {
            let user = service.current_user_info().await?;
            return Ok(AuthState::authenticated(user));
        }
        Ok(AuthState::unauthenticated())
    }

    fn set_readiness(&self, check: ReadinessCheck) {
        self.inner.readiness.send_replace(check);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
