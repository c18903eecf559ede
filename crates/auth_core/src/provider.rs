use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use shared::{
    domain::{AuthSeed, ScopeId},
    error::{MissingContextError, RuntimeUnavailableError},
};
use tracing::info;

use crate::{controller::AuthController, live_state::LiveAuthState, scope::Scope, AuthService};

struct ProvidedController<S: AuthService> {
    instance: u64,
    controller: AuthController<S>,
}

type Registry<S> = Mutex<HashMap<ScopeId, Vec<ProvidedController<S>>>>;

struct AuthShared<S: AuthService> {
    service: Arc<S>,
    registry: Registry<S>,
    next_instance: AtomicU64,
}

/// Bindings produced by [`create_auth`]: a controller constructor
/// ([`Auth::provide`]) and the two accessors [`Auth::use_auth`] and
/// [`Auth::use_auth_state`].
pub struct Auth<S: AuthService> {
    shared: Arc<AuthShared<S>>,
}

impl<S: AuthService> Clone for Auth<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

pub fn create_auth<S: AuthService>(service: S) -> Auth<S> {
    Auth {
        shared: Arc::new(AuthShared {
            service: Arc::new(service),
            registry: Mutex::new(HashMap::new()),
            next_instance: AtomicU64::new(1),
        }),
    }
}

impl<S: AuthService> Auth<S> {
    pub fn service(&self) -> &Arc<S> {
        &self.shared.service
    }

    /// Starts a controller for `scope` and makes it visible to lookups from
    /// that scope and its descendants until the returned provider is dropped.
    pub fn provide(
        &self,
        scope: &Scope,
        seed: AuthSeed<S::User>,
    ) -> Result<AuthProvider<S>, RuntimeUnavailableError> {
        let seeded = !matches!(seed, AuthSeed::Unknown);
        let controller = AuthController::start(Arc::clone(&self.shared.service), seed)?;
        let instance = self.shared.next_instance.fetch_add(1, Ordering::Relaxed);

        self.shared
            .registry
            .lock()
            .entry(scope.id())
            .or_default()
            .push(ProvidedController {
                instance,
                controller: controller.clone(),
            });
        info!(scope = scope.id().0, instance, seeded, "auth provider mounted");

        Ok(AuthProvider {
            controller,
            scope: scope.id(),
            instance,
            auth: Arc::clone(&self.shared),
        })
    }

    /// Operations handle of the nearest active controller.
    pub fn use_auth(&self, scope: &Scope) -> Result<AuthController<S>, MissingContextError> {
        let nearest = {
            let registry = self.shared.registry.lock();
            scope.lineage().find_map(|candidate| {
                registry
                    .get(&candidate.id())
                    .and_then(|provided| provided.last())
                    .map(|provided| provided.controller.clone())
            })
        };
        nearest.ok_or_else(|| MissingContextError::new(scope.id()))
    }

    /// Live state of the nearest active controller.
    pub fn use_auth_state(
        &self,
        scope: &Scope,
    ) -> Result<LiveAuthState<S::User>, MissingContextError> {
        Ok(self.use_auth(scope)?.live_state())
    }
}

/// An active controller registered under a scope.
///
/// Dropping it removes the registration and shuts the controller down, so a
/// readiness check still in flight never publishes.
pub struct AuthProvider<S: AuthService> {
    controller: AuthController<S>,
    scope: ScopeId,
    instance: u64,
    auth: Arc<AuthShared<S>>,
}

impl<S: AuthService> AuthProvider<S> {
    pub fn controller(&self) -> &AuthController<S> {
        &self.controller
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }
}

impl<S: AuthService> Drop for AuthProvider<S> {
    fn drop(&mut self) {
        self.controller.shutdown();
        let removed = {
            let mut registry = self.auth.registry.lock();
            let removed = registry.get_mut(&self.scope).and_then(|provided| {
                let index = provided
                    .iter()
                    .position(|entry| entry.instance == self.instance)?;
                Some(provided.remove(index))
            });
            if registry
                .get(&self.scope)
                .is_some_and(|provided| provided.is_empty())
            {
                registry.remove(&self.scope);
            }
            removed
        };
        drop(removed);
        info!(scope = self.scope.0, instance = self.instance, "auth provider unmounted");
    }
}

#[cfg(test)]
#[path = "tests/provider_tests.rs"]
mod tests;
