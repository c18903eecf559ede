//! Authentication state controller.
//!
//! [`create_auth`] wraps a caller-supplied [`AuthService`] and hands back an
//! [`Auth`] whose [`Auth::provide`] starts a controller for a [`Scope`]. The
//! controller runs a one-time readiness check against the service and then
//! publishes every sign-in, sign-up and sign-out through an
//! [`emitter::Emitter`] of [`AuthState`] snapshots.

mod controller;
mod live_state;
mod provider;
mod scope;
mod service;

pub use controller::AuthController;
pub use emitter::{Emitter, Subscription};
pub use live_state::LiveAuthState;
pub use provider::{create_auth, Auth, AuthProvider};
pub use scope::Scope;
pub use service::AuthService;
pub use shared::{
    domain::{AuthSeed, AuthState, ReadinessCheck, ScopeId},
    error::{MissingContextError, RuntimeUnavailableError},
};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
