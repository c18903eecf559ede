use thiserror::Error;

use crate::domain::ScopeId;

/// Raised when an accessor runs in a scope with no active auth controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no auth controller is active for scope {}; provide one before using auth accessors", .scope.0)]
pub struct MissingContextError {
    pub scope: ScopeId,
}

impl MissingContextError {
    pub fn new(scope: ScopeId) -> Self {
        Self { scope }
    }
}

/// Raised when a controller is started outside a tokio runtime, where its
/// readiness check has nowhere to run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("auth controller must be started from within a tokio runtime")]
pub struct RuntimeUnavailableError;
