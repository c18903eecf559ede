use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(ScopeId);

/// Snapshot of who is logged in, as published by an auth controller.
///
/// While `ready` is false, `user` and `logged` only carry an optimistic seed
/// (if any). Once `ready` is true, `logged` holds exactly when `user` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState<U> {
    pub user: Option<U>,
    pub logged: bool,
    pub ready: bool,
}

impl<U> Default for AuthState<U> {
    fn default() -> Self {
        Self::unready()
    }
}

impl<U> AuthState<U> {
    pub fn unready() -> Self {
        Self {
            user: None,
            logged: false,
            ready: false,
        }
    }

    /// Initial state for a controller. Any known seed makes the state ready
    /// immediately; the readiness check still runs and may replace it.
    pub fn seeded(seed: AuthSeed<U>) -> Self {
        match seed {
            AuthSeed::Unknown => Self::unready(),
            AuthSeed::SignedOut => Self::unauthenticated(),
            AuthSeed::User(user) => Self::authenticated(user),
        }
    }

    pub fn authenticated(user: U) -> Self {
        Self {
            user: Some(user),
            logged: true,
            ready: true,
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            user: None,
            logged: false,
            ready: true,
        }
    }
}

/// Optimistic starting point handed to a controller before its readiness
/// check has run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthSeed<U> {
    /// Nothing known yet: the state stays unready until the check completes.
    #[default]
    Unknown,
    SignedOut,
    User(U),
}

/// Outcome of the one-time readiness check a controller runs at startup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ReadinessCheck {
    #[default]
    Pending,
    Completed,
    Failed(String),
    Cancelled,
}

impl ReadinessCheck {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}
