use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::AuthService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestUser {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Init,
    IsAuthenticated,
    CurrentUserInfo,
    SignIn,
    SignUp,
    SignOut,
}

#[derive(Debug, thiserror::Error)]
#[error("{op:?} failed: {message}")]
pub struct TestServiceError {
    pub op: Op,
    pub message: String,
}

/// Scripted in-memory backend. Every operation is recorded, can be made to
/// fail, and can be held at a gate until the test releases it.
pub struct TestAuthService {
    session: Mutex<Option<TestUser>>,
    issued_user: Mutex<TestUser>,
    failures: Mutex<HashMap<Op, String>>,
    gates: Mutex<HashMap<Op, Arc<Notify>>>,
    calls: Mutex<Vec<Op>>,
    sign_in_requests: Mutex<Vec<Credentials>>,
}

impl TestAuthService {
    pub fn signed_out() -> Arc<Self> {
        Arc::new(Self::with_session(None))
    }

    pub fn signed_in_as(user: TestUser) -> Arc<Self> {
        Arc::new(Self::with_session(Some(user)))
    }

    fn with_session(session: Option<TestUser>) -> Self {
        Self {
            session: Mutex::new(session),
            issued_user: Mutex::new(TestUser { id: 1 }),
            failures: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            sign_in_requests: Mutex::new(Vec::new()),
        }
    }

    /// User handed out by the next sign-in or sign-up.
    pub fn issue_user(&self, user: TestUser) {
        *self.issued_user.lock() = user;
    }

    pub fn fail(&self, op: Op, message: &str) {
        self.failures.lock().insert(op, message.to_string());
    }

    pub fn recover(&self, op: Op) {
        self.failures.lock().remove(&op);
    }

    /// Holds every later call of `op` until the returned gate is notified.
    pub fn gate(&self, op: Op) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(op, Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<Op> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, op: Op) -> usize {
        self.calls.lock().iter().filter(|call| **call == op).count()
    }

    pub fn sign_in_requests(&self) -> Vec<Credentials> {
        self.sign_in_requests.lock().clone()
    }

    async fn enter(&self, op: Op) -> Result<()> {
        self.calls.lock().push(op);
        let gate = self.gates.lock().get(&op).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.failures.lock().get(&op) {
            Some(message) => Err(TestServiceError {
                op,
                message: message.clone(),
            }
            .into()),
            None => Ok(()),
        }
    }

    fn start_session(&self) -> TestUser {
        let user = self.issued_user.lock().clone();
        *self.session.lock() = Some(user.clone());
        user
    }
}

#[async_trait]
impl AuthService for TestAuthService {
    type User = TestUser;
    type SignInOptions = Credentials;
    type SignUpOptions = Credentials;

    async fn init(&self) -> Result<()> {
        self.enter(Op::Init).await
    }

    async fn is_authenticated(&self) -> Result<bool> {
        self.enter(Op::IsAuthenticated).await?;
        Ok(self.session.lock().is_some())
    }

    async fn current_user_info(&self) -> Result<TestUser> {
        self.enter(Op::CurrentUserInfo).await?;
        self.session
            .lock()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no active session"))
    }

    async fn sign_in(&self, options: Credentials) -> Result<TestUser> {
        self.sign_in_requests.lock().push(options);
        self.enter(Op::SignIn).await?;
        Ok(self.start_session())
    }

    async fn sign_up(&self, options: Credentials) -> Result<TestUser> {
        self.enter(Op::SignUp).await?;
        if options.password.is_empty() {
            anyhow::bail!("password required for {}", options.email);
        }
        Ok(self.start_session())
    }

    async fn sign_out(&self) -> Result<()> {
        self.enter(Op::SignOut).await?;
        *self.session.lock() = None;
        Ok(())
    }
}
