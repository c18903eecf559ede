use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

/// Backend contract an auth controller drives.
///
/// Errors are opaque to the controller and reach callers unchanged.
#[async_trait]
pub trait AuthService: Send + Sync + 'static {
    type User: Clone + Send + Sync + 'static;
    type SignInOptions: Send + 'static;
    type SignUpOptions: Send + 'static;

    async fn init(&self) -> Result<()>;
    async fn is_authenticated(&self) -> Result<bool>;
    /// Only meaningful while [`AuthService::is_authenticated`] holds.
    async fn current_user_info(&self) -> Result<Self::User>;
    async fn sign_in(&self, options: Self::SignInOptions) -> Result<Self::User>;
    async fn sign_up(&self, options: Self::SignUpOptions) -> Result<Self::User>;
    async fn sign_out(&self) -> Result<()>;
}

#[async_trait]
impl<T> AuthService for Arc<T>
where
    T: AuthService,
{
    type User = T::User;
    type SignInOptions = T::SignInOptions;
    type SignUpOptions = T::SignUpOptions;

    async fn init(&self) -> Result<()> {
        (**self).init().await
    }

    async fn is_authenticated(&self) -> Result<bool> {
        (**self).is_authenticated().await
    }

    async fn current_user_info(&self) -> Result<Self::User> {
        (**self).current_user_info().await
    }

    async fn sign_in(&self, options: Self::SignInOptions) -> Result<Self::User> {
        (**self).sign_in(options).await
    }

    async fn sign_up(&self, options: Self::SignUpOptions) -> Result<Self::User> {
        (**self).sign_up(options).await
    }

    async fn sign_out(&self) -> Result<()> {
        (**self).sign_out().await
    }
}
