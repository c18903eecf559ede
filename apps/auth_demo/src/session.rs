//! File-backed auth backend: one JSON file holds the signed-in user, a
//! sibling file holds the registered accounts.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use auth_core::AuthService;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared::domain::UserId;
use tokio::fs;
use tracing::{debug, info};

const ACCOUNTS_FILE_NAME: &str = "accounts.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub email: String,
    pub signed_in_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AccountBook {
    accounts: Vec<Account>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Account {
    id: UserId,
    email: String,
    password_sha256: String,
}

pub struct FileSessionService {
    session_path: PathBuf,
    accounts_path: PathBuf,
}

impl FileSessionService {
    pub fn new(session_path: impl Into<PathBuf>) -> Self {
        let session_path = session_path.into();
        let accounts_path = session_path
            .parent()
            .map(|dir| dir.join(ACCOUNTS_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(ACCOUNTS_FILE_NAME));
        Self {
            session_path,
            accounts_path,
        }
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    async fn load_accounts(&self) -> Result<AccountBook> {
        match fs::read(&self.accounts_path).await {
            Ok(raw) => serde_json::from_slice(&raw).with_context(|| {
                format!("corrupt accounts file '{}'", self.accounts_path.display())
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(AccountBook::default()),
            Err(err) => Err(err).with_context(|| {
                format!("failed to read accounts file '{}'", self.accounts_path.display())
            }),
        }
    }

    async fn save_accounts(&self, book: &AccountBook) -> Result<()> {
        fs::write(&self.accounts_path, serde_json::to_vec_pretty(book)?)
            .await
            .with_context(|| {
                format!("failed to write accounts file '{}'", self.accounts_path.display())
            })
    }

    async fn start_session(&self, id: UserId, email: &str) -> Result<SessionUser> {
        let user = SessionUser {
            id,
            email: email.to_string(),
            signed_in_at: Utc::now(),
        };
        fs::write(&self.session_path, serde_json::to_vec_pretty(&user)?)
            .await
            .with_context(|| {
                format!("failed to write session file '{}'", self.session_path.display())
            })?;
        info!(user_id = id.0, "session started");
        Ok(user)
    }
}

fn validate(credentials: &Credentials) -> Result<String> {
    let email = credentials.email.trim().to_ascii_lowercase();
    let Some((local, domain)) = email.split_once('@') else {
        bail!("invalid email address '{}'", credentials.email);
    };
    if local.is_empty() || domain.is_empty() {
        bail!("invalid email address '{}'", credentials.email);
    }
    if credentials.password.is_empty() {
        bail!("password must not be empty");
    }
    Ok(email)
}

fn password_digest(password: &str) -> String {
    STANDARD.encode(Sha256::digest(password.as_bytes()))
}

#[async_trait]
impl AuthService for FileSessionService {
    type User = SessionUser;
    type SignInOptions = Credentials;
    type SignUpOptions = Credentials;

    async fn init(&self) -> Result<()> {
        let Some(parent) = self
            .session_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
        else {
            return Ok(());
        };
        fs::create_dir_all(parent).await.with_context(|| {
            format!("failed to create session directory '{}'", parent.display())
        })?;
        debug!(path = %self.session_path.display(), "session store ready");
        Ok(())
    }

    async fn is_authenticated(&self) -> Result<bool> {
        fs::try_exists(&self.session_path).await.with_context(|| {
            format!("failed to check session file '{}'", self.session_path.display())
        })
    }

    async fn current_user_info(&self) -> Result<SessionUser> {
        let raw = fs::read(&self.session_path).await.with_context(|| {
            format!("failed to read session file '{}'", self.session_path.display())
        })?;
        serde_json::from_slice(&raw).with_context(|| {
            format!("corrupt session file '{}'", self.session_path.display())
        })
    }

    async fn sign_in(&self, options: Credentials) -> Result<SessionUser> {
        let email = validate(&options)?;
        let book = self.load_accounts().await?;
        let account = book
            .accounts
            .iter()
            .find(|account| account.email == email)
            .ok_or_else(|| anyhow!("no account registered for '{email}'"))?;
        if account.password_sha256 != password_digest(&options.password) {
            bail!("invalid credentials for '{email}'");
        }
        self.start_session(account.id, &account.email).await
    }

    async fn sign_up(&self, options: Credentials) -> Result<SessionUser> {
        let email = validate(&options)?;
        let mut book = self.load_accounts().await?;
        if book.accounts.iter().any(|account| account.email == email) {
            bail!("an account for '{email}' already exists");
        }
        let id = UserId(
            book.accounts
                .iter()
                .map(|account| account.id.0)
                .max()
                .unwrap_or(0)
                + 1,
        );
        book.accounts.push(Account {
            id,
            email: email.clone(),
            password_sha256: password_digest(&options.password),
        });
        self.save_accounts(&book).await?;
        self.start_session(id, &email).await
    }

    async fn sign_out(&self) -> Result<()> {
        match fs::remove_file(&self.session_path).await {
            Ok(()) => {
                info!("session cleared");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| {
                format!("failed to remove session file '{}'", self.session_path.display())
            }),
        }
    }
}
