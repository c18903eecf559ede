//! Commands the demo runs against an active auth controller.

use anyhow::Result;
use auth_core::{AuthController, AuthState, ReadinessCheck};
use clap::Subcommand;
use serde_json::{json, Value};
use tracing::debug;

use crate::session::{Credentials, FileSessionService, SessionUser};

#[derive(Subcommand, Debug, Clone)]
pub enum DemoCommand {
    /// Print the current auth state.
    Status,
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    SignOut,
}

impl DemoCommand {
    fn name(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::SignIn { .. } => "sign_in",
            Self::SignUp { .. } => "sign_up",
            Self::SignOut => "sign_out",
        }
    }
}

/// Runs `command` and returns the user it resolved, if any.
pub async fn execute(
    controller: &AuthController<FileSessionService>,
    command: DemoCommand,
) -> Result<Option<SessionUser>> {
    debug!(command = command.name(), "dispatching demo command");
    match command {
        DemoCommand::Status => Ok(controller.state().user),
        DemoCommand::SignIn { email, password } => controller
            .sign_in(Credentials { email, password })
            .await
            .map(Some),
        DemoCommand::SignUp { email, password } => controller
            .sign_up(Credentials { email, password })
            .await
            .map(Some),
        DemoCommand::SignOut => {
            controller.sign_out().await?;
            Ok(None)
        }
    }
}

/// JSON printed once a command finishes.
pub fn status_report(readiness: &ReadinessCheck, state: &AuthState<SessionUser>) -> Value {
    json!({
        "readiness": readiness,
        "state": state,
    })
}
