use std::path::PathBuf;

use anyhow::{bail, Result};
use auth_core::{create_auth, AuthSeed, ReadinessCheck, Scope};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod session;

use commands::DemoCommand;
use session::FileSessionService;

#[derive(Parser, Debug)]
#[command(name = "auth_demo", about = "Drive a file-backed auth controller from the shell")]
struct Cli {
    #[arg(long, default_value = "auth_demo.toml")]
    config: PathBuf,
    /// Overrides the session file from config and environment.
    #[arg(long)]
    session_path: Option<PathBuf>,
    #[command(subcommand)]
    command: DemoCommand,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = config::load_settings(&cli.config)?;
    if let Some(session_path) = cli.session_path {
        settings.session_path = session_path;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let auth = create_auth(FileSessionService::new(&settings.session_path));
    let scope = Scope::root();
    let provider = auth.provide(&scope, AuthSeed::Unknown)?;
    let readiness = provider.controller().wait_ready().await;
    if let ReadinessCheck::Failed(reason) = &readiness {
        bail!(
            "session store '{}' is unavailable: {reason}",
            auth.service().session_path().display()
        );
    }

    let state = auth.use_auth_state(&scope)?;
    let controller = auth.use_auth(&scope)?;
    if let Some(user) = commands::execute(&controller, cli.command).await? {
        tracing::info!(user_id = user.id.0, email = %user.email, "active user");
    }

    let report = commands::status_report(&readiness, &state.get());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
