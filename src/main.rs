mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use inviteflow_core::config::AppConfig;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    apply_env_overrides(&mut config);

    match cli.command {
        Commands::Provision { account } => commands::run_provision(&config, account).await,
        Commands::Activate { fixture, limit } => {
            commands::run_activate(&config, fixture, limit).await
        }
        Commands::Single { fixture } => commands::run_single(&config, fixture).await,
        Commands::PurgeMailbox => commands::run_purge(&config).await,
    }
}

fn load_config(path: &str) -> Result<AppConfig> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path, error = %e, "config file not readable, using built-in defaults");
            include_str!("../config/default.toml").to_string()
        }
    };
    toml::from_str(&raw).with_context(|| format!("invalid configuration in {}", path))
}

/// Environment variables override the file for the values that differ per
/// CI run or must stay out of the repository.
fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(env) = std::env::var("TEST_ENV") {
        config.environment.name = env;
    }
    if let Ok(key) = std::env::var("MAILBOX_API_KEY") {
        config.mailbox.api_key = key;
    }
    if let Ok(server) = std::env::var("MAILBOX_SERVER_ID") {
        config.mailbox.server_id = server;
    }
    if let Ok(id) = std::env::var("API_CLIENT_ID") {
        config.api.client_id = id;
    }
    if let Ok(secret) = std::env::var("API_CLIENT_SECRET") {
        config.api.client_secret = secret;
    }
    if let Ok(headless) = std::env::var("HEADLESS") {
        config.browser.headless = !matches!(headless.as_str(), "0" | "false");
    }
    if let Ok(max) = std::env::var("MAX_ACCOUNTS") {
        if let Ok(max) = max.parse() {
            config.activation.max_accounts = max;
        }
    }
}
