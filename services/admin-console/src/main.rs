//! Aratiri admin console
//!
//! Command-line front end for the Aratiri middleware admin API:
//! 1. Loads configuration and opens the persisted credential store
//! 2. Builds the API client; every admin call runs through the token refresh
//!    protocol
//! 3. Starts the shell, which listens for the session-ended signal
//! 4. Runs one subcommand and prints its result as JSON

mod commands;
mod config;
mod metrics;
mod shell;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use admin_auth::FileCredentialStore;
use admin_client::ApiClient;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::Command;
use crate::config::Config;
use crate::shell::Shell;

#[derive(Parser)]
#[command(name = "aratiri-admin")]
#[command(about = "Aratiri admin console - manage the Lightning node behind the middleware", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the TOML config file (default: aratiri-admin.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print client metrics in Prometheus text format to stderr on exit
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr; quiet by default so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    // Install before any client call so every counter is captured
    let prometheus = if cli.metrics {
        Some(metrics::install_recorder()?)
    } else {
        None
    };

    let config_path = Config::resolve_path(cli.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        base_url = %config.api.base_url,
        timeout_secs = config.api.timeout_secs,
        credentials_path = %config.storage.credentials_path.display(),
        "configuration loaded"
    );

    let store = Arc::new(FileCredentialStore::open(
        config.storage.credentials_path.clone(),
    ));
    let client = ApiClient::new(
        config.api.base_url.clone(),
        store,
        Duration::from_secs(config.api.timeout_secs),
    )
    .context("failed to build API client")?;

    let shell = Shell::new(client);
    let result = commands::run(&shell, cli.command).await;

    if let Some(handle) = &prometheus {
        metrics::report(handle);
    }

    result
}
