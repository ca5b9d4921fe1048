//! `registry-auth` binary.

use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use registry_auth_server::{ServerConfig, build_state, serve};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Token authentication service for container registries.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "REGISTRY_AUTH_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listen address.
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "REGISTRY_AUTH_LOG_JSON")]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = ServerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }

    let state = build_state(&config).await.context("initialising token service")?;
    let listener =
        TcpListener::bind(config.listen).await.with_context(|| format!("binding {}", config.listen))?;

    serve(listener, state, shutdown_signal()).await?;
    Ok(())
}
