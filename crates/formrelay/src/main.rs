//! # formrelay
//!
//! Relay server binary: loads settings, initializes logging, and starts the
//! HTTP/WebSocket server.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use formrelay_catalog::{BuiltinCatalog, SequenceCatalog};
use formrelay_core::constants::{HEALTH_PATH, NAME, VERSION, WS_PATH};
use formrelay_server::config::ServerConfig;
use formrelay_server::server::RelayServer;
use formrelay_settings::RelaySettings;

/// Form automation relay server.
#[derive(Parser, Debug)]
#[command(name = "formrelay", version, about = "WebSocket relay serving browser-automation sequences")]
struct Cli {
    /// Host to bind (overrides `HOST`).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides `PORT`).
    #[arg(long)]
    port: Option<u16>,

    /// Log level (overrides `LOG_LEVEL`; `RUST_LOG` still wins).
    #[arg(long)]
    log_level: Option<String>,

    /// Maximum concurrent WebSocket connections (overrides `MAX_CONNECTIONS`).
    #[arg(long)]
    max_connections: Option<usize>,

    /// Optional JSON settings file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn apply(&self, settings: &mut RelaySettings) {
        if let Some(ref host) = self.host {
            settings.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(ref level) = self.log_level {
            settings.log_level.clone_from(level);
        }
        if let Some(max) = self.max_connections {
            settings.max_connections = max;
        }
    }
}

/// Host to show in URLs: a wildcard bind is reachable via localhost.
fn display_host(host: &str) -> &str {
    match host {
        "0.0.0.0" | "::" => "localhost",
        other => other,
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.context("Failed to listen for ctrl-c")?,
        _ = term.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings =
        formrelay_settings::load_settings(cli.config.as_deref()).context("Failed to load settings")?;
    cli.apply(&mut settings);
    settings.validate().context("Invalid settings")?;

    if cli.json_logs {
        formrelay_core::logging::init_json_subscriber(&settings.log_level);
    } else {
        formrelay_core::logging::init_subscriber(&settings.log_level);
    }

    let shown = display_host(&settings.host);
    tracing::info!(version = VERSION, "starting {NAME}");
    tracing::info!(
        host = %settings.host,
        port = settings.port,
        log_level = %settings.log_level,
        reload = settings.reload,
        max_connections = settings.max_connections,
        "effective settings"
    );
    if settings.reload {
        tracing::info!("reload requested; compiled binary has no auto-reload, restart to pick up changes");
    }

    let metrics_handle = formrelay_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let catalog = BuiltinCatalog::new();
    tracing::info!(sequence_types = ?catalog.known_types(), "sequence catalog loaded");

    let server = RelayServer::new(ServerConfig::from(&settings), Arc::new(catalog))
        .with_metrics(metrics_handle);
    let (addr, handle) = server
        .listen()
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr()))?;

    tracing::info!("WebSocket endpoint: ws://{shown}:{}{WS_PATH}", addr.port());
    tracing::info!("Health check: http://{shown}:{}{HEALTH_PATH}", addr.port());

    shutdown_signal().await?;

    tracing::info!("Shutting down...");
    let outcome = server
        .shutdown()
        .drain(handle, Some(Duration::from_secs(10)))
        .await;
    tracing::info!(?outcome, "Shutdown complete");
    Ok(())
}
