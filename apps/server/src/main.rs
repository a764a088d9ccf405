//! Plexwatch Server - standalone Plex playback session tracker.
//!
//! Receives the media server's push notifications on an HTTP endpoint,
//! reconciles them against the server's own session and metadata APIs, and
//! serves the resulting session registry as JSON.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use plexwatch_core::{
    bind, bootstrap_services, create_http_client, start_server, AppState, LoggingEventEmitter,
    PlexClientImpl, ServerIdentity,
};
use tokio::signal;

use crate::config::ServerConfig;

/// Plexwatch Server - Headless Plex playback session tracker.
#[derive(Parser, Debug)]
#[command(name = "plexwatch-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "PLEXWATCH_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "PLEXWATCH_BIND_PORT")]
    port: Option<u16>,

    /// Plex server base URL (overrides config file).
    #[arg(short = 'u', long, env = "PLEXWATCH_PLEX_URL")]
    plex_url: Option<String>,

    /// Plex authentication token (overrides config file).
    #[arg(short = 't', long, env = "PLEXWATCH_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Plexwatch Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(url) = args.plex_url {
        config.plex_url = url;
    }
    if let Some(token) = args.token {
        config.plex_token = Some(token);
    }

    let token = config.plex_token.clone().context(
        "No Plex token configured. Set plex_token in the config file, \
         pass --token, or set PLEXWATCH_TOKEN.",
    )?;

    log::info!(
        "Configuration: bind_port={}, plex_url={}",
        config.bind_port,
        config.plex_url
    );

    let http_client = create_http_client().context("Failed to create HTTP client")?;
    let plex = Arc::new(PlexClientImpl::new(
        http_client,
        config.plex_url.clone(),
        token,
        config.client_identifier.clone(),
    ));

    let identity = resolve_identity(&config, &plex).await;

    // Bootstrap services
    let core_config = config.to_core_config();
    let services = bootstrap_services(
        core_config,
        plex,
        identity,
        Arc::new(LoggingEventEmitter),
    )
    .context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    services.start_background_tasks();

    log::info!("Background tasks started");

    let listener = bind(&services.config)
        .await
        .with_context(|| format!("Failed to bind port {}", config.bind_port))?;

    // Spawn HTTP server; it stops accepting requests once the token is cancelled
    let app_state = AppState::from_services(&services);
    let cancel_token = services.cancel_token.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(app_state, listener, cancel_token).await {
            log::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    // Graceful shutdown
    services.shutdown().await;

    if let Err(e) = server_handle.await {
        log::warn!("HTTP server task ended abnormally: {}", e);
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Uses the configured server identity, or asks Plex for the missing parts.
///
/// The identity is informational only, so a failed lookup is logged and
/// startup continues with whatever is configured.
async fn resolve_identity(config: &ServerConfig, plex: &PlexClientImpl) -> ServerIdentity {
    if let (Some(name), Some(machine_id)) = (&config.server_name, &config.machine_id) {
        return ServerIdentity {
            name: name.clone(),
            machine_id: machine_id.clone(),
        };
    }

    match plex.server_identity().await {
        Ok(fetched) => {
            log::info!(
                "Connected to Plex server \"{}\" ({})",
                fetched.name,
                fetched.machine_id
            );
            ServerIdentity {
                name: config.server_name.clone().unwrap_or(fetched.name),
                machine_id: config.machine_id.clone().unwrap_or(fetched.machine_id),
            }
        }
        Err(e) => {
            log::warn!(
                "Could not fetch identity from {}: {} (continuing without it)",
                plex.base_url(),
                e
            );
            ServerIdentity {
                name: config.server_name.clone().unwrap_or_default(),
                machine_id: config.machine_id.clone().unwrap_or_default(),
            }
        }
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
