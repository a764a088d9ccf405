//! HTTP API layer.
//!
//! This module contains thin handlers that delegate to services.
//! It provides the router construction and server startup functionality.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::bootstrap::BootstrappedServices;
use crate::services::{NotificationSender, SessionRegistry, SourceHealthMonitor};
use crate::state::Config;

pub mod http;
pub mod response;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),
}

/// Shared application state for the API layer.
///
/// This is a thin wrapper that holds references to services.
/// All business logic lives in the services themselves.
#[derive(Clone)]
pub struct AppState {
    /// Registry read by the session endpoints.
    pub registry: Arc<SessionRegistry>,
    /// Queue into the notification listener.
    pub notifications: NotificationSender,
    /// Media server health for the readiness probe.
    pub health: Arc<SourceHealthMonitor>,
    /// Application configuration.
    pub config: Arc<Config>,
}

impl AppState {
    /// Builds the API state from bootstrapped services.
    pub fn from_services(services: &BootstrappedServices) -> Self {
        Self {
            registry: Arc::clone(&services.registry),
            notifications: services.notification_sender.clone(),
            health: Arc::clone(&services.source_health),
            config: Arc::clone(&services.config),
        }
    }
}

/// Binds the HTTP listener on the configured port (0 = any free port).
pub async fn bind(config: &Config) -> Result<tokio::net::TcpListener, ServerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.preferred_port));
    Ok(tokio::net::TcpListener::bind(addr).await?)
}

/// Serves the API on `listener` until `shutdown` is cancelled.
pub async fn start_server(
    state: AppState,
    listener: tokio::net::TcpListener,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let addr = listener.local_addr()?;
    log::info!("Server listening on http://{}", addr);

    let app = http::create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    log::info!("[Server] HTTP server stopped");
    Ok(())
}
