//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where all
//! services are instantiated and wired together. The media server source is
//! passed in, so tests and embedders can swap it for their own.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::error::{PlexwatchError, PlexwatchResult};
use crate::events::EventEmitter;
use crate::plex::{ServerIdentity, SessionSource};
use crate::protocol_constants::PLEX_HTTP_TIMEOUT_SECS;
use crate::runtime::TokioSpawner;
use crate::services::{
    EvictionTask, NotificationListener, NotificationReconciler, NotificationSender,
    SessionRegistry, SourceHealthMonitor,
};
use crate::state::Config;

/// Upper bound for draining the in-flight batch on shutdown.
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

/// Container for all bootstrapped services.
///
/// This struct holds all the wired services created during bootstrap.
/// It's consumed by `AppState` to build the API state.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Validated configuration.
    pub config: Arc<Config>,
    /// Session records read by the API.
    pub registry: Arc<SessionRegistry>,
    /// Reconciles notifications into the registry.
    pub reconciler: Arc<NotificationReconciler>,
    /// Consumes the notification channel.
    pub listener: Arc<NotificationListener>,
    /// Producer side of the notification channel.
    pub notification_sender: NotificationSender,
    /// Removes expired stopped sessions.
    pub eviction: Arc<EvictionTask>,
    /// Media server health.
    pub source_health: Arc<SourceHealthMonitor>,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Starts the notification listener and the eviction loop.
    pub fn start_background_tasks(&self) {
        self.listener.start();
        self.eviction.start();
    }

    /// Initiates graceful shutdown of all services.
    ///
    /// Waits for the batch being reconciled, if any, to finish.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        // Signal cancellation to all background tasks
        self.cancel_token.cancel();

        if tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, self.listener.stopped())
            .await
            .is_err()
        {
            log::warn!(
                "[Bootstrap] Notification listener did not stop within {:?}",
                SHUTDOWN_DRAIN_TIMEOUT
            );
        }

        log::info!(
            "[Bootstrap] Shutdown complete ({} session(s) tracked)",
            self.registry.len()
        );
    }
}

/// Creates the shared HTTP client for all Plex communication.
///
/// Using a shared client enables connection pooling. This is created once
/// during startup and injected into the Plex client.
pub fn create_http_client() -> PlexwatchResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(PLEX_HTTP_TIMEOUT_SECS))
        .build()
        .map_err(|e| PlexwatchError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// Bootstraps all application services with their dependencies.
///
/// Services are created in dependency order:
///
/// 1. Shared infrastructure (spawner, cancellation token)
/// 2. Registry and health monitor
/// 3. Reconciler (depends on source, registry, health)
/// 4. Listener and eviction task
///
/// Background tasks are not started; call
/// [`BootstrappedServices::start_background_tasks`].
///
/// # Arguments
/// * `config` - Core configuration (validated here)
/// * `source` - Media server queries
/// * `identity` - Name and machine id recorded in the registry
/// * `emitter` - Event emitter for registry and health events
///
/// # Errors
///
/// Returns [`PlexwatchError::Configuration`] if the configuration is invalid.
pub fn bootstrap_services(
    config: Config,
    source: Arc<dyn SessionSource>,
    identity: ServerIdentity,
    emitter: Arc<dyn EventEmitter>,
) -> PlexwatchResult<BootstrappedServices> {
    config.validate().map_err(PlexwatchError::Configuration)?;
    let config = Arc::new(config);

    let spawner = TokioSpawner::current();
    let cancel_token = CancellationToken::new();

    let registry = Arc::new(SessionRegistry::new(identity.name, identity.machine_id));
    let source_health = Arc::new(SourceHealthMonitor::new(
        Arc::clone(&emitter),
        config.degraded_after_failures,
    ));

    let reconciler = Arc::new(NotificationReconciler::new(
        source,
        Arc::clone(&registry),
        Arc::clone(&emitter),
        Arc::clone(&source_health),
        config.lookup_timeout(),
    ));

    let (listener, notification_sender) = NotificationListener::new(
        Arc::clone(&reconciler),
        config.notification_channel_capacity,
        cancel_token.clone(),
        spawner.clone(),
    );

    let eviction = Arc::new(EvictionTask::new(
        Arc::clone(&registry),
        emitter,
        config.retention(),
        config.eviction_interval(),
        cancel_token.clone(),
        spawner.clone(),
    ));

    log::info!(
        "[Bootstrap] Tracking sessions of \"{}\" ({}), lookup timeout {:?}, retention {:?}",
        registry.server_name(),
        registry.machine_id(),
        config.lookup_timeout(),
        config.retention()
    );

    Ok(BootstrappedServices {
        config,
        registry,
        reconciler,
        listener: Arc::new(listener),
        notification_sender,
        eviction,
        source_health,
        spawner,
        cancel_token,
    })
}
