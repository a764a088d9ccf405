//! Plexwatch Core - playback session tracking for a Plex media server.
//!
//! This crate turns the media server's push notifications into an in-memory
//! registry of playback sessions, enriched with user, player and media
//! details looked up from the server itself.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`types`]: Session states, records and notifications
//! - [`plex`]: Plex HTTP adapter ([`SessionSource`](plex::SessionSource))
//! - [`services`]: Reconciler, registry, listener, eviction and health
//! - [`events`]: Event system for registry and health changes
//! - [`runtime`]: Task spawning abstraction for async runtime independence
//! - [`state`]: Core configuration
//! - [`api`]: HTTP ingress and read API
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`SessionSource`](plex::SessionSource): Querying the media server
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks
//! - [`EventEmitter`](events::EventEmitter): Emitting domain events

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod error;
pub mod events;
pub mod plex;
pub mod protocol_constants;
pub mod runtime;
pub mod services;
pub mod state;
pub mod types;
pub mod utils;

// Re-export commonly used types at the crate root
pub use error::{ErrorCode, PlexwatchError, PlexwatchResult};
pub use events::{
    EventEmitter, HealthEvent, LoggingEventEmitter, NoopEventEmitter, RegistryEvent, SourceHealth,
};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::Config;
pub use types::{
    CurrentSession, MediaInfo, PlaybackNotification, PlayerInfo, SessionRecord, SessionState,
    SessionUpdate, UserInfo,
};
pub use utils::now_millis;

// Re-export Plex types
pub use plex::{PlexClientImpl, ServerIdentity, SessionSource, SourceError, SourceResult};

// Re-export service types
pub use services::{
    NotificationReconciler, ReconcileError, ReconcileOutcome, SessionRegistry,
    SourceHealthMonitor,
};

// Re-export bootstrap types
pub use bootstrap::{bootstrap_services, create_http_client, BootstrappedServices};

// Re-export API types
pub use api::{bind, start_server, AppState, ServerError};
