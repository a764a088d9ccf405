//! Domain events for monitoring collaborators.
//!
//! This module provides:
//! - [`EventEmitter`] trait for services to emit events
//! - Event types for registry changes and media server health

mod emitter;

pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::types::SessionRecord;

/// Events related to registry contents.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RegistryEvent {
    /// A session record was created or replaced.
    SessionUpdated {
        /// The record as it is after the update.
        session: SessionRecord,
        /// Whether the update lacked enrichment because of a lookup failure.
        degraded: bool,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Stopped sessions were removed after their retention window.
    SessionsEvicted {
        #[serde(rename = "sessionKeys")]
        session_keys: Vec<String>,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Health of the media server as seen by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SourceHealth {
    /// Queries are succeeding.
    #[default]
    Ok,
    /// Queries keep failing at the transport level.
    Degraded,
}

/// Events related to media server reachability.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HealthEvent {
    /// Source health status changed.
    HealthChanged {
        /// Current health status.
        health: SourceHealth,
        /// Human-readable reason for the status (if degraded).
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}
