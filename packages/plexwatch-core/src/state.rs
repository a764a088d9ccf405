//! Core configuration.
//!
//! [`Config`] holds the tunables of the reconciliation pipeline. The server
//! binary builds it from its own YAML/env configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for session tracking.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    // Server
    /// Port for the HTTP API (0 = auto-allocate).
    pub preferred_port: u16,

    // Reconciliation
    /// Upper bound for a single media server query (milliseconds).
    pub lookup_timeout_ms: u64,

    /// Capacity of the notification batch channel.
    pub notification_channel_capacity: usize,

    // Registry
    /// How long stopped sessions stay visible before eviction (seconds).
    pub retention_secs: u64,

    /// Interval between eviction passes (seconds).
    pub eviction_interval_secs: u64,

    // Health
    /// Consecutive transport failures before the source is reported degraded.
    pub degraded_after_failures: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_port: 0,
            lookup_timeout_ms: 5_000,
            notification_channel_capacity: 256,
            retention_secs: 300,
            eviction_interval_secs: 60,
            degraded_after_failures: 3,
        }
    }
}

impl Config {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.lookup_timeout_ms == 0 {
            return Err("lookup_timeout_ms must be >= 1".to_string());
        }
        if self.notification_channel_capacity == 0 {
            return Err(
                "notification_channel_capacity must be >= 1 (mpsc::channel panics on 0)"
                    .to_string(),
            );
        }
        if self.eviction_interval_secs == 0 {
            return Err("eviction_interval_secs must be >= 1".to_string());
        }
        if self.degraded_after_failures == 0 {
            return Err("degraded_after_failures must be >= 1".to_string());
        }
        Ok(())
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs)
    }
}
