//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to (0 = any free port).
    /// Override: `PLEXWATCH_BIND_PORT`
    pub bind_port: u16,

    /// Base URL of the Plex media server.
    /// Override: `PLEXWATCH_PLEX_URL`
    pub plex_url: String,

    /// Plex authentication token, sent unchanged with every request.
    /// Override: `PLEXWATCH_TOKEN`
    pub plex_token: Option<String>,

    /// Stable `X-Plex-Client-Identifier`; random per process when unset.
    /// Override: `PLEXWATCH_CLIENT_ID`
    pub client_identifier: Option<String>,

    /// Server name recorded in the registry. Fetched from Plex when unset.
    pub server_name: Option<String>,

    /// Machine identifier recorded in the registry. Fetched from Plex when unset.
    pub machine_id: Option<String>,

    /// Upper bound for one Plex lookup (milliseconds).
    /// Override: `PLEXWATCH_LOOKUP_TIMEOUT_MS`
    pub lookup_timeout_ms: u64,

    /// How long stopped sessions stay visible (seconds).
    /// Override: `PLEXWATCH_RETENTION_SECS`
    pub retention_secs: u64,

    /// Interval between eviction passes (seconds).
    pub eviction_interval_secs: u64,

    /// Notification batches that may wait for the reconciler.
    pub notification_channel_capacity: usize,

    /// Consecutive transport failures before Plex is reported degraded.
    pub degraded_after_failures: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = plexwatch_core::Config::default();
        Self {
            bind_port: 8484,
            plex_url: "http://127.0.0.1:32400".to_string(),
            plex_token: None,
            client_identifier: None,
            server_name: None,
            machine_id: None,
            lookup_timeout_ms: core.lookup_timeout_ms,
            retention_secs: core.retention_secs,
            eviction_interval_secs: core.eviction_interval_secs,
            notification_channel_capacity: core.notification_channel_capacity,
            degraded_after_failures: core.degraded_after_failures,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `PLEXWATCH_*` overrides from `lookup`. Unparseable values are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("PLEXWATCH_BIND_PORT").and_then(|v| v.parse().ok()) {
            self.bind_port = port;
        }

        if let Some(url) = lookup("PLEXWATCH_PLEX_URL").filter(|v| !v.is_empty()) {
            self.plex_url = url;
        }

        if let Some(token) = lookup("PLEXWATCH_TOKEN").filter(|v| !v.is_empty()) {
            self.plex_token = Some(token);
        }

        if let Some(id) = lookup("PLEXWATCH_CLIENT_ID").filter(|v| !v.is_empty()) {
            self.client_identifier = Some(id);
        }

        if let Some(ms) = lookup("PLEXWATCH_LOOKUP_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.lookup_timeout_ms = ms;
        }

        if let Some(secs) = lookup("PLEXWATCH_RETENTION_SECS").and_then(|v| v.parse().ok()) {
            self.retention_secs = secs;
        }
    }

    /// Converts to plexwatch-core's Config type.
    pub fn to_core_config(&self) -> plexwatch_core::Config {
        plexwatch_core::Config {
            preferred_port: self.bind_port,
            lookup_timeout_ms: self.lookup_timeout_ms,
            notification_channel_capacity: self.notification_channel_capacity,
            retention_secs: self.retention_secs,
            eviction_interval_secs: self.eviction_interval_secs,
            degraded_after_failures: self.degraded_after_failures,
        }
    }
}
