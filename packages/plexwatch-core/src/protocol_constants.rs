//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the Plex API or by the HTTP ingress contract,
//! and changing them would break compatibility with the push channel.

// ─────────────────────────────────────────────────────────────────────────────
// Plex API
// ─────────────────────────────────────────────────────────────────────────────

/// Notification category that carries `PlaySessionStateNotification` entries.
pub const PLAYING_NOTIFICATION_TYPE: &str = "playing";

/// Overall timeout for Plex HTTP requests (seconds).
///
/// The reconciler applies its own, usually shorter, lookup timeout on top.
pub const PLEX_HTTP_TIMEOUT_SECS: u64 = 10;

/// Maximum size of a push notification body (bytes).
pub const MAX_NOTIFY_BODY_SIZE: usize = 256 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Application name sent as `X-Plex-Product`.
pub const APP_NAME: &str = "Plexwatch";

/// Service identifier reported by the health endpoint.
pub const SERVICE_ID: &str = "plexwatch";
