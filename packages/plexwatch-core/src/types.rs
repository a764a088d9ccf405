//! Domain types for playback session tracking.
//!
//! - [`SessionState`] - the session lifecycle states and the enrichment rule
//! - [`SessionRecord`] - one registry entry per session key
//! - [`SessionUpdate`] - the argument of a registry upsert
//! - [`PlaybackNotification`] - a raw, unvalidated push event
//! - [`ValidNotification`] - a notification that passed field validation

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::plex::types::PlaySessionStateNotification;

// ─────────────────────────────────────────────────────────────────────────────
// Session State
// ─────────────────────────────────────────────────────────────────────────────

/// Playback state asserted by the media server.
///
/// Transitions are unconstrained: any state may follow any other, since the
/// state comes from the notification source and is not derived locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Playing,
    Paused,
    Buffering,
    Stopped,
    /// Any state label that is not recognized.
    #[default]
    Unknown,
}

impl SessionState {
    /// Parses a notification state label. Matching is case-insensitive and
    /// unrecognized labels map to [`SessionState::Unknown`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "playing" => Self::Playing,
            "paused" => Self::Paused,
            "buffering" => Self::Buffering,
            "stopped" => Self::Stopped,
            _ => Self::Unknown,
        }
    }

    /// Returns the canonical lowercase label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Buffering => "buffering",
            Self::Stopped => "stopped",
            Self::Unknown => "unknown",
        }
    }

    /// Whether user and media details may still be fetched for a session in
    /// this state. A stopped session is already gone server-side.
    #[must_use]
    pub fn permits_enrichment(&self) -> bool {
        !matches!(self, Self::Stopped)
    }
}

impl From<&str> for SessionState {
    fn from(label: &str) -> Self {
        Self::from_label(label)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Enrichment Details
// ─────────────────────────────────────────────────────────────────────────────

/// The account watching a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
}

/// The client device playing a session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Device name as shown by the media server (e.g. "Living Room TV").
    pub title: Option<String>,
    /// Client application (e.g. "Plex for Android").
    pub product: Option<String>,
    pub platform: Option<String>,
}

/// Descriptive metadata for the media being played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    /// Rating key of the item.
    pub media_id: String,
    pub title: String,
    /// Total duration in milliseconds, when the server reports one.
    pub duration_millis: Option<u64>,
    /// Media type ("movie", "episode", "track", ...).
    pub kind: Option<String>,
    /// Show or artist title for episodes and tracks.
    pub grandparent_title: Option<String>,
}

/// An entry of the media server's current-sessions list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentSession {
    pub session_key: String,
    pub user: Option<UserInfo>,
    pub player: Option<PlayerInfo>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry Records
// ─────────────────────────────────────────────────────────────────────────────

/// Current view of one playback session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_key: String,
    pub state: SessionState,
    pub user: Option<UserInfo>,
    pub player: Option<PlayerInfo>,
    pub media: Option<MediaInfo>,
    pub view_offset_millis: u64,
    /// Unix timestamp (ms) of the most recently applied event.
    pub last_updated: u64,
}

/// The payload of a registry upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUpdate {
    pub session_key: String,
    pub state: SessionState,
    pub user: Option<UserInfo>,
    pub player: Option<PlayerInfo>,
    pub media: Option<MediaInfo>,
    pub view_offset_millis: u64,
}

impl SessionUpdate {
    /// An update carrying no enrichment, as applied for stopped sessions and
    /// whenever nothing could be fetched.
    pub fn bare(session_key: impl Into<String>, state: SessionState, view_offset_millis: u64) -> Self {
        Self {
            session_key: session_key.into(),
            state,
            user: None,
            player: None,
            media: None,
            view_offset_millis,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Notifications
// ─────────────────────────────────────────────────────────────────────────────

/// A raw push notification, decoupled from the wire format.
///
/// Every field is optional here; validation happens in
/// [`PlaybackNotification::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaybackNotification {
    pub session_key: Option<String>,
    pub state_label: Option<String>,
    pub media_id: Option<String>,
    pub view_offset_millis: Option<i64>,
}

/// A notification whose required fields are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidNotification {
    pub session_key: String,
    pub state: SessionState,
    /// Always present unless `state` is [`SessionState::Stopped`].
    pub media_id: Option<String>,
    pub view_offset_millis: u64,
}

/// Whether `id` can be used as a library item key.
///
/// Keys are spliced into request paths, so only ASCII letters and digits
/// are accepted.
pub fn is_rating_key(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric())
}

impl PlaybackNotification {
    /// Checks required fields and parses the state label.
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<ValidNotification, String> {
        let session_key = match self.session_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => return Err("missing sessionKey".to_string()),
        };

        let state = self
            .state_label
            .as_deref()
            .map(SessionState::from_label)
            .unwrap_or_default();

        let media_id = self
            .media_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        match media_id.as_deref() {
            None if state.permits_enrichment() => {
                return Err(format!(
                    "missing ratingKey for session {} in state {}",
                    session_key, state
                ));
            }
            Some(id) if state.permits_enrichment() && !is_rating_key(id) => {
                return Err(format!(
                    "invalid ratingKey {:?} for session {}",
                    id, session_key
                ));
            }
            _ => {}
        }

        let view_offset_millis = match self.view_offset_millis {
            None => 0,
            Some(offset) => u64::try_from(offset).map_err(|_| {
                format!("negative viewOffset {} for session {}", offset, session_key)
            })?,
        };

        Ok(ValidNotification {
            session_key,
            state,
            media_id,
            view_offset_millis,
        })
    }
}

impl From<PlaySessionStateNotification> for PlaybackNotification {
    fn from(n: PlaySessionStateNotification) -> Self {
        Self {
            session_key: n.session_key,
            state_label: n.state,
            media_id: n.rating_key,
            view_offset_millis: n.view_offset,
        }
    }
}
