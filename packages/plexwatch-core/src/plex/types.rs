//! Plex JSON wire types.
//!
//! Only the fields this crate reads are modelled; everything else in the
//! server's responses is ignored. Identifiers are accepted as either JSON
//! strings or numbers since Plex is not consistent about it across endpoints.

use serde::{Deserialize, Deserializer};

/// Deserializes an optional identifier given as a string or a number.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Signed(n) => n.to_string(),
        Raw::Unsigned(n) => n.to_string(),
    }))
}

/// Top-level wrapper of every Plex API response.
#[derive(Debug, Deserialize)]
pub struct MediaContainerEnvelope<T> {
    #[serde(rename = "MediaContainer")]
    pub media_container: T,
}

// ─────────────────────────────────────────────────────────────────────────────
// /status/sessions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct SessionsContainer {
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<SessionMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct SessionMetadata {
    #[serde(rename = "sessionKey", default, deserialize_with = "string_or_number")]
    pub session_key: Option<String>,
    #[serde(rename = "User")]
    pub user: Option<PlexUser>,
    #[serde(rename = "Player")]
    pub player: Option<PlexPlayer>,
}

#[derive(Debug, Deserialize)]
pub struct PlexUser {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlexPlayer {
    pub title: Option<String>,
    pub product: Option<String>,
    pub platform: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// /library/metadata/{id}
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct MetadataContainer {
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<MetadataItem>,
}

#[derive(Debug, Deserialize)]
pub struct MetadataItem {
    #[serde(rename = "ratingKey", default, deserialize_with = "string_or_number")]
    pub rating_key: Option<String>,
    pub title: Option<String>,
    pub duration: Option<u64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "grandparentTitle")]
    pub grandparent_title: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// / (server identity)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct IdentityContainer {
    #[serde(rename = "friendlyName")]
    pub friendly_name: Option<String>,
    #[serde(rename = "machineIdentifier")]
    pub machine_identifier: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Push notifications
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level wrapper of a push notification message.
#[derive(Debug, Deserialize)]
pub struct NotificationEnvelope {
    #[serde(rename = "NotificationContainer")]
    pub notification_container: NotificationContainer,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationContainer {
    /// Notification category; only "playing" carries session state.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Entries are kept raw so one bad entry cannot fail the whole message.
    #[serde(rename = "PlaySessionStateNotification", default)]
    pub play_session_state_notification: Vec<serde_json::Value>,
}

impl NotificationContainer {
    /// Decodes each entry on its own.
    pub fn entries(
        self,
    ) -> impl Iterator<Item = Result<PlaySessionStateNotification, serde_json::Error>> {
        self.play_session_state_notification
            .into_iter()
            .map(serde_json::from_value)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaySessionStateNotification {
    #[serde(rename = "sessionKey", default, deserialize_with = "string_or_number")]
    pub session_key: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "ratingKey", default, deserialize_with = "string_or_number")]
    pub rating_key: Option<String>,
    #[serde(rename = "viewOffset")]
    pub view_offset: Option<i64>,
}
