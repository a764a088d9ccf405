//! High-level Plex queries.
//!
//! This module turns Plex JSON responses into domain types and provides
//! [`PlexClientImpl`], the HTTP-backed [`SessionSource`].

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::plex::http::{get_plex, PlexHeaders, SourceError, SourceResult};
use crate::plex::traits::SessionSource;
use crate::plex::types::{
    IdentityContainer, MediaContainerEnvelope, MetadataContainer, SessionMetadata,
    SessionsContainer,
};
use crate::protocol_constants::APP_NAME;
use crate::types::{is_rating_key, CurrentSession, MediaInfo, PlayerInfo, UserInfo};

// ─────────────────────────────────────────────────────────────────────────────
// Response Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Decodes the `MediaContainer` of a Plex JSON response.
fn decode_container<T: DeserializeOwned>(body: &str) -> SourceResult<T> {
    serde_json::from_str::<MediaContainerEnvelope<T>>(body)
        .map(|envelope| envelope.media_container)
        .map_err(|e| SourceError::Decode(e.to_string()))
}

fn session_from_metadata(entry: SessionMetadata) -> Option<CurrentSession> {
    let session_key = entry.session_key?;

    let user = entry.user.and_then(|u| {
        Some(UserInfo {
            id: u.id?,
            name: u.title.unwrap_or_default(),
        })
    });

    let player = entry.player.map(|p| PlayerInfo {
        title: p.title,
        product: p.product,
        platform: p.platform,
    });

    Some(CurrentSession {
        session_key,
        user,
        player,
    })
}

/// Parses a `/status/sessions` response.
///
/// Entries without a session key are skipped.
pub fn parse_sessions(body: &str) -> SourceResult<Vec<CurrentSession>> {
    let container: SessionsContainer = decode_container(body)?;
    Ok(container
        .metadata
        .into_iter()
        .filter_map(session_from_metadata)
        .collect())
}

/// Parses a `/library/metadata/{id}` response.
///
/// # Arguments
/// * `body` - The raw JSON response
/// * `media_id` - The requested rating key, used when the item omits its own
///
/// # Errors
/// `SourceError::NotFound` when the container holds no items.
pub fn parse_metadata(body: &str, media_id: &str) -> SourceResult<MediaInfo> {
    let container: MetadataContainer = decode_container(body)?;
    let item = container
        .metadata
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::NotFound(format!("metadata for {}", media_id)))?;

    Ok(MediaInfo {
        media_id: item.rating_key.unwrap_or_else(|| media_id.to_string()),
        title: item.title.unwrap_or_default(),
        duration_millis: item.duration,
        kind: item.kind,
        grandparent_title: item.grandparent_title,
    })
}

/// Name and machine identifier of a Plex server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerIdentity {
    pub name: String,
    pub machine_id: String,
}

/// Parses the server root (`/`) response.
pub fn parse_identity(body: &str) -> SourceResult<ServerIdentity> {
    let container: IdentityContainer = decode_container(body)?;
    let machine_id = container
        .machine_identifier
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SourceError::Decode("missing machineIdentifier".to_string()))?;

    Ok(ServerIdentity {
        name: container.friendly_name.unwrap_or_default(),
        machine_id,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Concrete HTTP implementation of [`SessionSource`].
#[derive(Clone)]
pub struct PlexClientImpl {
    /// HTTP client for Plex communication.
    client: Client,
    /// Server base URL, e.g. "http://10.0.0.5:32400".
    base_url: String,
    headers: PlexHeaders,
}

impl std::fmt::Debug for PlexClientImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlexClientImpl")
            .field("client", &"Client")
            .field("base_url", &self.base_url)
            .field("client_identifier", &self.headers.client_identifier)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl PlexClientImpl {
    /// Creates a new PlexClientImpl.
    ///
    /// # Arguments
    /// * `client` - The HTTP client to use for all Plex communication
    /// * `base_url` - Server base URL
    /// * `token` - Plex authentication token, passed through unchanged
    /// * `client_identifier` - Stable identifier for this process; a random
    ///   one is generated when `None`
    #[must_use]
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
        client_identifier: Option<String>,
    ) -> Self {
        let device_name = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| APP_NAME.to_string());

        Self {
            client,
            base_url: base_url.into(),
            headers: PlexHeaders {
                token: token.into(),
                client_identifier: client_identifier
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                product: APP_NAME.to_string(),
                device_name,
            },
        }
    }

    /// Returns the server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the server's friendly name and machine identifier.
    pub async fn server_identity(&self) -> SourceResult<ServerIdentity> {
        let body = get_plex(&self.client, &self.base_url, "/", &self.headers).await?;
        parse_identity(&body)
    }
}

#[async_trait]
impl SessionSource for PlexClientImpl {
    async fn list_current_sessions(&self) -> SourceResult<Vec<CurrentSession>> {
        let body = get_plex(&self.client, &self.base_url, "/status/sessions", &self.headers).await?;
        parse_sessions(&body)
    }

    async fn fetch_metadata(&self, media_id: &str) -> SourceResult<MediaInfo> {
        if !is_rating_key(media_id) {
            return Err(SourceError::InvalidId(media_id.to_string()));
        }
        let path = format!("/library/metadata/{}", media_id);
        let body = get_plex(&self.client, &self.base_url, &path, &self.headers).await?;
        parse_metadata(&body, media_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plex::test_fixtures::{
        EMPTY_METADATA_RESPONSE, EMPTY_SESSIONS_RESPONSE, IDENTITY_RESPONSE, METADATA_RESPONSE,
        SESSIONS_RESPONSE,
    };

    #[test]
    fn parses_sessions_with_user_and_player() {
        let sessions = parse_sessions(SESSIONS_RESPONSE).unwrap();
        assert_eq!(sessions.len(), 2);

        let first = &sessions[0];
        assert_eq!(first.session_key, "12");
        assert_eq!(
            first.user,
            Some(UserInfo {
                id: "7".to_string(),
                name: "alice".to_string()
            })
        );
        let player = first.player.as_ref().unwrap();
        assert_eq!(player.title.as_deref(), Some("Living Room TV"));
        assert_eq!(player.product.as_deref(), Some("Plex for Android (TV)"));
        assert_eq!(player.platform.as_deref(), Some("Android"));
    }

    #[test]
    fn numeric_identifiers_become_strings() {
        let sessions = parse_sessions(SESSIONS_RESPONSE).unwrap();
        let second = &sessions[1];
        assert_eq!(second.session_key, "13");
        assert_eq!(second.user.as_ref().unwrap().id, "8");
        assert!(second.player.is_none());
    }

    #[test]
    fn empty_session_list() {
        assert!(parse_sessions(EMPTY_SESSIONS_RESPONSE).unwrap().is_empty());
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let err = parse_sessions("<html>nope</html>").unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }

    #[test]
    fn parses_metadata() {
        let media = parse_metadata(METADATA_RESPONSE, "4821").unwrap();
        assert_eq!(media.media_id, "4821");
        assert_eq!(media.title, "Pilot");
        assert_eq!(media.duration_millis, Some(2_700_000));
        assert_eq!(media.kind.as_deref(), Some("episode"));
        assert_eq!(media.grandparent_title.as_deref(), Some("Some Show"));
    }

    #[test]
    fn empty_metadata_is_not_found() {
        let err = parse_metadata(EMPTY_METADATA_RESPONSE, "4821").unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[test]
    fn parses_identity() {
        let identity = parse_identity(IDENTITY_RESPONSE).unwrap();
        assert_eq!(identity.name, "basement");
        assert_eq!(identity.machine_id, "0f2a9c1b7d");
    }

    #[tokio::test]
    async fn unsafe_rating_key_is_refused_before_any_request() {
        // Nothing listens on the discard port; a sent request would fail as Http
        let client = PlexClientImpl::new(Client::new(), "http://127.0.0.1:9", "secret", None);
        for bad in ["1/children", "../x", "4821?x=1", ""] {
            let err = client.fetch_metadata(bad).await.unwrap_err();
            assert!(matches!(err, SourceError::InvalidId(_)), "{bad}: {err}");
        }
    }

    #[test]
    fn debug_output_redacts_token() {
        let client = PlexClientImpl::new(Client::new(), "http://plex:32400", "secret", None);
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("redacted"));
    }
}
