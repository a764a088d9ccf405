//! Low-level HTTP transport for the Plex API.
//!
//! This module handles the request headers, HTTP transport and status
//! mapping. For the typed queries, see `client.rs`.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while querying the media server.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request to the server failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned a non-success HTTP status.
    #[error("HTTP error {0}: {1}")]
    HttpStatus(u16, String),

    /// The requested item does not exist (or no longer exists).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The call did not complete within the lookup timeout.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The item id is not safe to put in a request path; nothing was sent.
    #[error("Invalid item id: {0:?}")]
    InvalidId(String),

    /// The response body could not be decoded.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Convenient Result alias for media server queries.
pub type SourceResult<T> = Result<T, SourceError>;

impl SourceError {
    /// Returns true if the error says the server is unreachable or unhealthy,
    /// as opposed to a well-formed answer that lacked the requested data.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SourceError::Http(_) | SourceError::HttpStatus(_, _) | SourceError::Timeout(_)
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Headers
// ─────────────────────────────────────────────────────────────────────────────

/// Identification headers sent with every request.
#[derive(Debug, Clone)]
pub struct PlexHeaders {
    pub token: String,
    pub client_identifier: String,
    pub product: String,
    pub device_name: String,
}

/// Joins a base URL and an absolute API path without doubling slashes.
pub fn build_plex_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Issues a GET against the Plex API and returns the response body.
///
/// # Arguments
/// * `client` - The shared HTTP client
/// * `base_url` - Server base URL (e.g. "http://10.0.0.5:32400")
/// * `path` - API path (e.g. "/status/sessions")
/// * `headers` - Identification headers, including the token
pub async fn get_plex(
    client: &Client,
    base_url: &str,
    path: &str,
    headers: &PlexHeaders,
) -> SourceResult<String> {
    let url = build_plex_url(base_url, path);

    log::debug!("[Plex] GET {}", url);

    let start = std::time::Instant::now();
    let res = client
        .get(&url)
        .header("Accept", "application/json")
        .header("X-Plex-Token", &headers.token)
        .header("X-Plex-Client-Identifier", &headers.client_identifier)
        .header("X-Plex-Product", &headers.product)
        .header("X-Plex-Device-Name", &headers.device_name)
        .send()
        .await?;

    let status = res.status();
    let text = res.text().await?;

    log::debug!(
        "[Plex] GET {} -> {} in {}ms ({} bytes)",
        path,
        status,
        start.elapsed().as_millis(),
        text.len()
    );

    if status == StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound(path.to_string()));
    }

    if !status.is_success() {
        let reason = status.canonical_reason().unwrap_or("unknown").to_string();
        return Err(SourceError::HttpStatus(status.as_u16(), reason));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        assert_eq!(
            build_plex_url("http://10.0.0.5:32400/", "/status/sessions"),
            "http://10.0.0.5:32400/status/sessions"
        );
        assert_eq!(
            build_plex_url("http://10.0.0.5:32400", "library/metadata/1"),
            "http://10.0.0.5:32400/library/metadata/1"
        );
    }

    #[test]
    fn transport_classification() {
        assert!(SourceError::HttpStatus(500, "Internal Server Error".into()).is_transport());
        assert!(SourceError::Timeout(Duration::from_secs(5)).is_transport());
        assert!(!SourceError::NotFound("/library/metadata/1".into()).is_transport());
        assert!(!SourceError::Decode("eof".into()).is_transport());
        assert!(!SourceError::InvalidId("1/children".into()).is_transport());
    }
}
