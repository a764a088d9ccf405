//! Trait abstractions for media server queries.
//!
//! These traits enable dependency injection for testability and modularity.
//! The reconciler depends on [`SessionSource`] rather than the HTTP client.

use async_trait::async_trait;

use crate::plex::http::SourceResult;
use crate::types::{CurrentSession, MediaInfo};

/// Authoritative, possibly stale, view of the media server's sessions.
///
/// Used by `NotificationReconciler` to enrich push notifications.
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Lists the sessions the server currently considers active.
    async fn list_current_sessions(&self) -> SourceResult<Vec<CurrentSession>>;

    /// Fetches descriptive metadata for a media item.
    ///
    /// # Arguments
    /// * `media_id` - Rating key of the item
    ///
    /// # Errors
    /// `SourceError::NotFound` when the server has no such item.
    async fn fetch_metadata(&self, media_id: &str) -> SourceResult<MediaInfo>;
}
