//! Notification reconciliation service.
//!
//! Responsibilities:
//! - Validating raw push notifications
//! - Enriching live sessions from the media server (session list + metadata)
//! - Falling back to degraded updates when lookups fail
//! - Writing exactly one registry update per valid notification
//!
//! Failures are per notification: one bad or unlucky event never stops the
//! rest of its batch from being applied.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::error::ErrorCode;
use crate::events::{EventEmitter, RegistryEvent};
use crate::plex::http::{SourceError, SourceResult};
use crate::plex::traits::SessionSource;
use crate::services::session_registry::SessionRegistry;
use crate::services::source_health::SourceHealthMonitor;
use crate::types::{
    CurrentSession, MediaInfo, PlaybackNotification, SessionState, SessionUpdate,
    ValidNotification,
};

/// Why a notification could not be applied in full.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// The session list could not be fetched (unreachable, error status or timeout).
    #[error("media server unavailable for session {session_key}: {reason}")]
    Transport { session_key: String, reason: String },

    /// The session ended between the notification and the lookup.
    #[error("session {session_key} is no longer listed by the media server")]
    SessionVanished { session_key: String },

    /// Metadata could not be fetched; the update went ahead without media.
    #[error("metadata for {media_id} unavailable (session {session_key}): {reason}")]
    MetadataUnavailable {
        session_key: String,
        media_id: String,
        reason: String,
    },

    /// Required fields were missing or invalid; nothing was applied.
    #[error("malformed notification: {0}")]
    MalformedEvent(String),
}

/// Result of reconciling one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The registry received a complete update.
    Applied { session_key: String },
    /// The registry received an update lacking some enrichment.
    Degraded {
        session_key: String,
        reason: ReconcileError,
    },
    /// The notification was discarded without touching the registry.
    Dropped { reason: ReconcileError },
}

impl ReconcileOutcome {
    /// The session the outcome refers to, if the notification named one.
    pub fn session_key(&self) -> Option<&str> {
        match self {
            Self::Applied { session_key } | Self::Degraded { session_key, .. } => {
                Some(session_key)
            }
            Self::Dropped { .. } => None,
        }
    }

    /// Whether the registry was updated.
    pub fn reached_registry(&self) -> bool {
        !matches!(self, Self::Dropped { .. })
    }
}

/// Session list fetched lazily once per batch, failure included.
type SessionListCache = Option<Result<Vec<CurrentSession>, String>>;

/// Reconciles push notifications against the media server and the registry.
pub struct NotificationReconciler {
    source: Arc<dyn SessionSource>,
    registry: Arc<SessionRegistry>,
    emitter: Arc<dyn EventEmitter>,
    health: Arc<SourceHealthMonitor>,
    /// Upper bound for each media server query.
    lookup_timeout: Duration,
}

impl NotificationReconciler {
    /// Creates a new NotificationReconciler.
    ///
    /// # Arguments
    /// * `source` - Media server queries
    /// * `registry` - Registry receiving the updates
    /// * `emitter` - Event emitter for registry change events
    /// * `health` - Health monitor fed with query results
    /// * `lookup_timeout` - Upper bound for each query
    pub fn new(
        source: Arc<dyn SessionSource>,
        registry: Arc<SessionRegistry>,
        emitter: Arc<dyn EventEmitter>,
        health: Arc<SourceHealthMonitor>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            source,
            registry,
            emitter,
            health,
            lookup_timeout,
        }
    }

    /// Returns the registry this reconciler writes to.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Reconciles a single notification.
    pub async fn reconcile(&self, notification: &PlaybackNotification) -> ReconcileOutcome {
        let mut sessions = SessionListCache::None;
        self.reconcile_one(notification, &mut sessions).await
    }

    /// Reconciles a batch of notifications in order.
    ///
    /// The session list is fetched at most once per batch. Every notification
    /// yields its own outcome.
    pub async fn reconcile_batch(
        &self,
        notifications: &[PlaybackNotification],
    ) -> Vec<ReconcileOutcome> {
        let mut sessions = SessionListCache::None;
        let mut outcomes = Vec::with_capacity(notifications.len());

        for notification in notifications {
            outcomes.push(self.reconcile_one(notification, &mut sessions).await);
        }

        let degraded = outcomes
            .iter()
            .filter(|o| matches!(o, ReconcileOutcome::Degraded { .. }))
            .count();
        let dropped = outcomes.iter().filter(|o| !o.reached_registry()).count();
        log::debug!(
            "[Reconciler] Batch of {} processed: {} applied, {} degraded, {} dropped",
            outcomes.len(),
            outcomes.len() - degraded - dropped,
            degraded,
            dropped
        );

        outcomes
    }

    async fn reconcile_one(
        &self,
        notification: &PlaybackNotification,
        sessions: &mut SessionListCache,
    ) -> ReconcileOutcome {
        let event = match notification.validate() {
            Ok(event) => event,
            Err(reason) => {
                let error = ReconcileError::MalformedEvent(reason);
                log::warn!(
                    "[Reconciler] Dropping notification {:?} ({}): {}",
                    notification,
                    error.code(),
                    error
                );
                return ReconcileOutcome::Dropped { reason: error };
            }
        };

        // A stopped session is already gone server-side; nothing to look up
        if !event.state.permits_enrichment() {
            log::info!(
                "[Reconciler] Session {} stopped at {:?}",
                event.session_key,
                Duration::from_millis(event.view_offset_millis)
            );
            self.apply(
                SessionUpdate::bare(&event.session_key, event.state, event.view_offset_millis),
                false,
            );
            return ReconcileOutcome::Applied {
                session_key: event.session_key,
            };
        }

        let session = match self.current_sessions(sessions).await {
            Ok(list) => list
                .iter()
                .find(|s| s.session_key == event.session_key)
                .cloned(),
            Err(reason) => return self.degrade_unreachable(event, reason),
        };

        let Some(session) = session else {
            return self.degrade_vanished(event);
        };

        let media_id = event.media_id.clone().unwrap_or_default();
        match self.bounded(self.source.fetch_metadata(&media_id)).await {
            Ok(media) => {
                self.health.record_success();
                self.apply_enriched(event, session, media)
            }
            Err(e) => {
                self.note_failure(&e);
                self.degrade_without_media(event, session, media_id, e)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Update Paths
    // ─────────────────────────────────────────────────────────────────────────

    fn apply_enriched(
        &self,
        event: ValidNotification,
        session: CurrentSession,
        media: MediaInfo,
    ) -> ReconcileOutcome {
        log::info!(
            "[Reconciler] Session {} {} by {} ({}): \"{}\" [{}] at {:?}",
            event.session_key,
            event.state,
            session.user.as_ref().map(|u| u.name.as_str()).unwrap_or("?"),
            session.user.as_ref().map(|u| u.id.as_str()).unwrap_or("?"),
            media.title,
            media.media_id,
            Duration::from_millis(event.view_offset_millis)
        );

        self.apply(
            SessionUpdate {
                session_key: event.session_key.clone(),
                state: event.state,
                user: session.user,
                player: session.player,
                media: Some(media),
                view_offset_millis: event.view_offset_millis,
            },
            false,
        );

        ReconcileOutcome::Applied {
            session_key: event.session_key,
        }
    }

    /// The session list could not be fetched: keep the asserted state, drop
    /// all enrichment.
    fn degrade_unreachable(&self, event: ValidNotification, reason: String) -> ReconcileOutcome {
        let error = ReconcileError::Transport {
            session_key: event.session_key.clone(),
            reason,
        };
        log::warn!("[Reconciler] Degraded update ({}): {}", error.code(), error);

        self.apply(
            SessionUpdate::bare(&event.session_key, event.state, event.view_offset_millis),
            true,
        );

        ReconcileOutcome::Degraded {
            session_key: event.session_key,
            reason: error,
        }
    }

    /// The session is gone from the authoritative list: record it as stopped.
    fn degrade_vanished(&self, event: ValidNotification) -> ReconcileOutcome {
        let error = ReconcileError::SessionVanished {
            session_key: event.session_key.clone(),
        };
        log::info!(
            "[Reconciler] {} ({}, notified state {}); recording as stopped",
            error,
            error.code(),
            event.state
        );

        self.apply(
            SessionUpdate::bare(
                &event.session_key,
                SessionState::Stopped,
                event.view_offset_millis,
            ),
            true,
        );

        ReconcileOutcome::Degraded {
            session_key: event.session_key,
            reason: error,
        }
    }

    /// Metadata lookup failed: apply user and player details without media.
    fn degrade_without_media(
        &self,
        event: ValidNotification,
        session: CurrentSession,
        media_id: String,
        cause: SourceError,
    ) -> ReconcileOutcome {
        let error = ReconcileError::MetadataUnavailable {
            session_key: event.session_key.clone(),
            media_id,
            reason: cause.to_string(),
        };
        log::warn!("[Reconciler] Degraded update ({}): {}", error.code(), error);

        self.apply(
            SessionUpdate {
                session_key: event.session_key.clone(),
                state: event.state,
                user: session.user,
                player: session.player,
                media: None,
                view_offset_millis: event.view_offset_millis,
            },
            true,
        );

        ReconcileOutcome::Degraded {
            session_key: event.session_key,
            reason: error,
        }
    }

    fn apply(&self, update: SessionUpdate, degraded: bool) {
        let session = self.registry.update(update);
        let timestamp = session.last_updated;
        self.emitter.emit_registry(RegistryEvent::SessionUpdated {
            session,
            degraded,
            timestamp,
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Media Server Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the batch's session list, fetching it on first use.
    async fn current_sessions<'a>(
        &self,
        cache: &'a mut SessionListCache,
    ) -> Result<&'a [CurrentSession], String> {
        if cache.is_none() {
            let fetched = match self.bounded(self.source.list_current_sessions()).await {
                Ok(list) => {
                    self.health.record_success();
                    Ok(list)
                }
                Err(e) => {
                    self.note_failure(&e);
                    Err(e.to_string())
                }
            };
            *cache = Some(fetched);
        }

        match cache.as_ref() {
            Some(Ok(list)) => Ok(list.as_slice()),
            Some(Err(reason)) => Err(reason.clone()),
            None => Err("session list unavailable".to_string()),
        }
    }

    /// Applies the lookup timeout to a query.
    async fn bounded<T, F>(&self, query: F) -> SourceResult<T>
    where
        F: Future<Output = SourceResult<T>>,
    {
        match tokio::time::timeout(self.lookup_timeout, query).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(self.lookup_timeout)),
        }
    }

    fn note_failure(&self, error: &SourceError) {
        log::debug!(
            "[Reconciler] Media server query failed ({}): {}",
            error.code(),
            error
        );
        if error.is_transport() {
            self.health.record_failure(&error.to_string());
        } else if matches!(error, SourceError::NotFound(_)) {
            // The server answered; it just lacks the item
            self.health.record_success();
        }
    }
}
