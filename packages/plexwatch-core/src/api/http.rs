//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to services for business logic.

use axum::{
    body::Body,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::api::response::{api_accepted, api_error, api_ok, api_success};
use crate::api::AppState;
use crate::error::{PlexwatchError, PlexwatchResult};
use crate::events::SourceHealth;
use crate::plex::types::NotificationEnvelope;
use crate::protocol_constants::{MAX_NOTIFY_BODY_SIZE, PLAYING_NOTIFICATION_TYPE, SERVICE_ID};
use crate::types::{PlaybackNotification, SessionRecord};

// ─────────────────────────────────────────────────────────────────────────────
// Notification Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Extracts playback notifications from a push message body.
///
/// Returns `Ok(None)` for messages of other categories (timeline, activity, ...).
fn playback_notifications(body: &[u8]) -> Result<Option<Vec<PlaybackNotification>>, String> {
    let envelope: NotificationEnvelope =
        serde_json::from_slice(body).map_err(|e| format!("invalid notification JSON: {}", e))?;
    let container = envelope.notification_container;

    if container.kind != PLAYING_NOTIFICATION_TYPE {
        return Ok(None);
    }

    let notifications = container
        .entries()
        .enumerate()
        .filter_map(|(index, entry)| match entry {
            Ok(entry) => Some(PlaybackNotification::from(entry)),
            Err(e) => {
                log::warn!("[Notify] Skipping undecodable entry {}: {}", index, e);
                None
            }
        })
        .collect();

    Ok(Some(notifications))
}

// ─────────────────────────────────────────────────────────────────────────────
// Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionsResponse {
    server_name: String,
    machine_id: String,
    sessions: Vec<SessionRecord>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/{key}", get(get_session))
        .route("/plex/notify", post(handle_notify))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness probe: "Is the process running?"
///
/// Always returns 200 OK if the server is responding. Use `/ready` for
/// readiness checks that include media server health.
async fn health_check(State(state): State<AppState>) -> Response {
    api_success(json!({
        "status": "ok",
        "service": SERVICE_ID,
        "sessions": state.registry.len(),
        "retentionSecs": state.config.retention_secs,
    }))
}

/// Readiness probe: "Can the service handle notifications?"
///
/// Returns 200 OK only when:
/// - The notification listener is running
/// - The media server is not degraded
///
/// Returns 503 Service Unavailable with details when not ready.
async fn readiness_check(State(state): State<AppState>) -> Response {
    let health = state.health.get();
    let listener_ready = !state.notifications.is_closed();
    let source_ready = health.health == SourceHealth::Ok;
    let ready = listener_ready && source_ready;

    let body = json!({
        "status": if ready { "ready" } else { "not_ready" },
        "ready": ready,
        "checks": {
            "listener": { "ready": listener_ready },
            "mediaServer": { "ready": source_ready, "health": health },
        }
    });

    if ready {
        api_success(body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
    }
}

async fn list_sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    Json(SessionsResponse {
        server_name: state.registry.server_name().to_string(),
        machine_id: state.registry.machine_id().to_string(),
        sessions: state.registry.snapshot(),
    })
}

async fn get_session(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> PlexwatchResult<Json<SessionRecord>> {
    state
        .registry
        .get(&key)
        .map(Json)
        .ok_or(PlexwatchError::SessionNotFound(key))
}

/// Push notification ingress.
///
/// Playback batches are queued for the listener and acknowledged with 202;
/// other notification categories are acknowledged and ignored.
async fn handle_notify(State(state): State<AppState>, body: Body) -> PlexwatchResult<Response> {
    let body_bytes = axum::body::to_bytes(body, MAX_NOTIFY_BODY_SIZE)
        .await
        .map_err(|e| {
            log::warn!("[Notify] Failed to read body: {}", e);
            PlexwatchError::InvalidRequest("Failed to read body".into())
        })?;

    let batch = match playback_notifications(&body_bytes) {
        Ok(Some(batch)) => batch,
        Ok(None) => {
            log::trace!("[Notify] Ignoring non-playback notification");
            return Ok(api_ok());
        }
        Err(e) => {
            log::warn!("[Notify] {}", e);
            return Ok(api_error(StatusCode::BAD_REQUEST, "invalid_notification", e));
        }
    };

    let count = batch.len();
    state.notifications.try_send(batch).map_err(|e| {
        log::warn!("[Notify] Rejecting batch of {}: {}", count, e);
        PlexwatchError::Unavailable(e.to_string())
    })?;

    log::debug!("[Notify] Queued {} playback notification(s)", count);
    Ok(api_accepted(count))
}
