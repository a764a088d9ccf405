//! JSON response helpers shared by the HTTP handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

/// 200 OK with `{"success": true, ...data}` when `data` is an object.
pub fn api_success<T: Serialize>(data: T) -> Response {
    let mut body = json!({ "success": true });
    match serde_json::to_value(data) {
        Ok(serde_json::Value::Object(fields)) => {
            if let Some(obj) = body.as_object_mut() {
                obj.extend(fields);
            }
        }
        Ok(other) => body["data"] = other,
        Err(e) => {
            return api_error(StatusCode::INTERNAL_SERVER_ERROR, "serialization_failed", e);
        }
    }
    (StatusCode::OK, Json(body)).into_response()
}

/// 200 OK with `{"success": true}`.
pub fn api_ok() -> Response {
    (StatusCode::OK, Json(json!({ "success": true }))).into_response()
}

/// 202 Accepted with `{"success": true, "accepted": n}`.
pub fn api_accepted(accepted: usize) -> Response {
    (
        StatusCode::ACCEPTED,
        Json(json!({ "success": true, "accepted": accepted })),
    )
        .into_response()
}

/// Error response with `{error, message, status}`.
pub fn api_error(status: StatusCode, code: &str, message: impl std::fmt::Display) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.to_string(),
            "status": status.as_u16(),
        })),
    )
        .into_response()
}
