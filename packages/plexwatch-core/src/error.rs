//! Centralized error types for the Plexwatch core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::plex::http::SourceError;
use crate::services::reconciler::ReconcileError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses and logs.
    fn code(&self) -> &'static str;
}

impl ErrorCode for SourceError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::HttpStatus(_, _) => "http_error_status",
            Self::NotFound(_) => "not_found",
            Self::Timeout(_) => "timeout",
            Self::InvalidId(_) => "invalid_id",
            Self::Decode(_) => "decode_error",
        }
    }
}

impl ErrorCode for ReconcileError {
    fn code(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport_error",
            Self::SessionVanished { .. } => "session_vanished",
            Self::MetadataUnavailable { .. } => "metadata_unavailable",
            Self::MalformedEvent(_) => "malformed_event",
        }
    }
}

/// Application-wide error type for the Plexwatch server.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum PlexwatchError {
    /// Client sent an invalid or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No session with the requested key is tracked.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The notification pipeline cannot accept work right now.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Server configuration error (invalid or missing settings).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlexwatchError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::SessionNotFound(_) => "session_not_found",
            Self::Unavailable(_) => "unavailable",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) | Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type PlexwatchResult<T> = Result<T, PlexwatchError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for PlexwatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
