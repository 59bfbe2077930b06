//! Response bodies and the error type handlers return.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use telemetry::ComponentHealthReport;
use tracing::{debug, error};

/// Body of `GET /`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub ok: bool,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub redpanda_connected: bool,
    pub components: Vec<ComponentHealthReport>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// API error rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<pipeline_core::Error> for ApiError {
    fn from(err: pipeline_core::Error) -> Self {
        let status = StatusCode::from_u16(err.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", err);
        } else {
            debug!(status = status.as_u16(), "Request rejected: {}", err);
        }

        ApiError::new(status, err.to_string())
    }
}
