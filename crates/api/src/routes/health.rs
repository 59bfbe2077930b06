//! Probes for the orchestrator.

use axum::{http::StatusCode, Json};
use telemetry::health;

use crate::response::HealthResponse;

fn check_status(ok: bool) -> StatusCode {
    if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health. Always 200; the body says what is wrong.
pub async fn health_handler() -> Json<HealthResponse> {
    let registry = health();
    let report = registry.report();

    Json(HealthResponse {
        status: report.status.as_str().to_string(),
        redpanda_connected: registry.redpanda.is_healthy(),
        components: report.components,
    })
}

/// GET /health/ready. 503 until a publish or the startup check succeeds.
pub async fn ready_handler() -> StatusCode {
    check_status(health().is_ready())
}

/// GET /health/live
pub async fn live_handler() -> StatusCode {
    check_status(health().is_alive())
}
