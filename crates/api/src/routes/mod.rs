//! API routes.

pub mod health;
pub mod readings;
pub mod root;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use pipeline_core::limits::MAX_BODY_SIZE_BYTES;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Creates the relay router.
///
/// Only the configured variant's data endpoint is mounted. Methods other
/// than POST on it get a JSON 400 instead of axum's bare 405. Buffering
/// stops at the body limit, so an oversized body is never read in full.
pub fn router(state: AppState) -> Router {
    let readings = post(readings::readings_handler)
        .fallback(readings::method_not_allowed)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE_BYTES));

    Router::new()
        .route("/", get(root::root_handler))
        .route(state.variant.path(), readings)
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
