//! Liveness answer on the root path.

use axum::Json;

use crate::response::RootResponse;

/// GET / - Always `{"ok": true}`.
pub async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse { ok: true })
}
