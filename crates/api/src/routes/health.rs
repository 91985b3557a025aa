//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::orders::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Which order store backs this instance: `"postgres"` or `"memory"`.
    pub order_store: &'static str,
}

/// GET /health: liveness plus the configured store backend.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        order_store: state.store_backend,
    })
}
