//! Health check endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::server::app::AppState;

/// GET /health - liveness and a connection-count snapshot
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let active_sessions = state.registry.active_count().await;
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "active_sessions": active_sessions,
        })),
    )
}
