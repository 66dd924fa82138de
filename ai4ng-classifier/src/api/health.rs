//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: i64,
}

/// GET /health
///
/// Does not require a caller identity.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = ai4ng_common::time::now() - state.startup_time;
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "ai4ng-classifier".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds().max(0),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
