use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

pub fn health_router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

/// Health check endpoint, no auth required.
async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let status = state.scheduler.status().await;
    Json(json!({
        "status": "ok",
        "scheduler": status,
        "interval_secs": state.scheduler.interval().as_secs(),
    }))
}
