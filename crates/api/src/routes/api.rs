use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use common::normalize_symbol;

use crate::{auth::require_auth, error::ApiError, AppState};

const DEFAULT_SAMPLE_LIMIT: i64 = 50;
const MAX_SAMPLE_LIMIT: i64 = 500;

pub fn api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/alarms", get(get_alarms))
        .route("/api/prices/:symbol", get(get_prices))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

// ─── Alarms ───────────────────────────────────────────────────────────────────

async fn get_alarms(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let alarms = state.store.list_active_alarms().await?;
    Ok(Json(json!({
        "alarms": alarms,
        "total_active": alarms.len(),
    })))
}

// ─── Price history ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct PricesQuery {
    limit: Option<i64>,
}

async fn get_prices(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(q): Query<PricesQuery>,
) -> Result<Json<Value>, ApiError> {
    let symbol = normalize_symbol(&symbol);
    let limit = q.limit.unwrap_or(DEFAULT_SAMPLE_LIMIT).clamp(1, MAX_SAMPLE_LIMIT);

    let samples = state.store.recent_price_samples(&symbol, limit).await?;
    Ok(Json(json!({
        "symbol": symbol,
        "samples": samples,
        "limit": limit,
    })))
}
