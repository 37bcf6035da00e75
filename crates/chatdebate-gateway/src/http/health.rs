use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// `GET /health` — liveness probe.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /stats` — supplemental observability endpoint, not part of the core
/// client contract. Exposes the orchestrator's running totals for operators.
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let stats = state.debates.stats();
    Json(serde_json::to_value(stats).unwrap_or(json!({})))
}
