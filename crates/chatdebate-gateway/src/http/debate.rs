use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chatdebate_core::DebateId;
use chatdebate_debate::DebateConfig;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::app::AppState;

#[derive(Serialize)]
struct AgentSummary {
    id: String,
    name: String,
    provider: &'static str,
    model: String,
    available: bool,
}

/// `GET /llm/status` — running debates and the agent roster.
pub async fn llm_status_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let active_debates = state.debates.active_debates();
    let available_agents = agent_summaries(&state);
    Json(json!({
        "active_debates": active_debates,
        "total_agents": available_agents.len(),
        "available_agents": available_agents,
    }))
}

/// `GET /agents` — the full agent roster, with provider availability.
pub async fn agents_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let agents = agent_summaries(&state);
    let total_available = agents.iter().filter(|a| a.available).count();
    Json(json!({ "agents": agents, "total_available": total_available }))
}

fn agent_summaries(state: &AppState) -> Vec<AgentSummary> {
    state
        .agents
        .available_agents()
        .into_iter()
        .map(|a| AgentSummary {
            id: a.id.clone(),
            name: a.name.clone(),
            provider: a.provider.as_str(),
            model: a.model.clone(),
            available: state.agents.is_agent_available(a),
        })
        .collect()
}

#[derive(Serialize)]
pub struct DebateError {
    error: String,
}

/// `POST /debate/start` — looks up both agents and launches the turn loop.
/// Rejects with 400 if either agent id is unknown.
pub async fn start_debate_handler(
    State(state): State<Arc<AppState>>,
    Json(config): Json<DebateConfig>,
) -> Result<Json<Value>, (StatusCode, Json<DebateError>)> {
    let room = config.room.clone();
    let topic = config.topic.clone();
    match state.debates.start(config).await {
        Ok(debate_id) => Ok(Json(json!({
            "debate_id": debate_id.as_str(),
            "status": "started",
            "room": room,
            "topic": topic,
        }))),
        Err(e) => {
            warn!(error = %e, "POST /debate/start failed");
            Err((
                StatusCode::BAD_REQUEST,
                Json(DebateError { error: e.to_string() }),
            ))
        }
    }
}

/// `POST /debate/{id}/stop` — always 200, idempotent even for an unknown id.
pub async fn stop_debate_handler(
    State(state): State<Arc<AppState>>,
    Path(debate_id): Path<String>,
) -> Json<Value> {
    state.debates.stop(&DebateId::from(debate_id.as_str()));
    Json(json!({ "status": "stopped", "debate_id": debate_id }))
}
