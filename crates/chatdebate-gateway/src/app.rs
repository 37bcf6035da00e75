use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use chatdebate_agent::AgentRegistry;
use chatdebate_core::config::AppConfig;
use chatdebate_debate::DebateOrchestrator;
use chatdebate_hub::Hub;
use chatdebate_room::RoomStore;

use crate::auth::{GuestOnlyVerifier, TokenVerifier};

/// Central shared state, passed as `Arc<AppState>` to every handler.
pub struct AppState {
    pub config: AppConfig,
    pub room_store: Arc<RoomStore>,
    pub agents: Arc<AgentRegistry>,
    pub debates: Arc<DebateOrchestrator>,
    pub hub: Hub,
    pub verifier: Box<dyn TokenVerifier>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        room_store: Arc<RoomStore>,
        agents: Arc<AgentRegistry>,
        debates: Arc<DebateOrchestrator>,
    ) -> Self {
        let hub = Hub::new(room_store.clone(), debates.clone());
        Self {
            config,
            room_store,
            agents,
            debates,
            hub,
            verifier: Box::new(GuestOnlyVerifier),
        }
    }
}

/// Assembles the full Axum router: the control-plane HTTP surface plus the
/// `/ws` upgrade endpoint.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = crate::http::cors_layer(&state.config.server.allowed_origins);

    Router::new()
        .route("/", get(crate::http::root::root_handler))
        .route("/health", get(crate::http::health::health_handler))
        .route("/llm/status", get(crate::http::debate::llm_status_handler))
        .route("/agents", get(crate::http::debate::agents_handler))
        .route("/debate/start", post(crate::http::debate::start_debate_handler))
        .route("/debate/{id}/stop", post(crate::http::debate::stop_debate_handler))
        .route("/auth/login", post(crate::http::login::login_handler))
        .route("/stats", get(crate::http::health::stats_handler))
        .route("/ws", get(crate::ws::ws_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors)
}
