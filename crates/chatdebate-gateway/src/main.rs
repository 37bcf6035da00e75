use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

mod app;
mod auth;
mod http;
mod ws;

use chatdebate_agent::AgentRegistry;
use chatdebate_backplane::local::LocalBackplane;
use chatdebate_backplane::redis_backend::RedisBackplane;
use chatdebate_backplane::Backplane;
use chatdebate_core::config::AppConfig;
use chatdebate_debate::DebateOrchestrator;
use chatdebate_room::RoomStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatdebate_gateway=info,tower_http=debug".into()),
        )
        .init();

    let config_path = std::env::var("CHATDEBATE_CONFIG").unwrap_or_else(|_| "agents.yaml".to_string());
    let config = AppConfig::load(&config_path).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let backplane: Arc<dyn Backplane> = match &config.server.backplane_url {
        Some(url) => Arc::new(RedisBackplane::connect(url).await),
        None => Arc::new(LocalBackplane::new()),
    };

    let room_store = Arc::new(RoomStore::with_config(
        backplane,
        config.server.rate_limit.clone(),
        config.server.history.clone(),
    ));
    let agents = Arc::new(AgentRegistry::from_config(&config));
    let turn_timeout = Duration::from_secs(config.debate_settings.turn_timeout);
    let debates = Arc::new(DebateOrchestrator::new(
        room_store.clone(),
        agents.clone(),
        turn_timeout,
    ));

    let bind_addr = config.server.bind_addr.clone();
    let state = Arc::new(app::AppState::new(config, room_store, agents, debates));
    let router = app::build_router(state);

    let addr: SocketAddr = bind_addr.parse()?;
    info!("chatdebate gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
