use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chatdebate_agent::AgentRegistry;
use chatdebate_core::config::AgentConfig;
use chatdebate_core::error::{ChatError, Result};
use chatdebate_core::{DebateId, RoomId, UserId};
use chatdebate_protocol::envelope::{Message, UserRef};
use chatdebate_room::RoomStore;
use dashmap::DashMap;
use serde_json::json;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::stats::{Stats, StatsSnapshot};
use crate::types::{DebateConfig, DebateStatus, TerminationReason};

const INTER_TURN_DELAY: Duration = Duration::from_secs(2);

struct ActiveEntry {
    cancel: CancellationToken,
    current_round: Arc<AtomicU32>,
    max_rounds: u32,
    room: String,
}

struct Inner {
    room_store: Arc<RoomStore>,
    agents: Arc<AgentRegistry>,
    stats: Stats,
    active: DashMap<DebateId, ActiveEntry>,
    turn_timeout: Duration,
}

/// Runs debates as independent tasks and tracks their state. One instance
/// is shared across all sessions and HTTP handlers.
#[derive(Clone)]
pub struct DebateOrchestrator {
    inner: Arc<Inner>,
}

impl DebateOrchestrator {
    /// `turn_timeout` is the hard per-turn wall-clock bound (15s by default,
    /// see `debate_settings.turn_timeout`); callers needing a shorter bound
    /// for tests can pass one directly.
    pub fn new(room_store: Arc<RoomStore>, agents: Arc<AgentRegistry>, turn_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                room_store,
                agents,
                stats: Stats::default(),
                active: DashMap::new(),
                turn_timeout,
            }),
        }
    }

    /// Looks up both agents, publishes the start frame, and launches the
    /// turn loop as a detached task. Fails with no publication if either
    /// agent id is unknown.
    pub async fn start(&self, config: DebateConfig) -> Result<DebateId> {
        let agent_a = self
            .inner
            .agents
            .agent_config(&config.agent_a_id)
            .cloned()
            .ok_or_else(|| ChatError::AgentNotFound {
                id: config.agent_a_id.clone(),
            })?;
        let agent_b = self
            .inner
            .agents
            .agent_config(&config.agent_b_id)
            .cloned()
            .ok_or_else(|| ChatError::AgentNotFound {
                id: config.agent_b_id.clone(),
            })?;

        let debate_id = DebateId::new();
        let cancel = CancellationToken::new();
        let current_round = Arc::new(AtomicU32::new(0));

        self.inner.active.insert(
            debate_id.clone(),
            ActiveEntry {
                cancel: cancel.clone(),
                current_round: current_round.clone(),
                max_rounds: config.max_rounds,
                room: config.room.clone(),
            },
        );
        self.inner.stats.on_start();

        let room = RoomId::new(config.room.clone());
        let start_msg = Message::system(
            config.room.clone(),
            format!("Debate started: {}", config.topic),
            json!({
                "action": "llm_debate_started",
                "debate_id": debate_id.as_str(),
                "agent_a": agent_a.id,
                "agent_b": agent_b.id,
                "topic": config.topic,
                "max_rounds": config.max_rounds,
            }),
        );
        self.inner.room_store.publish(&room, &start_msg).await;
        self.inner.room_store.append_history(&room, &start_msg).await;

        info!(debate_id = %debate_id, room = %config.room, "debate started");

        let inner = self.inner.clone();
        let task_debate_id = debate_id.clone();
        tokio::spawn(async move {
            run_turn_loop(inner, task_debate_id, config, agent_a, agent_b, cancel, current_round).await;
        });

        Ok(debate_id)
    }

    /// Idempotent: stopping an unknown or already-ended debate is a no-op.
    pub fn stop(&self, debate_id: &DebateId) {
        if let Some(entry) = self.inner.active.get(debate_id) {
            entry.cancel.cancel();
        }
    }

    pub fn status(&self, debate_id: &DebateId) -> Option<DebateStatus> {
        self.inner.active.get(debate_id).map(|e| {
            DebateStatus::new(
                debate_id,
                &e.room,
                e.current_round.load(Ordering::SeqCst),
                e.max_rounds,
                true,
            )
        })
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot(self.inner.agents.available_providers())
    }

    /// Status of every debate currently running, across all rooms.
    pub fn active_debates(&self) -> Vec<DebateStatus> {
        self.inner
            .active
            .iter()
            .map(|entry| {
                DebateStatus::new(
                    entry.key(),
                    &entry.room,
                    entry.current_round.load(Ordering::SeqCst),
                    entry.max_rounds,
                    true,
                )
            })
            .collect()
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_turn_loop(
    inner: Arc<Inner>,
    debate_id: DebateId,
    config: DebateConfig,
    agent_a: AgentConfig,
    agent_b: AgentConfig,
    cancel: CancellationToken,
    current_round: Arc<AtomicU32>,
) {
    let room = RoomId::new(config.room.clone());
    let started_at = Instant::now();
    let mut context: Vec<String> = Vec::new();
    let mut prompt = config.topic.clone();
    let reason;
    let mut error_provider: Option<String> = None;

    'turns: loop {
        if cancel.is_cancelled() {
            reason = TerminationReason::Manual;
            break;
        }
        let round = current_round.load(Ordering::SeqCst);
        if round >= config.max_rounds {
            reason = TerminationReason::MaxRounds;
            break;
        }
        if started_at.elapsed() >= Duration::from_secs(config.max_duration) {
            reason = TerminationReason::MaxDuration;
            break;
        }

        let agent = if round % 2 == 0 { &agent_a } else { &agent_b };
        let provider = inner.agents.provider_for(agent);
        let turn_started = Instant::now();

        let call_result = tokio::select! {
            _ = cancel.cancelled() => {
                reason = TerminationReason::Manual;
                break 'turns;
            }
            res = tokio::time::timeout(inner.turn_timeout, provider.call(agent, &prompt, &context)) => res,
        };

        let latency_ms = turn_started.elapsed().as_secs_f64() * 1000.0;

        let outcome = match call_result {
            Err(_) => {
                reason = TerminationReason::TurnTimeout;
                break;
            }
            Ok(Err(e)) => {
                warn!(debate_id = %debate_id, provider = agent.provider.as_str(), error = %e, "provider call failed");
                error_provider = Some(agent.provider.as_str().to_string());
                inner.stats.on_error(agent.provider.as_str());
                reason = TerminationReason::LlmError;
                break;
            }
            Ok(Ok(resp)) => resp,
        };

        inner.stats.on_turn(agent.provider.as_str(), outcome.tokens_used, latency_ms);

        let new_round = round + 1;

        let message = Message {
            kind: chatdebate_protocol::envelope::FrameType::Message,
            room: config.room.clone(),
            user: UserRef::new(
                UserId::agent(agent.provider.as_str(), &agent.model).as_str(),
                agent.name.clone(),
            ),
            content: Some(outcome.content.clone()),
            ts: Message::now_ms(),
            client_id: None,
            meta: json!({
                "agent": true,
                "provider": agent.provider.as_str(),
                "model": agent.model,
                "debate_id": debate_id.as_str(),
                "current_round": new_round,
                "total_rounds": config.max_rounds,
                "tokens_used": outcome.tokens_used,
                "latency": latency_ms,
            }),
        };
        inner.room_store.publish(&room, &message).await;
        inner.room_store.append_history(&room, &message).await;

        context.push(outcome.content.clone());
        prompt = outcome.content;
        current_round.store(new_round, Ordering::SeqCst);

        let round_msg = Message::system(
            config.room.clone(),
            format!("Round {new_round}/{}", config.max_rounds),
            json!({
                "action": "llm_debate_round",
                "debate_id": debate_id.as_str(),
                "current_round": new_round,
                "total_rounds": config.max_rounds,
            }),
        );
        inner.room_store.publish(&room, &round_msg).await;

        tokio::select! {
            _ = cancel.cancelled() => {
                reason = TerminationReason::Manual;
                break;
            }
            _ = tokio::time::sleep(INTER_TURN_DELAY) => {}
        }
    }

    finalize(&inner, &debate_id, &room, &config, reason, error_provider.as_deref()).await;
}

async fn finalize(
    inner: &Inner,
    debate_id: &DebateId,
    room: &RoomId,
    config: &DebateConfig,
    reason: TerminationReason,
    error_provider: Option<&str>,
) {
    let stop_msg = Message::system(
        config.room.clone(),
        "Debate ended".to_string(),
        json!({
            "action": "llm_debate_stopped",
            "debate_id": debate_id.as_str(),
            "reason": reason.as_meta_str(error_provider),
        }),
    );
    inner.room_store.publish(room, &stop_msg).await;
    inner.room_store.append_history(room, &stop_msg).await;
    inner.active.remove(debate_id);
    inner.stats.on_complete();

    info!(debate_id = %debate_id, reason = %reason.as_meta_str(error_provider), "debate ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdebate_agent::AgentRegistry;
    use chatdebate_backplane::local::LocalBackplane;
    use chatdebate_core::config::AppConfig;
    use chatdebate_protocol::envelope::FrameType;

    fn orchestrator(turn_timeout: Duration) -> DebateOrchestrator {
        let config = AppConfig::default();
        let registry = Arc::new(AgentRegistry::from_config(&config));
        let room_store = Arc::new(RoomStore::new(Arc::new(LocalBackplane::new())));
        DebateOrchestrator::new(room_store, registry, turn_timeout)
    }

    fn config(max_rounds: u32) -> DebateConfig {
        DebateConfig {
            room: "r1".to_string(),
            agent_a_id: "mock-a".to_string(),
            agent_b_id: "mock-b".to_string(),
            topic: "T".to_string(),
            max_rounds,
            max_duration: 90,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn terminates_on_max_rounds() {
        let orchestrator = orchestrator(Duration::from_secs(15));
        let debate_id = orchestrator.start(config(2)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(20)).await;

        assert!(orchestrator.status(&debate_id).is_none());

        let history = orchestrator
            .inner
            .room_store
            .read_history(&RoomId::new("r1"))
            .await;
        let agent_messages: Vec<_> = history
            .iter()
            .filter(|m| m.kind == FrameType::Message)
            .collect();
        assert_eq!(agent_messages.len(), 2);
        assert_eq!(agent_messages[0].user.id, "agent:mock:mock-1");

        let stopped = history
            .iter()
            .find(|m| m.meta["action"] == "llm_debate_stopped")
            .expect("stop frame present");
        assert_eq!(stopped.meta["reason"], "max_rounds");

        let started_count = history
            .iter()
            .filter(|m| m.meta["action"] == "llm_debate_started")
            .count();
        assert_eq!(started_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn terminates_on_turn_timeout() {
        // Shorter than the mock provider's built-in ~1s latency, so the
        // first turn always misses its deadline.
        let orchestrator = orchestrator(Duration::from_millis(200));
        let debate_id = orchestrator.start(config(6)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(orchestrator.status(&debate_id).is_none());

        let history = orchestrator
            .inner
            .room_store
            .read_history(&RoomId::new("r1"))
            .await;
        let agent_messages = history.iter().filter(|m| m.kind == FrameType::Message).count();
        assert_eq!(agent_messages, 0);

        let stopped = history
            .iter()
            .find(|m| m.meta["action"] == "llm_debate_stopped")
            .expect("stop frame present");
        assert_eq!(stopped.meta["reason"], "turn_timeout");
    }

    #[tokio::test]
    async fn stop_is_idempotent_on_unknown_debate() {
        let orchestrator = orchestrator(Duration::from_secs(15));
        orchestrator.stop(&DebateId::new());
    }

    #[tokio::test(start_paused = true)]
    async fn active_debates_lists_running_debates_until_they_end() {
        let orchestrator = orchestrator(Duration::from_secs(15));
        let debate_id = orchestrator.start(config(2)).await.unwrap();

        let active = orchestrator.active_debates();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].debate_id, debate_id.as_str());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(orchestrator.active_debates().is_empty());
    }
}
