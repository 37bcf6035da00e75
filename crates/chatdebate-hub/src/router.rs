use chatdebate_core::config::MAX_MESSAGE_LEN;
use chatdebate_core::{DebateId, RoomId};
use chatdebate_debate::{DebateConfig, DebateOrchestrator};
use chatdebate_protocol::envelope::{FrameType, Message, UserRef};
use chatdebate_protocol::sanitize::sanitize_content;
use chatdebate_protocol::validate::content_too_long;
use chatdebate_room::RoomStore;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

/// What the client actually sends over the wire: the session (established
/// at connect) already pins `room` and `user`, so only these fields travel
/// per-frame.
#[derive(Deserialize)]
struct ClientFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    meta: Value,
}

/// Runs one inbound frame through the parse/validate/sanitize/rate-limit/
/// dispatch pipeline. Returns `Some(error_frame)` when the frame produced a
/// client-facing error that must be unicast back to the originating
/// session; `None` means the frame was handled (published, forwarded, or
/// silently ignored).
pub async fn route_inbound(
    room_store: &RoomStore,
    debates: &DebateOrchestrator,
    room: &RoomId,
    user: &UserRef,
    raw: &str,
) -> Option<Message> {
    let frame: ClientFrame = match serde_json::from_str(raw) {
        Ok(f) => f,
        Err(e) => {
            return Some(Message::error(room.as_str(), "invalid_json", e.to_string()));
        }
    };

    match frame.kind.as_str() {
        "message" => route_message(room_store, room, user, frame).await,
        "typing" => {
            route_typing(room_store, room, user, frame).await;
            None
        }
        "system" => route_system(debates, room, frame).await,
        other => Some(Message::error(
            room.as_str(),
            "unknown_type",
            format!("unrecognized frame type '{other}'"),
        )),
    }
}

async fn route_message(
    room_store: &RoomStore,
    room: &RoomId,
    user: &UserRef,
    frame: ClientFrame,
) -> Option<Message> {
    let content = match frame.content {
        Some(c) if !c.is_empty() => c,
        _ => {
            return Some(Message::error(
                room.as_str(),
                "invalid_payload",
                "content is required for type=message",
            ));
        }
    };
    if content_too_long(&content) {
        return Some(Message::error(
            room.as_str(),
            "message_too_long",
            format!("message exceeds {MAX_MESSAGE_LEN} characters"),
        ));
    }

    let verdict = room_store.check_rate_limit(room, &user.id).await;
    if !verdict.allowed {
        let mut err = Message::error(room.as_str(), "rate_limited", "rate limit exceeded");
        err.meta = json!({ "code": "rate_limited", "reset_in": verdict.reset_in });
        return Some(err);
    }

    let sanitized = sanitize_content(&content);
    let msg = Message {
        kind: FrameType::Message,
        room: room.as_str().to_string(),
        user: user.clone(),
        content: Some(sanitized),
        ts: Message::now_ms(),
        client_id: frame.client_id,
        meta: json!({}),
    };
    room_store.append_history(room, &msg).await;
    room_store.publish(room, &msg).await;
    room_store.clear_typing(room, &user.id).await;
    None
}

async fn route_typing(room_store: &RoomStore, room: &RoomId, user: &UserRef, frame: ClientFrame) {
    if frame.content.as_deref() == Some("started") {
        room_store.start_typing(room, &user.id, &user.name).await;
    } else {
        room_store.clear_typing(room, &user.id).await;
    }

    let typing_users = room_store.typing_snapshot(room).await;
    let typing_msg = Message {
        kind: FrameType::Typing,
        room: room.as_str().to_string(),
        user: UserRef::system(),
        content: None,
        ts: Message::now_ms(),
        client_id: None,
        meta: json!({ "typing_users": typing_users }),
    };
    room_store.publish(room, &typing_msg).await;
}

async fn route_system(debates: &DebateOrchestrator, room: &RoomId, frame: ClientFrame) -> Option<Message> {
    let action = frame.meta.get("action").and_then(Value::as_str).unwrap_or("");
    match action {
        "llm_debate_start" => {
            let Some(config) = parse_debate_config(room, &frame.meta) else {
                return Some(Message::error(
                    room.as_str(),
                    "debate_start_failed",
                    "missing or invalid debate configuration",
                ));
            };
            if let Err(e) = debates.start(config).await {
                warn!(room = %room, error = %e, "debate start failed");
                return Some(Message::error(room.as_str(), "debate_start_failed", e.to_string()));
            }
            None
        }
        "llm_debate_stop" => {
            if let Some(id) = frame.meta.get("debate_id").and_then(Value::as_str) {
                debates.stop(&DebateId::from(id));
            }
            None
        }
        _ => None,
    }
}

fn parse_debate_config(room: &RoomId, meta: &Value) -> Option<DebateConfig> {
    let agent_a_id = meta.get("agent_a_id")?.as_str()?.to_string();
    let agent_b_id = meta.get("agent_b_id")?.as_str()?.to_string();
    let topic = meta.get("topic")?.as_str()?.to_string();
    let max_rounds = meta
        .get("max_rounds")
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .unwrap_or(6);
    let max_duration = meta.get("max_duration").and_then(Value::as_u64).unwrap_or(90);
    Some(DebateConfig {
        room: room.as_str().to_string(),
        agent_a_id,
        agent_b_id,
        topic,
        max_rounds,
        max_duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdebate_agent::AgentRegistry;
    use chatdebate_backplane::local::LocalBackplane;
    use chatdebate_core::config::AppConfig;
    use std::sync::Arc;
    use std::time::Duration;

    fn deps() -> (RoomStore, DebateOrchestrator) {
        let backplane = Arc::new(LocalBackplane::new());
        let room_store = RoomStore::new(backplane);
        let config = AppConfig::default();
        let registry = Arc::new(AgentRegistry::from_config(&config));
        let orchestrator_store = Arc::new(RoomStore::new(Arc::new(LocalBackplane::new())));
        let debates = DebateOrchestrator::new(orchestrator_store, registry, Duration::from_secs(15));
        (room_store, debates)
    }

    #[tokio::test]
    async fn malformed_json_produces_invalid_json_error() {
        let (room_store, debates) = deps();
        let room = RoomId::new("r1");
        let user = UserRef::new("u1", "Alice");
        let err = route_inbound(&room_store, &debates, &room, &user, "not json")
            .await
            .expect("error frame");
        assert_eq!(err.meta["code"], "invalid_json");
    }

    #[tokio::test]
    async fn empty_content_is_invalid_payload() {
        let (room_store, debates) = deps();
        let room = RoomId::new("r1");
        let user = UserRef::new("u1", "Alice");
        let raw = r#"{"type":"message","content":""}"#;
        let err = route_inbound(&room_store, &debates, &room, &user, raw)
            .await
            .expect("error frame");
        assert_eq!(err.meta["code"], "invalid_payload");
    }

    #[tokio::test]
    async fn overlong_message_is_rejected() {
        let (room_store, debates) = deps();
        let room = RoomId::new("r1");
        let user = UserRef::new("u1", "Alice");
        let content = "a".repeat(1001);
        let raw = serde_json::json!({"type": "message", "content": content}).to_string();
        let err = route_inbound(&room_store, &debates, &room, &user, &raw)
            .await
            .expect("error frame");
        assert_eq!(err.meta["code"], "message_too_long");
    }

    #[tokio::test]
    async fn unknown_type_is_rejected() {
        let (room_store, debates) = deps();
        let room = RoomId::new("r1");
        let user = UserRef::new("u1", "Alice");
        let raw = r#"{"type":"bogus"}"#;
        let err = route_inbound(&room_store, &debates, &room, &user, raw)
            .await
            .expect("error frame");
        assert_eq!(err.meta["code"], "unknown_type");
    }

    #[tokio::test]
    async fn valid_message_is_published_and_sanitized() {
        let (room_store, debates) = deps();
        let room = RoomId::new("r1");
        let user = UserRef::new("u1", "Alice");
        let raw = serde_json::json!({"type": "message", "content": "<b>hi</b>"}).to_string();
        let out = route_inbound(&room_store, &debates, &room, &user, &raw).await;
        assert!(out.is_none());
        let history = room_store.read_history(&room).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content.as_deref(), Some("&lt;b&gt;hi&lt;/b&gt;"));
    }

    #[tokio::test]
    async fn unknown_debate_agent_produces_debate_start_failed() {
        let (room_store, debates) = deps();
        let room = RoomId::new("r1");
        let user = UserRef::new("u1", "Alice");
        let raw = serde_json::json!({
            "type": "system",
            "meta": {
                "action": "llm_debate_start",
                "agent_a_id": "does-not-exist",
                "agent_b_id": "mock-b",
                "topic": "T",
            }
        })
        .to_string();
        let err = route_inbound(&room_store, &debates, &room, &user, &raw)
            .await
            .expect("error frame");
        assert_eq!(err.meta["code"], "debate_start_failed");
    }

    #[tokio::test]
    async fn missing_debate_config_fields_produce_debate_start_failed() {
        let (room_store, debates) = deps();
        let room = RoomId::new("r1");
        let user = UserRef::new("u1", "Alice");
        let raw = serde_json::json!({
            "type": "system",
            "meta": { "action": "llm_debate_start" }
        })
        .to_string();
        let err = route_inbound(&room_store, &debates, &room, &user, &raw)
            .await
            .expect("error frame");
        assert_eq!(err.meta["code"], "debate_start_failed");
    }

    #[tokio::test]
    async fn typing_started_then_cleared_by_message() {
        let (room_store, debates) = deps();
        let room = RoomId::new("r1");
        let user = UserRef::new("u1", "Alice");
        let typing_raw = r#"{"type":"typing","content":"started"}"#;
        route_inbound(&room_store, &debates, &room, &user, typing_raw).await;
        assert_eq!(room_store.typing_snapshot(&room).await.len(), 1);

        let msg_raw = serde_json::json!({"type": "message", "content": "hi"}).to_string();
        route_inbound(&room_store, &debates, &room, &user, &msg_raw).await;
        assert_eq!(room_store.typing_snapshot(&room).await.len(), 0);
    }
}
