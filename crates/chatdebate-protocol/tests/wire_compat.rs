use chatdebate_protocol::envelope::{FrameType, Message, UserRef};
use chatdebate_protocol::sanitize::sanitize_content;
use serde_json::json;

#[test]
fn message_frame_serializes_with_lowercase_type() {
    let msg = Message {
        kind: FrameType::Message,
        room: "r1".to_string(),
        user: UserRef::new("u1", "Alice"),
        content: Some("hello".to_string()),
        ts: 1_700_000_000_000,
        client_id: Some("c-1".to_string()),
        meta: json!({}),
    };
    let s = serde_json::to_string(&msg).unwrap();
    assert!(s.contains("\"type\":\"message\""));
    assert!(s.contains("\"room\":\"r1\""));
    assert!(s.contains("\"client_id\":\"c-1\""));
}

#[test]
fn omits_optional_fields_when_absent() {
    let msg = Message::system("r1", "u1 joined", json!({}));
    let s = serde_json::to_string(&msg).unwrap();
    assert!(!s.contains("client_id"));
}

#[test]
fn parses_inbound_client_frame() {
    let raw = r#"{"type":"message","room":"r1","user":{"id":"u1","name":"Alice"},"content":"hi","ts":0}"#;
    let msg: Message = serde_json::from_str(raw).unwrap();
    match msg.kind {
        FrameType::Message => assert_eq!(msg.content.as_deref(), Some("hi")),
        other => panic!("expected message frame, got {other:?}"),
    }
}

#[test]
fn rejects_unknown_frame_type() {
    let raw = r#"{"type":"bogus","room":"r1","user":{"id":"u1","name":"A"},"ts":0}"#;
    let result: Result<Message, _> = serde_json::from_str(raw);
    assert!(result.is_err());
}

#[test]
fn agent_message_meta_round_trips() {
    let meta = json!({
        "agent": true,
        "provider": "mock",
        "model": "mock-1",
        "debate_id": "d-1",
        "current_round": 1,
        "total_rounds": 6,
        "tokens_used": 12,
        "latency": 950,
    });
    let msg = Message {
        kind: FrameType::Message,
        room: "r1".to_string(),
        user: UserRef::new("agent:mock:mock-1", "Agent A"),
        content: Some("I disagree.".to_string()),
        ts: Message::now_ms(),
        client_id: None,
        meta: meta.clone(),
    };
    let s = serde_json::to_string(&msg).unwrap();
    let back: Message = serde_json::from_str(&s).unwrap();
    assert_eq!(back.meta, meta);
    assert!(back.user.id.starts_with("agent:"));
}

#[test]
fn xss_payload_is_fully_stripped_before_storage() {
    let out = sanitize_content("<script>alert(1)</script>hello");
    assert_eq!(out, "hello");
}
