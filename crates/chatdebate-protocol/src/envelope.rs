use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The universal envelope flowing through the room fabric (see data model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: FrameType,
    pub room: String,
    pub user: UserRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub ts: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default = "default_meta")]
    pub meta: Value,
}

fn default_meta() -> Value {
    json!({})
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameType {
    Message,
    System,
    Typing,
    Presence,
    Error,
}

impl FrameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameType::Message => "message",
            FrameType::System => "system",
            FrameType::Typing => "typing",
            FrameType::Presence => "presence",
            FrameType::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: None,
        }
    }

    pub fn system() -> Self {
        Self::new("system", "System")
    }

    /// Canonical presence-set member: identity only, so join/leave stay
    /// symmetric regardless of display-name or avatar changes in between.
    pub fn presence_key(&self) -> Value {
        json!({ "id": self.id })
    }
}

impl Message {
    pub fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    pub fn system(room: impl Into<String>, content: impl Into<String>, meta: Value) -> Self {
        Self {
            kind: FrameType::System,
            room: room.into(),
            user: UserRef::system(),
            content: Some(content.into()),
            ts: Self::now_ms(),
            client_id: None,
            meta,
        }
    }

    pub fn error(room: impl Into<String>, code: &str, reason: impl Into<String>) -> Self {
        Self {
            kind: FrameType::Error,
            room: room.into(),
            user: UserRef::system(),
            content: Some(reason.into()),
            ts: Self::now_ms(),
            client_id: None,
            meta: json!({ "code": code }),
        }
    }
}
