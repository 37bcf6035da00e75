use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("inbound frame not parseable: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("envelope validation failed: {0}")]
    InvalidPayload(String),

    #[error("message too long: {len} chars (max {max})")]
    MessageTooLong { len: usize, max: usize },

    #[error("rate limited, retry in {reset_in}s")]
    RateLimited { reset_in: f64 },

    #[error("unrecognized frame type: {0}")]
    UnknownType(String),

    #[error("debate start failed: {0}")]
    DebateStartFailed(String),

    #[error("agent not found: {id}")]
    AgentNotFound { id: String },

    #[error("backplane unavailable: {0}")]
    BackplaneUnavailable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// Wire error code, as carried in `meta.code` on `error` frames (§7).
    /// Variants with no client-facing wire representation return `None`.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ChatError::InvalidJson(_) => Some("invalid_json"),
            ChatError::InvalidPayload(_) => Some("invalid_payload"),
            ChatError::MessageTooLong { .. } => Some("message_too_long"),
            ChatError::RateLimited { .. } => Some("rate_limited"),
            ChatError::UnknownType(_) => Some("unknown_type"),
            ChatError::DebateStartFailed(_) | ChatError::AgentNotFound { .. } => {
                Some("debate_start_failed")
            }
            ChatError::Config(_)
            | ChatError::BackplaneUnavailable(_)
            | ChatError::Io(_)
            | ChatError::Internal(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
