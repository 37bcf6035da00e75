use chatdebate_core::DebateId;
use serde::{Deserialize, Serialize};

/// Parameters for starting a debate, matching the `/debate/start` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConfig {
    pub room: String,
    pub agent_a_id: String,
    pub agent_b_id: String,
    pub topic: String,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    #[serde(default = "default_max_duration")]
    pub max_duration: u64,
}

fn default_max_rounds() -> u32 {
    6
}

fn default_max_duration() -> u64 {
    90
}

/// Why a debate stopped running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    Manual,
    MaxRounds,
    MaxDuration,
    TurnTimeout,
    LlmError,
    Error,
}

impl TerminationReason {
    /// The string carried in the final `llm_debate_stopped` frame's `meta.reason`.
    pub fn as_meta_str(&self, provider: Option<&str>) -> String {
        match self {
            TerminationReason::Manual => "manual".to_string(),
            TerminationReason::MaxRounds => "max_rounds".to_string(),
            TerminationReason::MaxDuration => "max_duration".to_string(),
            TerminationReason::TurnTimeout => "turn_timeout".to_string(),
            TerminationReason::LlmError => {
                format!("llm_error_{}", provider.unwrap_or("unknown"))
            }
            TerminationReason::Error => "error".to_string(),
        }
    }
}

/// Snapshot of a running debate's progress, for `/debate/{id}` style inspection.
#[derive(Debug, Clone, Serialize)]
pub struct DebateStatus {
    pub debate_id: String,
    pub room: String,
    pub current_round: u32,
    pub max_rounds: u32,
    pub is_active: bool,
}

impl DebateStatus {
    pub fn new(id: &DebateId, room: &str, current_round: u32, max_rounds: u32, is_active: bool) -> Self {
        Self {
            debate_id: id.as_str().to_string(),
            room: room.to_string(),
            current_round,
            max_rounds,
            is_active,
        }
    }
}
