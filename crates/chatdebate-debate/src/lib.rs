pub mod engine;
pub mod stats;
pub mod types;

pub use engine::DebateOrchestrator;
pub use stats::StatsSnapshot;
pub use types::{DebateConfig, DebateStatus, TerminationReason};
