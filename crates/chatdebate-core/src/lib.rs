pub mod config;
pub mod error;
pub mod types;

pub use error::{ChatError, Result};
pub use types::{ClientId, DebateId, RoomId, UserId};
