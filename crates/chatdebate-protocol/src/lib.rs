pub mod envelope;
pub mod sanitize;
pub mod validate;

pub use envelope::{FrameType, Message, UserRef};
