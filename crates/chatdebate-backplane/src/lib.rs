//! §4.A backplane adapter: the minimum publish/subscribe and keyed
//! list/set/string-with-TTL surface the rest of the system needs, plus two
//! implementations of it (redis-backed and in-process).

pub mod local;
pub mod redis_backend;
mod subscription;

pub use subscription::Subscription;

use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, BackplaneError>;

#[derive(Debug, thiserror::Error)]
pub enum BackplaneError {
    #[error("backplane command failed: {0}")]
    Command(String),
}

/// Everything above this trait is backplane-agnostic. See `SPEC_FULL.md` §4.A
/// for the exact contract each method must honor, including the
/// degrade-to-no-op behavior when `connected()` is false.
#[async_trait]
pub trait Backplane: Send + Sync {
    fn connected(&self) -> bool;

    async fn publish(&self, channel: &str, payload: &str) -> Result<()>;
    async fn subscribe(&self, channel: &str) -> Result<Subscription>;

    /// Atomic prepend then trim to `[0, maxlen-1]` (newest-first storage).
    async fn list_push_front_trim(&self, key: &str, item: &str, maxlen: usize) -> Result<()>;
    /// Newest-first slice of up to `maxlen` items.
    async fn list_range(&self, key: &str, maxlen: usize) -> Result<Vec<String>>;

    async fn set_add(&self, key: &str, member: &str) -> Result<()>;
    async fn set_remove(&self, key: &str, member: &str) -> Result<()>;
    async fn set_members(&self, key: &str) -> Result<Vec<String>>;
    async fn set_card(&self, key: &str) -> Result<usize>;

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn delete(&self, key: &str) -> Result<()>;
    /// Seconds remaining before `key` expires, `None` if it has no TTL or doesn't exist.
    async fn ttl(&self, key: &str) -> Result<Option<i64>>;
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()>;
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;
}
