use async_trait::async_trait;
use chatdebate_core::config::AgentConfig;

pub struct ProviderResponse {
    pub content: String,
    pub tokens_used: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("operation cancelled")]
    Cancelled,
}

/// §4.F provider dispatch contract: `(agent, prompt, context) -> {content, tokens_used}`.
#[async_trait]
pub trait AgentProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn call(
        &self,
        agent: &AgentConfig,
        prompt: &str,
        context: &[String],
    ) -> Result<ProviderResponse, ProviderError>;
}

/// Maps a reqwest connect/timeout failure to `Unavailable` so the caller can
/// tell "network down" apart from "the API rejected the request".
pub(crate) fn map_reqwest_err(e: reqwest::Error) -> ProviderError {
    if e.is_connect() || e.is_timeout() {
        ProviderError::Unavailable(e.to_string())
    } else {
        ProviderError::Http(e)
    }
}
