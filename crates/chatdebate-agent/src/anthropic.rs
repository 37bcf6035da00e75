use async_trait::async_trait;
use chatdebate_core::config::AgentConfig;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::provider::{map_reqwest_err, AgentProvider, ProviderError, ProviderResponse};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl AgentProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn call(
        &self,
        agent: &AgentConfig,
        prompt: &str,
        _context: &[String],
    ) -> Result<ProviderResponse, ProviderError> {
        // The system prompt travels in its own top-level field; only the
        // current turn goes into `messages`, per the contract in §4.F.
        let body = json!({
            "model": agent.model,
            "system": agent.system_prompt,
            "max_tokens": agent.max_tokens,
            "messages": [{"role": "user", "content": prompt}],
        });

        debug!(model = %agent.model, "sending request to Anthropic");

        let resp = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_err)?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Anthropic API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let parsed: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let content = parsed
            .content
            .into_iter()
            .next()
            .map(|b| b.text)
            .unwrap_or_default();
        let tokens_used = parsed.usage.input_tokens + parsed.usage.output_tokens;

        Ok(ProviderResponse {
            content,
            tokens_used,
        })
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}
