use async_trait::async_trait;
use chatdebate_core::config::AgentConfig;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::provider::{map_reqwest_err, AgentProvider, ProviderError, ProviderResponse};

const CONTEXT_TAIL: usize = 4;

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl AgentProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn call(
        &self,
        agent: &AgentConfig,
        prompt: &str,
        context: &[String],
    ) -> Result<ProviderResponse, ProviderError> {
        let mut messages = vec![json!({"role": "system", "content": agent.system_prompt})];
        let tail_start = context.len().saturating_sub(CONTEXT_TAIL);
        for turn in &context[tail_start..] {
            messages.push(json!({"role": "assistant", "content": turn}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let body = json!({
            "model": agent.model,
            "messages": messages,
            "temperature": agent.temperature,
            "max_tokens": agent.max_tokens,
        });

        debug!(model = %agent.model, "sending request to OpenAI");

        let resp = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_err)?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "OpenAI API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let parsed: ChatCompletion = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        let tokens_used = parsed.usage.map(|u| u.total_tokens).unwrap_or(0);

        Ok(ProviderResponse {
            content,
            tokens_used,
        })
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}
