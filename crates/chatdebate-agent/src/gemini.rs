use async_trait::async_trait;
use chatdebate_core::config::AgentConfig;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::provider::{map_reqwest_err, AgentProvider, ProviderError, ProviderResponse};

const CONTEXT_TAIL: usize = 4;

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl AgentProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn call(
        &self,
        agent: &AgentConfig,
        prompt: &str,
        context: &[String],
    ) -> Result<ProviderResponse, ProviderError> {
        // Gemini has no separate system/assistant-turn channel in the simple
        // generateContent call, so system + context tail + the current turn
        // are flattened into one prompt string.
        let tail_start = context.len().saturating_sub(CONTEXT_TAIL);
        let mut flattened = String::new();
        if !agent.system_prompt.is_empty() {
            flattened.push_str(&agent.system_prompt);
            flattened.push_str("\n\n");
        }
        for turn in &context[tail_start..] {
            flattened.push_str(turn);
            flattened.push('\n');
        }
        flattened.push_str(prompt);

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            agent.model, self.api_key
        );
        let body = json!({
            "contents": [{"parts": [{"text": flattened}]}],
        });

        debug!(model = %agent.model, "sending request to Gemini");

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_err)?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Gemini API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let parsed: GenerateContentResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let content = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        // Gemini's simple REST response does not reliably report token
        // counts in this shape, so this is left at 0 per the contract.
        Ok(ProviderResponse {
            content,
            tokens_used: 0,
        })
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: String,
}
