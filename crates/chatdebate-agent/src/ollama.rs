use async_trait::async_trait;
use chatdebate_core::config::AgentConfig;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::provider::{map_reqwest_err, AgentProvider, ProviderError, ProviderResponse};

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| "http://localhost:11434".to_string()),
        }
    }
}

#[async_trait]
impl AgentProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn call(
        &self,
        agent: &AgentConfig,
        prompt: &str,
        _context: &[String],
    ) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = json!({
            "model": agent.model,
            "prompt": prompt,
            "system": agent.system_prompt,
            "options": {
                "temperature": agent.temperature,
                "num_predict": agent.max_tokens,
            },
            "stream": false,
        });

        debug!(model = %agent.model, "sending request to Ollama");

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
            warn!(status, body = %text, "Ollama API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(ProviderResponse {
            content: parsed.response,
            tokens_used: parsed.eval_count.unwrap_or(0),
        })
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    eval_count: Option<u32>,
}
