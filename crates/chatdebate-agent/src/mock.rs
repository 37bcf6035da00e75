use std::time::Duration;

use async_trait::async_trait;
use chatdebate_core::config::AgentConfig;

use crate::provider::{AgentProvider, ProviderError, ProviderResponse};

/// Deterministic canned responses, selected by `len(prompt) % N`, matching
/// the orchestrator's mock path — real-provider credentials are optional in
/// dev/test environments and any debate can still run end to end.
const TEMPLATES: &[&str] = &[
    "That's an interesting point, but have you considered the counterargument?",
    "I agree with part of that, though the evidence is more nuanced than it sounds.",
    "Let's look at this from a different angle entirely.",
    "The data suggests a more complex picture than that claim implies.",
    "I would push back on that assumption before we go further.",
];

pub struct MockProvider;

#[async_trait]
impl AgentProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn call(
        &self,
        _agent: &AgentConfig,
        prompt: &str,
        _context: &[String],
    ) -> Result<ProviderResponse, ProviderError> {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let content = TEMPLATES[prompt.len() % TEMPLATES.len()].to_string();
        let tokens_used = content.split_whitespace().count() as u32;
        Ok(ProviderResponse {
            content,
            tokens_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdebate_core::config::ProviderKind;

    fn agent() -> AgentConfig {
        AgentConfig {
            id: "mock-a".to_string(),
            name: "Agent A".to_string(),
            provider: ProviderKind::Mock,
            model: "mock-1".to_string(),
            temperature: 0.7,
            max_tokens: 300,
            system_prompt: String::new(),
            api_key: None,
        }
    }

    #[tokio::test]
    async fn same_prompt_length_yields_same_response() {
        let provider = MockProvider;
        let a = provider.call(&agent(), "hello", &[]).await.unwrap();
        let b = provider.call(&agent(), "world", &[]).await.unwrap();
        assert_eq!(a.content, b.content);
    }

    #[tokio::test]
    async fn tokens_used_is_word_count() {
        let provider = MockProvider;
        let resp = provider.call(&agent(), "x", &[]).await.unwrap();
        assert_eq!(resp.tokens_used as usize, resp.content.split_whitespace().count());
    }
}
