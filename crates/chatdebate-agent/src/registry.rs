use std::collections::HashMap;
use std::sync::Arc;

use chatdebate_core::config::{AgentConfig, AppConfig, ProviderKind};
use tracing::warn;

use crate::anthropic::AnthropicProvider;
use crate::gemini::GeminiProvider;
use crate::mock::MockProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;
use crate::provider::AgentProvider;

/// Resolves agent ids to their configured provider instance, falling back to
/// the mock provider whenever the configured provider has no usable
/// credentials at startup.
pub struct AgentRegistry {
    agents: HashMap<String, AgentConfig>,
    providers: HashMap<String, Arc<dyn AgentProvider>>,
}

impl AgentRegistry {
    pub fn from_config(config: &AppConfig) -> Self {
        let mock: Arc<dyn AgentProvider> = Arc::new(MockProvider);
        let mut providers: HashMap<String, Arc<dyn AgentProvider>> = HashMap::new();
        providers.insert("mock".to_string(), mock.clone());

        if let Some(key) = non_empty(&config.providers.openai.api_key) {
            providers.insert("openai".to_string(), Arc::new(OpenAiProvider::new(key)));
        }
        if let Some(key) = non_empty(&config.providers.gemini.api_key) {
            providers.insert("gemini".to_string(), Arc::new(GeminiProvider::new(key)));
        }
        if let Some(key) = non_empty(&config.providers.anthropic.api_key) {
            providers.insert(
                "anthropic".to_string(),
                Arc::new(AnthropicProvider::new(key)),
            );
        }
        // Ollama has no API key requirement; it's registered whenever a
        // base_url is configured, or unconditionally if not marked required.
        if !config.providers.ollama.required || config.providers.ollama.base_url.is_some() {
            providers.insert(
                "ollama".to_string(),
                Arc::new(OllamaProvider::new(config.providers.ollama.base_url.clone())),
            );
        }

        let agents = config
            .agents
            .iter()
            .map(|a| (a.id.clone(), a.clone()))
            .collect();

        Self { agents, providers }
    }

    pub fn agent_config(&self, agent_id: &str) -> Option<&AgentConfig> {
        self.agents.get(agent_id)
    }

    pub fn available_agents(&self) -> Vec<&AgentConfig> {
        self.agents.values().collect()
    }

    /// Names of every provider that registered successfully at startup
    /// (always includes `"mock"`).
    pub fn available_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether `agent`'s configured provider actually registered (as opposed
    /// to silently falling back to mock at call time).
    pub fn is_agent_available(&self, agent: &AgentConfig) -> bool {
        self.providers.contains_key(provider_key(agent.provider))
    }

    /// Returns the provider for `agent`, falling back to the mock provider
    /// when the agent's configured provider kind was never registered
    /// (missing credentials, required-but-absent base_url, etc).
    pub fn provider_for(&self, agent: &AgentConfig) -> Arc<dyn AgentProvider> {
        let key = provider_key(agent.provider);
        match self.providers.get(key) {
            Some(p) => p.clone(),
            None => {
                warn!(agent_id = %agent.id, provider = key, "provider unavailable, falling back to mock");
                self.providers
                    .get("mock")
                    .cloned()
                    .expect("mock provider always registered")
            }
        }
    }
}

fn provider_key(kind: ProviderKind) -> &'static str {
    kind.as_str()
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.clone().filter(|s| !s.trim().is_empty())
}
