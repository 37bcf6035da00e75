use std::path::Path;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

pub const PROTOCOL_VERSION: &str = "1";
pub const MAX_MESSAGE_LEN: usize = 1000;
pub const MAX_HISTORY_LEN: usize = 50;
pub const HISTORY_TTL_SECS: u64 = 86_400;
pub const PRESENCE_TTL_SECS: u64 = 3_600;
pub const TYPING_TTL_SECS: u64 = 5;
pub const RATE_LIMIT_TTL_SECS: u64 = 10;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u32,
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_secs() -> u32 {
    5
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_max_len")]
    pub max_len: usize,
    #[serde(default = "default_history_ttl")]
    pub ttl_secs: u64,
}

fn default_history_max_len() -> usize {
    MAX_HISTORY_LEN
}

fn default_history_ttl() -> u64 {
    HISTORY_TTL_SECS
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_len: default_history_max_len(),
            ttl_secs: default_history_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub backplane_url: Option<String>,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Mock,
    Openai,
    Gemini,
    Anthropic,
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Mock => "mock",
            ProviderKind::Openai => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub name: String,
    pub provider: ProviderKind,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderSettings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ProviderSettings,
    #[serde(default)]
    pub gemini: ProviderSettings,
    #[serde(default)]
    pub anthropic: ProviderSettings,
    #[serde(default)]
    pub ollama: ProviderSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateSettings {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    #[serde(default = "default_max_duration")]
    pub max_duration: u64,
    #[serde(default = "default_turn_timeout")]
    pub turn_timeout: u64,
}

fn default_max_rounds() -> u32 {
    6
}

fn default_max_duration() -> u64 {
    90
}

fn default_turn_timeout() -> u64 {
    15
}

impl Default for DebateSettings {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            max_duration: default_max_duration(),
            turn_timeout: default_turn_timeout(),
        }
    }
}

fn default_agents() -> Vec<AgentConfig> {
    vec![
        AgentConfig {
            id: "mock-a".to_string(),
            name: "Agent A".to_string(),
            provider: ProviderKind::Mock,
            model: "mock-1".to_string(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: "You are a debater arguing the affirmative side.".to_string(),
            api_key: None,
        },
        AgentConfig {
            id: "mock-b".to_string(),
            name: "Agent B".to_string(),
            provider: ProviderKind::Mock,
            model: "mock-1".to_string(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: "You are a debater arguing the negative side.".to_string(),
            api_key: None,
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub debate_settings: DebateSettings,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default = "default_agents")]
    pub agents: Vec<AgentConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            debate_settings: DebateSettings::default(),
            providers: ProvidersConfig::default(),
            agents: default_agents(),
        }
    }
}

impl AppConfig {
    /// Load from a YAML file at `path`, merged with `CHATDEBATE_`-prefixed
    /// environment overrides, then run `${ENVVAR}` / `${ENVVAR:-default}`
    /// expansion over every string value. If `path` does not exist, the
    /// built-in default (two mock agents, no providers configured) is used.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let figment = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("CHATDEBATE_").split("__"));

        let raw: serde_yaml::Value = figment
            .extract()
            .map_err(|e| ChatError::Config(e.to_string()))?;
        let expanded = expand_env_value(raw);
        serde_yaml::from_value(expanded).map_err(|e| ChatError::Config(e.to_string()))
    }
}

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}").unwrap());

/// Expand `${VAR}` and `${VAR:-default}` occurrences in `s` from the process
/// environment. A missing variable with no default expands to the empty
/// string, matching typical shell semantics for `${VAR}`.
pub fn expand_env_str(s: &str) -> String {
    ENV_VAR_PATTERN
        .replace_all(s, |caps: &regex::Captures| {
            let var = &caps[1];
            let default = caps.get(3).map(|m| m.as_str());
            std::env::var(var).unwrap_or_else(|_| default.unwrap_or("").to_string())
        })
        .into_owned()
}

fn expand_env_value(value: serde_yaml::Value) -> serde_yaml::Value {
    match value {
        serde_yaml::Value::String(s) => serde_yaml::Value::String(expand_env_str(&s)),
        serde_yaml::Value::Sequence(seq) => {
            serde_yaml::Value::Sequence(seq.into_iter().map(expand_env_value).collect())
        }
        serde_yaml::Value::Mapping(map) => serde_yaml::Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (expand_env_value(k), expand_env_value(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_plain_var() {
        std::env::set_var("CHATDEBATE_TEST_VAR_A", "hello");
        assert_eq!(expand_env_str("${CHATDEBATE_TEST_VAR_A}"), "hello");
    }

    #[test]
    fn expands_default_when_missing() {
        std::env::remove_var("CHATDEBATE_TEST_VAR_MISSING");
        assert_eq!(
            expand_env_str("${CHATDEBATE_TEST_VAR_MISSING:-fallback}"),
            "fallback"
        );
    }

    #[test]
    fn missing_var_no_default_is_empty() {
        std::env::remove_var("CHATDEBATE_TEST_VAR_MISSING2");
        assert_eq!(expand_env_str("${CHATDEBATE_TEST_VAR_MISSING2}"), "");
    }

    #[test]
    fn default_config_has_two_mock_agents() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.agents.len(), 2);
        assert!(cfg.agents.iter().all(|a| a.provider == ProviderKind::Mock));
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let cfg = AppConfig::load("/nonexistent/path/agents.yaml").unwrap();
        assert_eq!(cfg.agents.len(), 2);
    }
}
