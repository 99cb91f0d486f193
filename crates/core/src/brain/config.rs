//! Brain configuration types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::resolve_secret;

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Google Gemini API.
    Gemini,
    /// Anthropic Claude API.
    Anthropic,
    /// Local Ollama instance.
    Ollama,
}

impl LlmProvider {
    /// Environment variable consulted when no key is configured.
    pub fn default_key_env(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Gemini => Some("GOOGLE_API_KEY"),
            LlmProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            LlmProvider::Ollama => None,
        }
    }
}

/// LLM client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// LLM provider.
    pub provider: LlmProvider,
    /// Model name/identifier.
    pub model: String,
    /// API key (can reference env var with ${VAR_NAME}).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL (for proxies or self-hosted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u32,
    /// Maximum tokens for completions.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl LlmConfig {
    /// Effective API key after env var resolution and provider fallback.
    pub fn resolved_api_key(&self) -> Option<String> {
        match &self.api_key {
            Some(raw) => resolve_secret(raw),
            None => self
                .provider
                .default_key_env()
                .and_then(|name| std::env::var(name).ok())
                .filter(|v| !v.is_empty()),
        }
    }
}

fn default_llm_timeout() -> u32 {
    30
}

fn default_max_tokens() -> u32 {
    1024
}

/// Cascade tuning and the optional model collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrainConfig {
    /// Upper bound for any single collaborator call, in seconds.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u32,
    /// Modules kept when nothing else selects one.
    #[serde(default = "default_module_fallback_count")]
    pub module_fallback_count: usize,
    /// Items kept per module when ranking fails.
    #[serde(default = "default_resource_fallback_count")]
    pub resource_fallback_count: usize,
    /// Score given to those items.
    #[serde(default = "default_resource_fallback_score")]
    pub resource_fallback_score: f32,
    /// Rank the selected modules concurrently.
    #[serde(default = "default_parallel_modules")]
    pub parallel_modules: bool,
    /// Without this section every stage runs on its fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout(),
            module_fallback_count: default_module_fallback_count(),
            resource_fallback_count: default_resource_fallback_count(),
            resource_fallback_score: default_resource_fallback_score(),
            parallel_modules: default_parallel_modules(),
            llm: None,
        }
    }
}

impl BrainConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.call_timeout_secs))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.call_timeout_secs == 0 {
            return Err("call_timeout_secs cannot be 0".to_string());
        }
        if self.module_fallback_count == 0 {
            return Err("module_fallback_count cannot be 0".to_string());
        }
        if self.resource_fallback_count == 0 {
            return Err("resource_fallback_count cannot be 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.resource_fallback_score) {
            return Err(format!(
                "resource_fallback_score must be within 0.0..=1.0, got {}",
                self.resource_fallback_score
            ));
        }
        if let Some(llm) = &self.llm {
            if llm.model.trim().is_empty() {
                return Err("llm.model cannot be empty".to_string());
            }
            if llm.timeout_secs == 0 {
                return Err("llm.timeout_secs cannot be 0".to_string());
            }
        }
        Ok(())
    }
}

fn default_call_timeout() -> u32 {
    10
}

fn default_module_fallback_count() -> usize {
    2
}

fn default_resource_fallback_count() -> usize {
    3
}

fn default_resource_fallback_score() -> f32 {
    0.8
}

fn default_parallel_modules() -> bool {
    true
}
