use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::brain::{BrainConfig, LlmProvider};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub lms: LmsConfig,
    #[serde(default)]
    pub brain: BrainConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8000
}

/// Canvas LMS configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LmsConfig {
    /// API root, e.g. "https://canvas.asu.edu/api/v1"
    #[serde(default = "default_lms_base_url")]
    pub base_url: String,
    /// Bearer token. `${VAR}` is read from the environment.
    /// Falls back to `CANVAS_API_KEY` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Page size for list endpoints
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_lms_timeout")]
    pub timeout_secs: u32,
}

impl Default for LmsConfig {
    fn default() -> Self {
        Self {
            base_url: default_lms_base_url(),
            api_key: None,
            per_page: default_per_page(),
            timeout_secs: default_lms_timeout(),
        }
    }
}

impl LmsConfig {
    /// Effective API key after env var resolution.
    pub fn resolved_api_key(&self) -> Option<String> {
        match &self.api_key {
            Some(raw) => resolve_secret(raw),
            None => read_env("CANVAS_API_KEY"),
        }
    }
}

fn default_lms_base_url() -> String {
    "https://canvas.asu.edu/api/v1".to_string()
}

fn default_per_page() -> u32 {
    100
}

fn default_lms_timeout() -> u32 {
    10
}

/// Resolve a secret value. `${NAME}` reads the environment variable NAME,
/// anything else is returned as-is. Empty values resolve to `None`.
pub fn resolve_secret(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let value = match trimmed
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(var) => read_env(var)?,
        None => trimmed.to_string(),
    };
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

pub(crate) fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub lms: SanitizedLmsConfig,
    pub brain: SanitizedBrainConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLmsConfig {
    pub base_url: String,
    pub api_key_configured: bool,
    pub per_page: u32,
    pub timeout_secs: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedBrainConfig {
    pub call_timeout_secs: u32,
    pub module_fallback_count: usize,
    pub resource_fallback_count: usize,
    pub resource_fallback_score: f32,
    pub parallel_modules: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<SanitizedLlmConfig>,
}

/// Sanitized LLM config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let brain = &config.brain;
        Self {
            server: config.server.clone(),
            lms: SanitizedLmsConfig {
                base_url: config.lms.base_url.clone(),
                api_key_configured: config.lms.resolved_api_key().is_some(),
                per_page: config.lms.per_page,
                timeout_secs: config.lms.timeout_secs,
            },
            brain: SanitizedBrainConfig {
                call_timeout_secs: brain.call_timeout_secs,
                module_fallback_count: brain.module_fallback_count,
                resource_fallback_count: brain.resource_fallback_count,
                resource_fallback_score: brain.resource_fallback_score,
                parallel_modules: brain.parallel_modules,
                llm: brain.llm.as_ref().map(|llm| SanitizedLlmConfig {
                    provider: llm.provider.clone(),
                    model: llm.model.clone(),
                    api_key_configured: llm.resolved_api_key().is_some(),
                    api_base: llm.api_base.clone(),
                    timeout_secs: llm.timeout_secs,
                }),
            },
        }
    }
}
