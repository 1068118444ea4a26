//! Application configuration types for chatkeep.
//!
//! `AppConfig` represents the optional `config.toml` in the data directory.
//! Every field has a default so an empty or missing file is valid. The
//! database connection string is deliberately absent: it comes from the
//! environment and has no default.

use serde::{Deserialize, Serialize};

use crate::chat::DEFAULT_SYSTEM_PROMPT;

/// Top-level configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// System turn prepended to every conversation.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Model endpoint settings.
    #[serde(default)]
    pub model: ModelConfig,
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            model: ModelConfig::default(),
        }
    }
}

/// Settings for the OpenAI-compatible model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Human-readable provider name used in logs and spans.
    #[serde(default = "default_provider_name")]
    pub provider_name: String,

    /// Base URL of the chat-completions API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Environment variable holding the API token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_provider_name() -> String {
    "huggingface".to_string()
}

fn default_base_url() -> String {
    "https://router.huggingface.co/v1".to_string()
}

fn default_model() -> String {
    "deepseek-ai/DeepSeek-V3.1".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_api_key_env() -> String {
    "HF_TOKEN".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider_name: default_provider_name(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            api_key_env: default_api_key_env(),
        }
    }
}
