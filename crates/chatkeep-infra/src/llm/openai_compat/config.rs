//! Configuration types and per-endpoint defaults for OpenAI-compatible providers.
//!
//! Each endpoint that speaks the OpenAI chat completions protocol gets a
//! factory function returning an [`OpenAiCompatConfig`] with the correct base
//! URL and capabilities.

use secrecy::SecretString;

use chatkeep_types::config::ModelConfig;
use chatkeep_types::llm::ProviderCapabilities;

/// Configuration for an OpenAI-compatible LLM provider.
///
/// Used to construct an [`super::OpenAiCompatibleProvider`]. Not `Debug`:
/// the API key stays out of logs.
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g., "huggingface", "openai").
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://router.huggingface.co/v1").
    pub base_url: String,
    pub api_key: SecretString,
    /// Model identifier (e.g., "deepseek-ai/DeepSeek-V3.1").
    pub model: String,
    pub capabilities: ProviderCapabilities,
}

/// Hugging Face inference router.
///
/// Base URL: `https://router.huggingface.co/v1`
pub fn huggingface_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "huggingface".into(),
        base_url: "https://router.huggingface.co/v1".into(),
        api_key,
        model: model.into(),
        capabilities: ProviderCapabilities {
            max_context_tokens: 128_000,
            max_output_tokens: 8_192,
        },
    }
}

/// OpenAI default configuration.
///
/// Base URL: `https://api.openai.com/v1`
pub fn openai_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: "https://api.openai.com/v1".into(),
        api_key,
        model: model.into(),
        capabilities: ProviderCapabilities {
            max_context_tokens: 128_000,
            max_output_tokens: 16_384,
        },
    }
}

/// Configuration taken verbatim from `config.toml`.
pub fn from_model_config(model: &ModelConfig, api_key: SecretString) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: model.provider_name.clone(),
        base_url: model.base_url.clone(),
        api_key,
        model: model.model.clone(),
        capabilities: ProviderCapabilities {
            max_context_tokens: 128_000,
            max_output_tokens: model.max_tokens,
        },
    }
}
