//! LLM provider implementations.
//!
//! Contains the OpenAI-compatible implementation of the [`LlmProvider`]
//! trait defined in `chatkeep-core`, plus a factory ([`create_provider`])
//! that builds it from a [`ModelConfig`].
//!
//! [`LlmProvider`]: chatkeep_core::llm::provider::LlmProvider

pub mod openai_compat;

use secrecy::SecretString;

use chatkeep_core::llm::box_provider::BoxLlmProvider;
use chatkeep_types::config::ModelConfig;

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::{from_model_config, huggingface_defaults, openai_defaults};

/// Create a [`BoxLlmProvider`] from a [`ModelConfig`].
///
/// Well-known provider names pick their factory defaults; a `base_url`
/// changed from the default always wins. A missing API key is not fatal
/// here: the endpoint rejects the call and the error surfaces per request.
pub fn create_provider(config: &ModelConfig, api_key: Option<SecretString>) -> BoxLlmProvider {
    let api_key = api_key.unwrap_or_else(|| {
        tracing::warn!(
            env = %config.api_key_env,
            "No API key configured; model calls will fail until it is set"
        );
        SecretString::from(String::new())
    });

    let custom_base_url = config.base_url != ModelConfig::default().base_url;

    let mut oai_config = match config.provider_name.as_str() {
        "huggingface" => huggingface_defaults(api_key, &config.model),
        "openai" => openai_defaults(api_key, &config.model),
        _ => from_model_config(config, api_key),
    };
    if custom_base_url {
        oai_config.base_url = config.base_url.clone();
    }
    oai_config.capabilities.max_output_tokens = config.max_tokens;

    tracing::debug!(
        provider = %oai_config.provider_name,
        base_url = %oai_config.base_url,
        model = %oai_config.model,
        "LLM provider configured"
    );

    BoxLlmProvider::new(OpenAiCompatibleProvider::new(oai_config))
}

/// Read the API key named by `config.api_key_env` from the environment.
///
/// Empty values count as missing.
pub fn api_key_from_env(config: &ModelConfig) -> Option<SecretString> {
    std::env::var(&config.api_key_env)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}
