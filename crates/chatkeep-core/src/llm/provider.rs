//! LlmProvider trait definition.
//!
//! This is the core abstraction that the model endpoint client implements.
//! Uses RPITIT for `complete`; `BoxLlmProvider` erases the concrete type.

use chatkeep_types::llm::{CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities};

/// Trait for LLM provider backends.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Implementations live in chatkeep-infra (e.g., `OpenAiCompatibleProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "huggingface", "openai").
    fn name(&self) -> &str;

    /// Context and output limits for this provider.
    fn capabilities(&self) -> &ProviderCapabilities;

    /// Send the ordered conversation and receive the assistant turn.
    ///
    /// Blocking from the caller's point of view: no timeout and no
    /// cancellation is applied here.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
