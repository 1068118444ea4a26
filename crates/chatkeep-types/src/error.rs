use thiserror::Error;

use crate::llm::LlmError;

/// Errors from repository operations (used by trait definitions in chatkeep-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("no collection suffix left after {0}")]
    SuffixExhausted(String),
}

/// Errors surfaced to a chat interaction.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),

    #[error("model error: {0}")]
    Model(#[from] LlmError),
}

/// Errors raised while assembling configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("database connection string is not set (use DATABASE_URL or --database-url)")]
    MissingDatabaseUrl,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
