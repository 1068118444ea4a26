//! Application state wiring all services together.
//!
//! AppState holds the chat service used by both the CLI and the web server,
//! pinned to the concrete infra implementations, plus the registry of
//! per-client session contexts of the web UI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use chatkeep_core::chat::service::{ChatService, ChatSettings};
use chatkeep_core::llm::box_provider::BoxLlmProvider;
use chatkeep_infra::config::{load_app_config, resolve_data_dir};
use chatkeep_infra::llm::{api_key_from_env, create_provider};
use chatkeep_infra::sqlite::message::SqliteMessageRepository;
use chatkeep_infra::sqlite::pool::DatabasePool;
use chatkeep_types::config::AppConfig;

use crate::clients::{ClientRegistry, SharedContext};

/// Chat service pinned to the SQLite repository.
pub type ConcreteChatService = ChatService<SqliteMessageRepository>;

/// Shared application state.
///
/// Cheap to clone: everything lives behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    /// Session contexts keyed by the client id the browser page sends.
    pub contexts: Arc<ClientRegistry>,
    /// Kept so the server can close the database on shutdown.
    pub db_pool: DatabasePool,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: load config, open the database,
    /// build the model client, wire the chat service.
    pub async fn init(database_url: &str) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_app_config(&data_dir).await;

        let db_pool = DatabasePool::new(database_url)
            .await
            .with_context(|| "Failed to open the message database")?;

        let provider = create_provider(&config.model, api_key_from_env(&config.model));

        Ok(Self::from_parts(
            SqliteMessageRepository::new(db_pool),
            provider,
            &config,
            data_dir,
        ))
    }

    /// Assemble state from already-built parts.
    pub fn from_parts(
        repo: SqliteMessageRepository,
        provider: BoxLlmProvider,
        config: &AppConfig,
        data_dir: PathBuf,
    ) -> Self {
        let settings = ChatSettings {
            system_prompt: config.system_prompt.clone(),
            model: config.model.model.clone(),
            temperature: config.model.temperature,
            max_tokens: config.model.max_tokens,
        };

        Self {
            db_pool: repo.pool().clone(),
            chat_service: Arc::new(ChatService::new(repo, provider, settings)),
            contexts: Arc::new(ClientRegistry::default()),
            data_dir,
        }
    }

    /// The session context for `client_id`, created on first use with a
    /// freshly allocated session id.
    pub async fn context_for(&self, client_id: &str) -> SharedContext {
        if let Some(existing) = self.contexts.touch(client_id) {
            return existing;
        }
        let context = self.chat_service.new_context().await;
        tracing::debug!(
            client_id = %client_id,
            session_id = %context.session_id(),
            "New client context"
        );
        self.contexts.insert(client_id, context)
    }
}
