//! Chat service orchestrating sessions, persistence and the model endpoint.
//!
//! ChatService ties the message store to the LLM provider: it starts and
//! switches sessions, persists each user/assistant exchange, and builds the
//! sidebar listing.

use chrono::Local;
use tracing::{Instrument, info, info_span, warn};

use chatkeep_types::chat::{Message, SessionId, SessionSummary, StoredRole};
use chatkeep_types::error::ChatError;
use chatkeep_types::llm::{CompletionRequest, Usage};

use super::history::HistoryReconstructor;
use super::repository::MessageRepository;
use super::resolver::SessionResolver;
use super::session::{SessionContext, SessionIdAllocator};
use super::store::MessageStore;
use crate::llm::box_provider::BoxLlmProvider;

/// Request parameters applied to every model call.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub system_prompt: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Outcome of one exchange.
///
/// `warnings` carries store failures that did not stop the exchange; the
/// turns they concern exist only in memory.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub session_id: SessionId,
    pub reply: String,
    pub usage: Usage,
    pub warnings: Vec<String>,
}

/// Orchestrates the chat flow.
///
/// Generic over `MessageRepository` so chatkeep-core never depends on
/// chatkeep-infra.
pub struct ChatService<R: MessageRepository> {
    store: MessageStore<R>,
    provider: BoxLlmProvider,
    settings: ChatSettings,
    session_ids: SessionIdAllocator,
}

impl<R: MessageRepository> ChatService<R> {
    pub fn new(repo: R, provider: BoxLlmProvider, settings: ChatSettings) -> Self {
        Self {
            store: MessageStore::new(repo),
            provider,
            settings,
            session_ids: SessionIdAllocator::new(),
        }
    }

    pub fn store(&self) -> &MessageStore<R> {
        &self.store
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Context for a client seen for the first time, with its own session id.
    pub async fn new_context(&self) -> SessionContext {
        let session_id = self.allocate_session_id().await;
        SessionContext::with_session(session_id, &self.settings.system_prompt)
    }

    /// A session id no live context and no stored session uses.
    ///
    /// When the store cannot be listed the id is still unique among the ids
    /// this service has handed out.
    pub async fn allocate_session_id(&self) -> SessionId {
        let stored = match self.store.all_sessions().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Could not list stored sessions for id allocation");
                Vec::new()
            }
        };
        self.session_ids.allocate(Local::now(), &stored).await
    }

    pub fn resolver(&self) -> SessionResolver<'_, R> {
        SessionResolver::new(&self.store)
    }

    pub fn history(&self) -> HistoryReconstructor<'_, R> {
        HistoryReconstructor::new(&self.store, &self.settings.system_prompt)
    }

    // --- Session lifecycle ---

    /// Start a new conversation in a freshly numbered collection.
    pub async fn new_chat(&self, ctx: &mut SessionContext) -> Result<SessionId, ChatError> {
        self.resolver().start_new_collection(ctx).await?;

        let session_id = self.allocate_session_id().await;
        ctx.set_session_id(session_id.clone());
        ctx.conversation_mut().reset();

        info!(session_id = %session_id, "New chat started");
        Ok(session_id)
    }

    /// Make `session_id` active and rebuild the conversation from the store.
    ///
    /// Returns the number of restored turns; unknown sessions restore none.
    pub async fn switch_session(
        &self,
        ctx: &mut SessionContext,
        session_id: SessionId,
    ) -> Result<usize, ChatError> {
        ctx.set_session_id(session_id.clone());
        let restored = self.history().load_into(ctx, &session_id).await?;
        info!(session_id = %session_id, turns = restored, "Session activated");
        Ok(restored)
    }

    // --- Exchange ---

    /// Send a prompt and record the exchange.
    ///
    /// Store failures become warnings and the turns stay in memory. A model
    /// failure is returned as an error; no assistant turn is added or
    /// persisted in that case.
    pub async fn send(&self, ctx: &mut SessionContext, prompt: &str) -> Result<ChatReply, ChatError> {
        if prompt.trim().is_empty() {
            return Err(ChatError::Validation("message must not be empty".to_string()));
        }

        let session_id = ctx.session_id().clone();
        let mut warnings = Vec::new();

        let collection = match self.resolver().resolve_or_create(&session_id, ctx).await {
            Ok(collection) => Some(collection),
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Could not resolve collection");
                warnings.push(format!("Could not save message: {e}"));
                None
            }
        };

        ctx.conversation_mut().push_user(prompt);
        if let Some(collection) = &collection {
            if let Err(e) = self
                .store
                .append(collection, &session_id, StoredRole::User, prompt)
                .await
            {
                warn!(session_id = %session_id, collection = %collection, error = %e, "Failed to save user message");
                warnings.push(format!("Could not save message: {e}"));
            }
        }

        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages: ctx.conversation().messages(),
            max_tokens: self.settings.max_tokens,
            temperature: Some(self.settings.temperature),
            stop_sequences: None,
        };

        let span = info_span!(
            "gen_ai.complete",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.temperature = ?request.temperature,
            session_id = %session_id,
        );

        let response = match self.provider.complete(&request).instrument(span).await {
            Ok(response) => response,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Model call failed");
                return Err(ChatError::Model(e));
            }
        };

        ctx.conversation_mut().push_assistant(response.content.clone());
        if let Some(collection) = &collection {
            if let Err(e) = self
                .store
                .append(collection, &session_id, StoredRole::Assistant, &response.content)
                .await
            {
                warn!(session_id = %session_id, collection = %collection, error = %e, "Failed to save assistant message");
                warnings.push(format!("Could not save reply: {e}"));
            }
        }

        info!(
            session_id = %session_id,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Exchange completed"
        );

        Ok(ChatReply {
            session_id,
            reply: response.content,
            usage: response.usage,
            warnings,
        })
    }

    // --- Listing ---

    /// Sidebar listing for a context: stored sessions plus the ones the
    /// context knows about, newest first.
    pub async fn list_sessions(
        &self,
        ctx: &SessionContext,
    ) -> Result<Vec<SessionSummary>, ChatError> {
        self.summarize_sessions(ctx.known_sessions()).await
    }

    /// Summaries for every stored session and each id in `extra`, newest first.
    pub async fn summarize_sessions(
        &self,
        extra: &[SessionId],
    ) -> Result<Vec<SessionSummary>, ChatError> {
        let mut ids = self.store.all_sessions().await?;
        ids.extend(extra.iter().cloned());
        ids.sort_unstable_by(|a, b| b.cmp(a));
        ids.dedup();

        let history = self.history();
        let mut summaries = Vec::with_capacity(ids.len());
        for session_id in ids {
            let preview = history.preview(&session_id).await?;
            summaries.push(SessionSummary {
                label: session_id.label(),
                session_id,
                preview,
            });
        }
        Ok(summaries)
    }

    /// Stored turns for a session, oldest first.
    pub async fn load_history(&self, session_id: &SessionId) -> Result<Vec<Message>, ChatError> {
        Ok(self.history().load(session_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use chatkeep_types::chat::{CollectionName, MessageRole, DEFAULT_SYSTEM_PROMPT};

    use crate::chat::testing::{MockProvider, MockRepository};

    fn settings() -> ChatSettings {
        ChatSettings {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            model: "test-model".to_string(),
            temperature: 0.7,
            max_tokens: 256,
        }
    }

    fn service(
        repo: Arc<MockRepository>,
        provider: Arc<MockProvider>,
    ) -> ChatService<Arc<MockRepository>> {
        ChatService::new(repo, BoxLlmProvider::new(provider), settings())
    }

    fn ctx(id: &str) -> SessionContext {
        SessionContext::with_session(SessionId::new(id), DEFAULT_SYSTEM_PROMPT)
    }

    #[tokio::test]
    async fn test_send_persists_both_turns() {
        let repo = Arc::new(MockRepository::new());
        let provider = Arc::new(MockProvider::ok());
        let svc = service(repo.clone(), provider.clone());
        let mut context = ctx("20250101_000000");

        let reply = svc.send(&mut context, "hello").await.unwrap();

        assert_eq!(reply.reply, "echo: hello");
        assert!(reply.warnings.is_empty());
        assert_eq!(repo.record_count(), 2);
        assert_eq!(context.conversation().turns().len(), 2);
        assert_eq!(context.current_collection().map(|c| c.suffix()), Some(1));

        let stored = svc.load_history(&SessionId::new("20250101_000000")).await.unwrap();
        assert_eq!(stored, vec![Message::user("hello"), Message::assistant("echo: hello")]);
    }

    #[tokio::test]
    async fn test_send_includes_system_turn_first() {
        let repo = Arc::new(MockRepository::new());
        let provider = Arc::new(MockProvider::ok());
        let svc = service(repo, provider.clone());
        let mut context = ctx("s");

        svc.send(&mut context, "one").await.unwrap();
        svc.send(&mut context, "two").await.unwrap();

        let request = provider.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.model, "test-model");
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[0], Message::system(DEFAULT_SYSTEM_PROMPT));
        assert_eq!(request.messages[3], Message::user("two"));
    }

    #[tokio::test]
    async fn test_send_rejects_blank_prompt() {
        let repo = Arc::new(MockRepository::new());
        let provider = Arc::new(MockProvider::ok());
        let svc = service(repo.clone(), provider.clone());
        let mut context = ctx("s");

        let err = svc.send(&mut context, "   \n").await.unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(repo.record_count(), 0);
    }

    #[tokio::test]
    async fn test_model_failure_persists_no_reply() {
        let repo = Arc::new(MockRepository::new());
        let provider = Arc::new(MockProvider::failing());
        let svc = service(repo.clone(), provider);
        let mut context = ctx("s");

        let err = svc.send(&mut context, "hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Model(_)));

        // Only the user turn reached the store and the conversation
        assert_eq!(repo.record_count(), 1);
        let turns = context.conversation().turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn test_store_failure_becomes_warning() {
        let repo = Arc::new(MockRepository::new());
        repo.fail_reads.store(true, Ordering::SeqCst);
        repo.fail_writes.store(true, Ordering::SeqCst);
        let provider = Arc::new(MockProvider::ok());
        let svc = service(repo.clone(), provider);
        let mut context = ctx("s");

        let reply = svc.send(&mut context, "hello").await.unwrap();
        assert_eq!(reply.reply, "echo: hello");
        assert!(!reply.warnings.is_empty());
        assert_eq!(repo.record_count(), 0);
        assert_eq!(context.conversation().turns().len(), 2);
    }

    #[tokio::test]
    async fn test_write_failure_after_resolve_warns_twice() {
        let repo = Arc::new(MockRepository::new());
        repo.fail_writes.store(true, Ordering::SeqCst);
        let provider = Arc::new(MockProvider::ok());
        let svc = service(repo, provider);
        let mut context = ctx("s");

        let reply = svc.send(&mut context, "hello").await.unwrap();
        assert_eq!(reply.warnings.len(), 2);
    }

    #[tokio::test]
    async fn test_new_chat_uses_next_collection() {
        let repo = Arc::new(MockRepository::new());
        let provider = Arc::new(MockProvider::ok());
        let svc = service(repo.clone(), provider);
        let mut context = ctx("20240101_000000");

        svc.send(&mut context, "first chat").await.unwrap();
        svc.new_chat(&mut context).await.unwrap();

        assert!(context.conversation().is_empty());
        assert_eq!(context.current_collection().map(|c| c.suffix()), Some(2));
        assert!(context.known_sessions().contains(&SessionId::new("20240101_000000")));
        assert!(context.known_sessions().contains(context.session_id()));

        svc.send(&mut context, "second chat").await.unwrap();
        let collections = svc.store().list_reserved_collections().await.unwrap();
        assert_eq!(collections.len(), 2);
    }

    #[tokio::test]
    async fn test_switch_session_restores_history() {
        let repo = Arc::new(MockRepository::new());
        let provider = Arc::new(MockProvider::ok());
        let svc = service(repo, provider);

        let mut first = ctx("20240101_000000");
        svc.send(&mut first, "remember me").await.unwrap();

        let mut other = ctx("20250101_000000");
        other.set_current_collection(CollectionName::with_suffix(5));
        let restored = svc
            .switch_session(&mut other, SessionId::new("20240101_000000"))
            .await
            .unwrap();

        assert_eq!(restored, 2);
        assert_eq!(other.session_id().as_str(), "20240101_000000");
        assert_eq!(other.current_collection().map(|c| c.suffix()), Some(1));
        assert_eq!(other.conversation().turns()[0], Message::user("remember me"));

        // Next message continues in the session's own collection
        svc.send(&mut other, "again").await.unwrap();
        let stored = svc.load_history(&SessionId::new("20240101_000000")).await.unwrap();
        assert_eq!(stored.len(), 4);
    }

    #[tokio::test]
    async fn test_switch_to_unknown_session_is_empty() {
        let repo = Arc::new(MockRepository::new());
        let provider = Arc::new(MockProvider::ok());
        let svc = service(repo, provider);
        let mut context = ctx("a");
        context.conversation_mut().push_user("unsaved");

        let restored = svc
            .switch_session(&mut context, SessionId::new("missing"))
            .await
            .unwrap();
        assert_eq!(restored, 0);
        assert!(context.conversation().is_empty());
    }

    #[tokio::test]
    async fn test_list_sessions_newest_first_with_previews() {
        let repo = Arc::new(MockRepository::new());
        let provider = Arc::new(MockProvider::ok());
        let svc = service(repo, provider);

        let mut older = ctx("20240101_090000");
        svc.send(&mut older, "An older conversation about sourdough bread").await.unwrap();
        let mut newer = ctx("20250101_090000");
        svc.send(&mut newer, "hi").await.unwrap();

        let mut viewer = ctx("20260101_090000");
        viewer.remember_session(SessionId::new("20240101_090000"));

        let summaries = svc.list_sessions(&viewer).await.unwrap();
        let ids: Vec<&str> = summaries.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, vec!["20260101_090000", "20250101_090000", "20240101_090000"]);

        assert_eq!(summaries[0].preview, "Empty chat");
        assert_eq!(summaries[1].preview, "hi");
        assert_eq!(summaries[2].preview, "An older conversation about so...");
        assert_eq!(summaries[2].label, "2024-01-01 09:00");
    }

    #[tokio::test]
    async fn test_contexts_created_together_keep_separate_histories() {
        let repo = Arc::new(MockRepository::new());
        let provider = Arc::new(MockProvider::ok());
        let svc = service(repo, provider);

        let mut alice = svc.new_context().await;
        let mut bob = svc.new_context().await;
        assert_ne!(alice.session_id(), bob.session_id());

        svc.send(&mut alice, "alice secret").await.unwrap();
        svc.send(&mut bob, "bob question").await.unwrap();

        let bob_history = svc.load_history(bob.session_id()).await.unwrap();
        assert_eq!(
            bob_history,
            vec![Message::user("bob question"), Message::assistant("echo: bob question")]
        );
        let alice_history = svc.load_history(alice.session_id()).await.unwrap();
        assert_eq!(alice_history.len(), 2);
        assert_eq!(alice_history[0], Message::user("alice secret"));
    }

    #[tokio::test]
    async fn test_new_chat_right_after_send_gets_fresh_session() {
        let repo = Arc::new(MockRepository::new());
        let provider = Arc::new(MockProvider::ok());
        let svc = service(repo, provider);

        let mut context = svc.new_context().await;
        let first = context.session_id().clone();
        svc.send(&mut context, "first chat").await.unwrap();

        let second = svc.new_chat(&mut context).await.unwrap();
        assert_ne!(first, second);
        assert!(second.started_at().is_some());

        svc.send(&mut context, "second chat").await.unwrap();
        assert_eq!(svc.load_history(&first).await.unwrap().len(), 2);
        let second_history = svc.load_history(&second).await.unwrap();
        assert_eq!(second_history[0], Message::user("second chat"));
        assert_eq!(context.current_collection().map(|c| c.suffix()), Some(2));
    }

    #[tokio::test]
    async fn test_new_context_avoids_stored_session_ids() {
        let repo = Arc::new(MockRepository::new());
        let provider = Arc::new(MockProvider::ok());
        let svc = service(repo, provider);

        // Stored by an earlier process in the current second
        let taken = SessionId::from_datetime(&Local::now());
        let mut earlier = ctx(taken.as_str());
        svc.send(&mut earlier, "from before").await.unwrap();

        let fresh = svc.new_context().await;
        assert_ne!(fresh.session_id(), &taken);
        assert!(fresh.session_id() > &taken);
    }
}
