//! In-memory test doubles for the chat module.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use chatkeep_types::chat::{CollectionName, SessionId, StoredMessage};
use chatkeep_types::error::RepositoryError;
use chatkeep_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason, Usage,
};

use super::repository::MessageRepository;
use crate::llm::provider::LlmProvider;

/// Vec-backed repository. Collections keep creation order, records keep
/// insertion order.
#[derive(Default)]
pub struct MockRepository {
    collections: Mutex<Vec<(String, Vec<StoredMessage>)>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register collections by raw name (records are added separately).
    pub fn with_collections(names: &[&str]) -> Self {
        let repo = Self::new();
        {
            let mut collections = repo.collections.lock().unwrap();
            for name in names {
                collections.push((name.to_string(), Vec::new()));
            }
        }
        repo
    }

    pub fn record_count(&self) -> usize {
        self.collections
            .lock()
            .unwrap()
            .iter()
            .map(|(_, records)| records.len())
            .sum()
    }

    fn check(&self, flag: &AtomicBool) -> Result<(), RepositoryError> {
        if flag.load(Ordering::SeqCst) {
            Err(RepositoryError::Connection("store unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl MessageRepository for MockRepository {
    async fn list_collections(&self) -> Result<Vec<String>, RepositoryError> {
        self.check(&self.fail_reads)?;
        Ok(self
            .collections
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn insert_message(
        &self,
        collection: &CollectionName,
        message: &StoredMessage,
    ) -> Result<(), RepositoryError> {
        self.check(&self.fail_writes)?;
        let mut collections = self.collections.lock().unwrap();
        match collections
            .iter_mut()
            .find(|(name, _)| name == collection.as_str())
        {
            Some((_, records)) => records.push(message.clone()),
            None => collections.push((collection.to_string(), vec![message.clone()])),
        }
        Ok(())
    }

    async fn find_messages(
        &self,
        collection: &CollectionName,
        session_id: &SessionId,
        limit: Option<i64>,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        self.check(&self.fail_reads)?;
        let collections = self.collections.lock().unwrap();
        let mut found: Vec<StoredMessage> = collections
            .iter()
            .filter(|(name, _)| name == collection.as_str())
            .flat_map(|(_, records)| records.iter())
            .filter(|m| &m.session_id == session_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps
        found.sort_by_key(|m| m.timestamp);
        if let Some(limit) = limit {
            found.truncate(limit.max(0) as usize);
        }
        Ok(found)
    }

    async fn contains_session(
        &self,
        collection: &CollectionName,
        session_id: &SessionId,
    ) -> Result<bool, RepositoryError> {
        self.check(&self.fail_reads)?;
        Ok(self
            .collections
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == collection.as_str())
            .any(|(_, records)| records.iter().any(|m| &m.session_id == session_id)))
    }

    async fn distinct_sessions(
        &self,
        collection: &CollectionName,
    ) -> Result<Vec<SessionId>, RepositoryError> {
        self.check(&self.fail_reads)?;
        let collections = self.collections.lock().unwrap();
        let mut sessions: Vec<SessionId> = Vec::new();
        for (_, records) in collections.iter().filter(|(n, _)| n == collection.as_str()) {
            for record in records {
                if !sessions.contains(&record.session_id) {
                    sessions.push(record.session_id.clone());
                }
            }
        }
        Ok(sessions)
    }
}

/// Scripted model endpoint: replies with a fixed prefix plus the last user turn.
pub struct MockProvider {
    capabilities: ProviderCapabilities,
    fail: bool,
    pub calls: AtomicUsize,
    pub last_request: Mutex<Option<CompletionRequest>>,
}

impl MockProvider {
    pub fn ok() -> Self {
        Self {
            capabilities: ProviderCapabilities {
                max_context_tokens: 128_000,
                max_output_tokens: 4_096,
            },
            fail: false,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if self.fail {
            return Err(LlmError::Provider {
                message: "endpoint unavailable".to_string(),
            });
        }
        let last = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(CompletionResponse {
            id: "resp-mock".to_string(),
            content: format!("echo: {last}"),
            model: request.model.clone(),
            stop_reason: StopReason::EndTurn,
            usage: Usage {
                input_tokens: 10,
                output_tokens: 5,
            },
        })
    }
}

impl LlmProvider for std::sync::Arc<MockProvider> {
    fn name(&self) -> &str {
        self.as_ref().name()
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        self.as_ref().capabilities()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.as_ref().complete(request).await
    }
}

impl MessageRepository for std::sync::Arc<MockRepository> {
    async fn list_collections(&self) -> Result<Vec<String>, RepositoryError> {
        self.as_ref().list_collections().await
    }

    async fn insert_message(
        &self,
        collection: &CollectionName,
        message: &StoredMessage,
    ) -> Result<(), RepositoryError> {
        self.as_ref().insert_message(collection, message).await
    }

    async fn find_messages(
        &self,
        collection: &CollectionName,
        session_id: &SessionId,
        limit: Option<i64>,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        self.as_ref().find_messages(collection, session_id, limit).await
    }

    async fn contains_session(
        &self,
        collection: &CollectionName,
        session_id: &SessionId,
    ) -> Result<bool, RepositoryError> {
        self.as_ref().contains_session(collection, session_id).await
    }

    async fn distinct_sessions(
        &self,
        collection: &CollectionName,
    ) -> Result<Vec<SessionId>, RepositoryError> {
        self.as_ref().distinct_sessions(collection).await
    }
}
