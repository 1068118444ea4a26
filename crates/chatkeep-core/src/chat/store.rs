//! Message store adapter.
//!
//! Wraps a [`MessageRepository`] and exposes the operations the resolver,
//! reconstructor and sidebar need: reserved-collection enumeration,
//! per-session lookup and timestamped append.

use std::collections::HashSet;

use chrono::Utc;
use tracing::debug;

use chatkeep_types::chat::{CollectionName, SessionId, StoredMessage, StoredRole};
use chatkeep_types::error::RepositoryError;

use super::repository::MessageRepository;

/// Adapter over the document store.
///
/// No caching: every call goes to the repository, so callers see whatever
/// the store currently reports. Store failures are returned immediately,
/// without retry.
pub struct MessageStore<R: MessageRepository> {
    repo: R,
}

impl<R: MessageRepository> MessageStore<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Access the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Collections following the `chat_history_{n}` convention, in store
    /// enumeration order.
    pub async fn list_reserved_collections(&self) -> Result<Vec<CollectionName>, RepositoryError> {
        let names = self.repo.list_collections().await?;
        Ok(names
            .iter()
            .filter_map(|name| CollectionName::parse(name))
            .collect())
    }

    /// First reserved collection (in enumeration order) holding the session.
    pub async fn find_collection_for_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<CollectionName>, RepositoryError> {
        for collection in self.list_reserved_collections().await? {
            if self.repo.contains_session(&collection, session_id).await? {
                debug!(session_id = %session_id, collection = %collection, "Session located");
                return Ok(Some(collection));
            }
        }
        Ok(None)
    }

    /// Append one message stamped with the current time.
    pub async fn append(
        &self,
        collection: &CollectionName,
        session_id: &SessionId,
        role: StoredRole,
        content: &str,
    ) -> Result<StoredMessage, RepositoryError> {
        let message = StoredMessage {
            session_id: session_id.clone(),
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        };
        self.repo.insert_message(collection, &message).await?;
        debug!(
            session_id = %session_id,
            collection = %collection,
            role = %role,
            "Message appended"
        );
        Ok(message)
    }

    /// All records for a session in a collection, oldest first.
    pub async fn messages_for(
        &self,
        collection: &CollectionName,
        session_id: &SessionId,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        self.repo.find_messages(collection, session_id, None).await
    }

    /// The earliest record for a session in a collection.
    pub async fn first_message(
        &self,
        collection: &CollectionName,
        session_id: &SessionId,
    ) -> Result<Option<StoredMessage>, RepositoryError> {
        let mut first = self.repo.find_messages(collection, session_id, Some(1)).await?;
        Ok(first.pop())
    }

    /// Distinct session ids held in one collection.
    pub async fn sessions_in(
        &self,
        collection: &CollectionName,
    ) -> Result<Vec<SessionId>, RepositoryError> {
        self.repo.distinct_sessions(collection).await
    }

    /// Distinct session ids across every reserved collection, deduplicated,
    /// in first-seen order.
    pub async fn all_sessions(&self) -> Result<Vec<SessionId>, RepositoryError> {
        let mut seen: HashSet<SessionId> = HashSet::new();
        let mut sessions: Vec<SessionId> = Vec::new();
        for collection in self.list_reserved_collections().await? {
            for session_id in self.repo.distinct_sessions(&collection).await? {
                if seen.insert(session_id.clone()) {
                    sessions.push(session_id);
                }
            }
        }
        Ok(sessions)
    }
}
