//! MessageRepository trait definition.
//!
//! The document-store port: enumerate collections, find records by session
//! with a timestamp sort, and insert one record. Follows the RPITIT pattern
//! used by the LLM provider trait.

use chatkeep_types::chat::{CollectionName, SessionId, StoredMessage};
use chatkeep_types::error::RepositoryError;

/// Repository trait for chat message persistence.
///
/// Implementations live in chatkeep-infra (e.g., `SqliteMessageRepository`).
/// The store performs no schema enforcement of its own beyond what the
/// types carry; callers own the structural invariants.
pub trait MessageRepository: Send + Sync {
    /// All collection names, reserved or not, in store enumeration order.
    fn list_collections(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, RepositoryError>> + Send;

    /// Insert one record, creating the collection on first use.
    ///
    /// Not idempotent: repeated calls store repeated records.
    fn insert_message(
        &self,
        collection: &CollectionName,
        message: &StoredMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Records for a session within one collection, ordered by timestamp
    /// ascending with insertion order breaking ties.
    fn find_messages(
        &self,
        collection: &CollectionName,
        session_id: &SessionId,
        limit: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<StoredMessage>, RepositoryError>> + Send;

    /// Whether the collection holds at least one record for the session.
    fn contains_session(
        &self,
        collection: &CollectionName,
        session_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Distinct session ids stored in a collection.
    fn distinct_sessions(
        &self,
        collection: &CollectionName,
    ) -> impl std::future::Future<Output = Result<Vec<SessionId>, RepositoryError>> + Send;
}
