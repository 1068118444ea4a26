//! SQLite message repository implementation.
//!
//! Implements `MessageRepository` from `chatkeep-core` using sqlx with split
//! read/write pools. Collections are rows in `collections`; every stored turn
//! is a row in `chat_messages` tagged with its collection name.

use chatkeep_core::chat::repository::MessageRepository;
use chatkeep_types::chat::{CollectionName, SessionId, StoredMessage, StoredRole};
use chatkeep_types::error::RepositoryError;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `MessageRepository`.
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct StoredMessageRow {
    session_id: String,
    role: String,
    content: String,
    created_at: String,
}

impl StoredMessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            session_id: row.try_get("session_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<StoredMessage, RepositoryError> {
        let role: StoredRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let timestamp = parse_datetime(&self.created_at)?;

        Ok(StoredMessage {
            session_id: SessionId::new(self.session_id),
            role,
            content: self.content,
            timestamp,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width UTC timestamps so lexicographic order is chronological.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// MessageRepository implementation
// ---------------------------------------------------------------------------

impl MessageRepository for SqliteMessageRepository {
    async fn list_collections(&self) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query("SELECT name FROM collections ORDER BY rowid ASC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("name")
                    .map_err(|e| RepositoryError::Query(e.to_string()))
            })
            .collect()
    }

    async fn insert_message(
        &self,
        collection: &CollectionName,
        message: &StoredMessage,
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;

        // Two writers that allocated the same suffix both land here; the
        // second registration is ignored.
        sqlx::query("INSERT OR IGNORE INTO collections (name, created_at) VALUES (?, ?)")
            .bind(collection.as_str())
            .bind(format_datetime(&Utc::now()))
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO chat_messages (collection, session_id, role, content, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(collection.as_str())
        .bind(message.session_id.as_str())
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(format_datetime(&message.timestamp))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn find_messages(
        &self,
        collection: &CollectionName,
        session_id: &SessionId,
        limit: Option<i64>,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        // SQLite treats a negative LIMIT as unbounded
        let rows = sqlx::query(
            r#"SELECT session_id, role, content, created_at FROM chat_messages
               WHERE collection = ? AND session_id = ?
               ORDER BY created_at ASC, seq ASC
               LIMIT ?"#,
        )
        .bind(collection.as_str())
        .bind(session_id.as_str())
        .bind(limit.unwrap_or(-1))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let msg_row =
                StoredMessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            messages.push(msg_row.into_message()?);
        }

        Ok(messages)
    }

    async fn contains_session(
        &self,
        collection: &CollectionName,
        session_id: &SessionId,
    ) -> Result<bool, RepositoryError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM chat_messages WHERE collection = ? AND session_id = ?) AS found",
        )
        .bind(collection.as_str())
        .bind(session_id.as_str())
        .fetch_one(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let found: i64 = row
            .try_get("found")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(found != 0)
    }

    async fn distinct_sessions(
        &self,
        collection: &CollectionName,
    ) -> Result<Vec<SessionId>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT session_id FROM chat_messages
               WHERE collection = ?
               GROUP BY session_id
               ORDER BY MIN(seq) ASC"#,
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("session_id")
                    .map(SessionId::new)
                    .map_err(|e| RepositoryError::Query(e.to_string()))
            })
            .collect()
    }
}
