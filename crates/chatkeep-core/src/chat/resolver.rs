//! Session -> collection resolution.
//!
//! Messages for a session always go to the collection that already holds
//! the session. A session without stored messages is written to the
//! context's current collection, which is allocated on demand with the
//! `max + 1` suffix scheme.
//!
//! Allocation is not synchronized: two contexts computing the next name
//! before either inserts pick the same suffix. The store registers
//! collections with insert-or-ignore, so both end up sharing one
//! collection. Lookups are by session id, so sharing is harmless.

use tracing::{debug, info};

use chatkeep_types::chat::{CollectionName, SessionId};
use chatkeep_types::error::RepositoryError;

use super::repository::MessageRepository;
use super::session::SessionContext;
use super::store::MessageStore;

pub struct SessionResolver<'a, R: MessageRepository> {
    store: &'a MessageStore<R>,
}

impl<'a, R: MessageRepository> SessionResolver<'a, R> {
    pub fn new(store: &'a MessageStore<R>) -> Self {
        Self { store }
    }

    /// The successor of the highest reserved suffix, or suffix 1 when the
    /// store holds no reserved collections.
    ///
    /// Fails with `SuffixExhausted` once a collection with suffix `u64::MAX`
    /// exists.
    pub async fn next_collection_name(&self) -> Result<CollectionName, RepositoryError> {
        let existing = self.store.list_reserved_collections().await?;
        CollectionName::next_after(&existing).ok_or_else(|| {
            let highest = existing
                .iter()
                .max_by_key(|c| c.suffix())
                .map(|c| c.as_str().to_string())
                .unwrap_or_default();
            RepositoryError::SuffixExhausted(highest)
        })
    }

    /// Collection that messages for `session_id` should be written to.
    ///
    /// A collection already holding the session wins and becomes the
    /// context's current collection.
    pub async fn resolve_or_create(
        &self,
        session_id: &SessionId,
        ctx: &mut SessionContext,
    ) -> Result<CollectionName, RepositoryError> {
        if let Some(found) = self.store.find_collection_for_session(session_id).await? {
            ctx.set_current_collection(found.clone());
            return Ok(found);
        }

        if let Some(current) = ctx.current_collection() {
            return Ok(current.clone());
        }

        let allocated = self.next_collection_name().await?;
        debug!(session_id = %session_id, collection = %allocated, "Allocated collection");
        ctx.set_current_collection(allocated.clone());
        Ok(allocated)
    }

    /// Point the context at a freshly numbered collection ("New chat").
    pub async fn start_new_collection(
        &self,
        ctx: &mut SessionContext,
    ) -> Result<CollectionName, RepositoryError> {
        let next = self.next_collection_name().await?;
        info!(collection = %next, "Starting new collection");
        ctx.set_current_collection(next.clone());
        Ok(next)
    }
}
