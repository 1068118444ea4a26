//! Registry of per-client session contexts.
//!
//! One entry per `X-Client-Id`. Entries idle longer than the idle timeout
//! are dropped, and the map never grows past `max_clients`: when full, the
//! least recently seen client is evicted to make room. Eviction only drops
//! the in-memory context; stored messages stay in the database.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use chatkeep_core::chat::session::SessionContext;

/// Shared handle to one client's session context.
pub type SharedContext = Arc<Mutex<SessionContext>>;

/// Default time after which an unused client context is dropped.
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default maximum number of client contexts kept in memory.
const DEFAULT_MAX_CLIENTS: usize = 1_000;

struct ClientEntry {
    context: SharedContext,
    last_seen: Instant,
}

/// Client id -> session context map with idle and size limits.
pub struct ClientRegistry {
    clients: DashMap<String, ClientEntry>,
    idle_timeout: Duration,
    max_clients: usize,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_CLIENTS)
    }
}

impl ClientRegistry {
    /// Registry with a custom idle timeout and size cap (`max_clients` >= 1).
    pub fn with_limits(idle_timeout: Duration, max_clients: usize) -> Self {
        Self {
            clients: DashMap::new(),
            idle_timeout,
            max_clients: max_clients.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.clients.contains_key(client_id)
    }

    /// The client's context, marking the client as seen now.
    pub fn touch(&self, client_id: &str) -> Option<SharedContext> {
        let mut entry = self.clients.get_mut(client_id)?;
        entry.last_seen = Instant::now();
        Some(entry.context.clone())
    }

    /// Register `context` for `client_id` and return the client's context.
    ///
    /// If another request registered the client first, that context wins and
    /// `context` is dropped. Idle clients are swept, then the least recently
    /// seen ones are evicted until there is room.
    pub fn insert(&self, client_id: &str, context: SessionContext) -> SharedContext {
        if let Some(existing) = self.touch(client_id) {
            return existing;
        }

        self.evict_idle();
        self.make_room();

        let mut entry = self
            .clients
            .entry(client_id.to_string())
            .or_insert_with(|| ClientEntry {
                context: Arc::new(Mutex::new(context)),
                last_seen: Instant::now(),
            });
        entry.last_seen = Instant::now();
        entry.context.clone()
    }

    /// Drop every client not seen within the idle timeout. Returns how many
    /// were dropped.
    pub fn evict_idle(&self) -> usize {
        let before = self.clients.len();
        let timeout = self.idle_timeout;
        self.clients.retain(|_, entry| entry.last_seen.elapsed() < timeout);
        let evicted = before.saturating_sub(self.clients.len());
        if evicted > 0 {
            debug!(evicted, remaining = self.clients.len(), "Evicted idle client contexts");
        }
        evicted
    }

    fn make_room(&self) {
        while self.clients.len() >= self.max_clients {
            let oldest = self
                .clients
                .iter()
                .min_by_key(|entry| entry.last_seen)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(client_id) => {
                    self.clients.remove(&client_id);
                    debug!(client_id = %client_id, "Evicted least recently seen client context");
                }
                None => break,
            }
        }
    }
}
