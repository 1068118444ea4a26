//! Session context for a single user interaction, and the allocator that
//! hands out session ids.
//!
//! A context holds what the browser UI keeps across reloads: the active
//! session id, the collection new messages are written to, the session ids
//! this client has seen, and the in-memory conversation.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Local};
use tokio::sync::Mutex;

use chatkeep_types::chat::{CollectionName, Conversation, SessionId};

/// Per-client chat state.
///
/// The conversation is a transient projection of the store; it is rebuilt
/// whenever the active session changes.
#[derive(Debug, Clone)]
pub struct SessionContext {
    session_id: SessionId,
    current_collection: Option<CollectionName>,
    known_sessions: Vec<SessionId>,
    conversation: Conversation,
}

impl SessionContext {
    /// Fresh context for a given session id, with no current collection.
    pub fn with_session(session_id: SessionId, system_prompt: &str) -> Self {
        Self {
            known_sessions: vec![session_id.clone()],
            session_id,
            current_collection: None,
            conversation: Conversation::new(system_prompt),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Make `session_id` the active session and remember it.
    pub fn set_session_id(&mut self, session_id: SessionId) {
        self.remember_session(session_id.clone());
        self.session_id = session_id;
    }

    /// Collection new messages go to when the session has none yet.
    pub fn current_collection(&self) -> Option<&CollectionName> {
        self.current_collection.as_ref()
    }

    pub fn set_current_collection(&mut self, collection: CollectionName) {
        self.current_collection = Some(collection);
    }

    /// Session ids seen by this context, oldest first, without duplicates.
    pub fn known_sessions(&self) -> &[SessionId] {
        &self.known_sessions
    }

    pub fn remember_session(&mut self, session_id: SessionId) {
        if !self.known_sessions.contains(&session_id) {
            self.known_sessions.push(session_id);
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    pub fn replace_conversation(&mut self, conversation: Conversation) {
        self.conversation = conversation;
    }
}

/// Hands out clock-derived session ids that are unique across every live
/// context and every stored session.
///
/// Ids keep the `%Y%m%d_%H%M%S` shape, so a second that is already taken is
/// skipped by moving the candidate one second forward.
#[derive(Debug, Default)]
pub struct SessionIdAllocator {
    issued: Mutex<HashSet<SessionId>>,
}

impl SessionIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first free id at or after `start`.
    ///
    /// `stored` lists the session ids already in the store; ids handed out
    /// earlier by this allocator are never returned twice.
    pub async fn allocate(&self, start: DateTime<Local>, stored: &[SessionId]) -> SessionId {
        let stored: HashSet<&SessionId> = stored.iter().collect();
        let floor = SessionId::from_datetime(&start);

        let mut issued = self.issued.lock().await;
        // Candidates never sort below `floor`, so older entries cannot collide
        issued.retain(|id| id >= &floor);

        let mut at = start;
        loop {
            let candidate = SessionId::from_datetime(&at);
            if !stored.contains(&candidate) && !issued.contains(&candidate) {
                issued.insert(candidate.clone());
                return candidate;
            }
            at += Duration::seconds(1);
        }
    }
}
