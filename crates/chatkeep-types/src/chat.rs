//! Chat session, collection, message, and conversation types for chatkeep.
//!
//! Stored messages live in numbered collections (`chat_history_1`,
//! `chat_history_2`, ...). A session's history is the ordered set of records
//! sharing its `SessionId`; the in-memory `Conversation` is rebuilt from it.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

pub use crate::llm::{Message, MessageRole};

/// Name prefix shared by every reserved message collection.
pub const COLLECTION_PREFIX: &str = "chat_history_";

/// System turn that opens every conversation. Never persisted, never displayed.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant";

/// Preview shown for a session without stored messages.
pub const EMPTY_CHAT_PREVIEW: &str = "Empty chat";

/// Number of characters kept in a session preview before the ellipsis.
pub const PREVIEW_CHARS: usize = 30;

const SESSION_ID_FORMAT: &str = "%Y%m%d_%H%M%S";
const SESSION_LABEL_FORMAT: &str = "%Y-%m-%d %H:%M";

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Opaque, timestamp-derived session identifier (`20250131_142501`).
///
/// Ordering is lexicographic, which for well-formed ids is chronological.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an existing identifier without validation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive an identifier from a wall-clock instant.
    pub fn from_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self(at.format(SESSION_ID_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The creation instant encoded in the id, if it is well-formed.
    pub fn started_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.0, SESSION_ID_FORMAT).ok()
    }

    /// Human-readable sidebar label (`2025-01-31 14:25`).
    ///
    /// Ids that do not follow the timestamp format are shown verbatim.
    pub fn label(&self) -> String {
        match self.started_at() {
            Some(at) => at.format(SESSION_LABEL_FORMAT).to_string(),
            None => self.0.clone(),
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// CollectionName
// ---------------------------------------------------------------------------

/// A reserved message collection: `COLLECTION_PREFIX` followed by an integer suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionName {
    name: String,
    suffix: u64,
}

impl CollectionName {
    /// Build the canonical name for a suffix (`chat_history_{suffix}`).
    pub fn with_suffix(suffix: u64) -> Self {
        Self {
            name: format!("{COLLECTION_PREFIX}{suffix}"),
            suffix,
        }
    }

    /// Parse a raw collection name.
    ///
    /// Returns `None` for names outside the reserved pattern, including names
    /// that carry the prefix but a non-numeric suffix.
    pub fn parse(raw: &str) -> Option<Self> {
        let digits = raw.strip_prefix(COLLECTION_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let suffix = digits.parse().ok()?;
        Some(Self {
            name: raw.to_string(),
            suffix,
        })
    }

    /// The successor of the highest suffix in `existing`, or suffix 1 when empty.
    ///
    /// Returns `None` when the highest suffix is already `u64::MAX`.
    pub fn next_after<'a, I>(existing: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a CollectionName>,
    {
        let next = match existing.into_iter().map(|c| c.suffix).max() {
            Some(max) => max.checked_add(1)?,
            None => 1,
        };
        Some(Self::with_suffix(next))
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn suffix(&self) -> u64 {
        self.suffix
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for CollectionName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("not a reserved collection name: '{s}'"))
    }
}

impl TryFrom<String> for CollectionName {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CollectionName> for String {
    fn from(c: CollectionName) -> Self {
        c.name
    }
}

// ---------------------------------------------------------------------------
// Stored records
// ---------------------------------------------------------------------------

/// Role of a persisted message. System turns are never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoredRole {
    User,
    Assistant,
}

impl fmt::Display for StoredRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoredRole::User => write!(f, "user"),
            StoredRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for StoredRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(StoredRole::User),
            "assistant" => Ok(StoredRole::Assistant),
            other => Err(format!("invalid stored role: '{other}'")),
        }
    }
}

impl From<StoredRole> for MessageRole {
    fn from(role: StoredRole) -> Self {
        match role {
            StoredRole::User => MessageRole::User,
            StoredRole::Assistant => MessageRole::Assistant,
        }
    }
}

/// One persisted chat message.
///
/// Within a session, records are ordered by `timestamp`; ties fall back to
/// store insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub session_id: SessionId,
    pub role: StoredRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<StoredMessage> for Message {
    fn from(record: StoredMessage) -> Self {
        Message {
            role: record.role.into(),
            content: record.content,
        }
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// In-memory conversation for the active session.
///
/// Always prefixed by exactly one synthetic system turn; `turns` holds only
/// user and assistant messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    system_prompt: String,
    turns: Vec<Message>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            turns: Vec::new(),
        }
    }

    /// Rebuild a conversation from stored records, preserving their order.
    pub fn from_records<I>(system_prompt: impl Into<String>, records: I) -> Self
    where
        I: IntoIterator<Item = StoredMessage>,
    {
        Self {
            system_prompt: system_prompt.into(),
            turns: records.into_iter().map(Message::from).collect(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// User and assistant turns, in order (what the UI displays).
    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    /// Full message list for the model: system turn first.
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.turns.len() + 1);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend(self.turns.iter().cloned());
        messages
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Message::assistant(content));
    }

    /// Drop all turns, keeping the system prompt.
    pub fn reset(&mut self) {
        self.turns.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

/// Sidebar entry for a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub label: String,
    pub preview: String,
}

/// Truncate the first message of a session into a sidebar preview.
///
/// Content longer than `PREVIEW_CHARS` characters keeps its first
/// `PREVIEW_CHARS` characters followed by `"..."`; shorter content is
/// returned unchanged.
pub fn preview_text(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}
