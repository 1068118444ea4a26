//! History reconstruction and sidebar previews.

use tracing::debug;

use chatkeep_types::chat::{
    CollectionName, Conversation, EMPTY_CHAT_PREVIEW, Message, SessionId, preview_text,
};
use chatkeep_types::error::RepositoryError;

use super::repository::MessageRepository;
use super::session::SessionContext;
use super::store::MessageStore;

/// Rebuilds ordered conversations from stored records.
pub struct HistoryReconstructor<'a, R: MessageRepository> {
    store: &'a MessageStore<R>,
    system_prompt: &'a str,
}

impl<'a, R: MessageRepository> HistoryReconstructor<'a, R> {
    pub fn new(store: &'a MessageStore<R>, system_prompt: &'a str) -> Self {
        Self {
            store,
            system_prompt,
        }
    }

    /// First reserved collection holding the session, in enumeration order.
    pub async fn locate(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<CollectionName>, RepositoryError> {
        self.store.find_collection_for_session(session_id).await
    }

    /// Stored user/assistant turns for a session, oldest first.
    ///
    /// Unknown sessions load as an empty list.
    pub async fn load(&self, session_id: &SessionId) -> Result<Vec<Message>, RepositoryError> {
        let Some(collection) = self.locate(session_id).await? else {
            return Ok(Vec::new());
        };
        let records = self.store.messages_for(&collection, session_id).await?;
        Ok(records.into_iter().map(Message::from).collect())
    }

    /// Rebuild the context's conversation for `session_id`.
    ///
    /// When the session is found, its collection becomes the context's
    /// current collection. Returns the number of restored turns.
    pub async fn load_into(
        &self,
        ctx: &mut SessionContext,
        session_id: &SessionId,
    ) -> Result<usize, RepositoryError> {
        let records = match self.locate(session_id).await? {
            Some(collection) => {
                let records = self.store.messages_for(&collection, session_id).await?;
                ctx.set_current_collection(collection);
                records
            }
            None => Vec::new(),
        };

        let restored = records.len();
        ctx.replace_conversation(Conversation::from_records(self.system_prompt, records));
        debug!(session_id = %session_id, turns = restored, "Conversation rebuilt");
        Ok(restored)
    }

    /// Sidebar preview: the session's earliest message, truncated.
    pub async fn preview(&self, session_id: &SessionId) -> Result<String, RepositoryError> {
        let Some(collection) = self.locate(session_id).await? else {
            return Ok(EMPTY_CHAT_PREVIEW.to_string());
        };
        Ok(match self.store.first_message(&collection, session_id).await? {
            Some(first) => preview_text(&first.content),
            None => EMPTY_CHAT_PREVIEW.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::testing::MockRepository;
    use chatkeep_types::chat::{DEFAULT_SYSTEM_PROMPT, MessageRole, StoredMessage, StoredRole};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    async fn insert(
        store: &MessageStore<MockRepository>,
        collection: u64,
        session: &str,
        role: StoredRole,
        content: &str,
        secs: i64,
    ) {
        let record = StoredMessage {
            session_id: SessionId::new(session),
            role,
            content: content.to_string(),
            timestamp: at(secs),
        };
        store
            .repo()
            .insert_message(&CollectionName::with_suffix(collection), &record)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_load_orders_by_timestamp() {
        let store = MessageStore::new(MockRepository::new());
        insert(&store, 1, "s", StoredRole::User, "third", 3).await;
        insert(&store, 1, "s", StoredRole::User, "first", 1).await;
        insert(&store, 1, "s", StoredRole::Assistant, "second", 2).await;

        let history = HistoryReconstructor::new(&store, DEFAULT_SYSTEM_PROMPT);
        let turns = history.load(&SessionId::new("s")).await.unwrap();
        let contents: Vec<&str> = turns.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_load_user_then_assistant() {
        let store = MessageStore::new(MockRepository::new());
        let c = CollectionName::with_suffix(1);
        let s = SessionId::new("20250101_000000");
        store.append(&c, &s, StoredRole::User, "question").await.unwrap();
        store.append(&c, &s, StoredRole::Assistant, "answer").await.unwrap();

        let history = HistoryReconstructor::new(&store, DEFAULT_SYSTEM_PROMPT);
        let turns = history.load(&s).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], Message::user("question"));
        assert_eq!(turns[1], Message::assistant("answer"));
    }

    #[tokio::test]
    async fn test_load_ties_keep_insertion_order() {
        let store = MessageStore::new(MockRepository::new());
        insert(&store, 1, "s", StoredRole::User, "a", 5).await;
        insert(&store, 1, "s", StoredRole::Assistant, "b", 5).await;

        let history = HistoryReconstructor::new(&store, DEFAULT_SYSTEM_PROMPT);
        let turns = history.load(&SessionId::new("s")).await.unwrap();
        assert_eq!(turns[0].role, MessageRole::User);
        assert_eq!(turns[1].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn test_load_unknown_session_is_empty() {
        let store = MessageStore::new(MockRepository::with_collections(&["chat_history_1"]));
        let history = HistoryReconstructor::new(&store, DEFAULT_SYSTEM_PROMPT);
        let turns = history.load(&SessionId::new("nope")).await.unwrap();
        assert!(turns.is_empty());
    }

    #[tokio::test]
    async fn test_load_only_reads_first_matching_collection() {
        let store = MessageStore::new(MockRepository::new());
        insert(&store, 1, "s", StoredRole::User, "in one", 1).await;
        insert(&store, 2, "s", StoredRole::User, "in two", 2).await;

        let history = HistoryReconstructor::new(&store, DEFAULT_SYSTEM_PROMPT);
        let turns = history.load(&SessionId::new("s")).await.unwrap();
        assert_eq!(turns, vec![Message::user("in one")]);
    }

    #[tokio::test]
    async fn test_load_into_sets_collection_and_prefix() {
        let store = MessageStore::new(MockRepository::new());
        insert(&store, 3, "s", StoredRole::User, "hi", 1).await;
        insert(&store, 3, "s", StoredRole::Assistant, "hello", 2).await;

        let mut ctx = SessionContext::with_session(SessionId::new("s"), "Be brief");
        let history = HistoryReconstructor::new(&store, "Be brief");
        let restored = history.load_into(&mut ctx, &SessionId::new("s")).await.unwrap();

        assert_eq!(restored, 2);
        assert_eq!(ctx.current_collection().map(|c| c.suffix()), Some(3));
        let messages = ctx.conversation().messages();
        assert_eq!(messages[0], Message::system("Be brief"));
        assert_eq!(messages.len(), 3);
    }

    #[tokio::test]
    async fn test_load_into_unknown_keeps_current_collection() {
        let store = MessageStore::new(MockRepository::new());
        let mut ctx = SessionContext::with_session(SessionId::new("s"), DEFAULT_SYSTEM_PROMPT);
        ctx.set_current_collection(CollectionName::with_suffix(9));
        ctx.conversation_mut().push_user("stale");

        let history = HistoryReconstructor::new(&store, DEFAULT_SYSTEM_PROMPT);
        let restored = history.load_into(&mut ctx, &SessionId::new("other")).await.unwrap();

        assert_eq!(restored, 0);
        assert!(ctx.conversation().is_empty());
        assert_eq!(ctx.current_collection().map(|c| c.suffix()), Some(9));
    }

    #[tokio::test]
    async fn test_preview_truncates_first_message() {
        let store = MessageStore::new(MockRepository::new());
        let long = "Tell me everything about the history of Rome";
        insert(&store, 1, "s", StoredRole::Assistant, "later reply", 9).await;
        insert(&store, 1, "s", StoredRole::User, long, 1).await;

        let history = HistoryReconstructor::new(&store, DEFAULT_SYSTEM_PROMPT);
        let preview = history.preview(&SessionId::new("s")).await.unwrap();
        assert_eq!(preview, format!("{}...", &long[..30]));
    }

    #[tokio::test]
    async fn test_preview_short_message_unchanged() {
        let store = MessageStore::new(MockRepository::new());
        insert(&store, 1, "s", StoredRole::User, "hello there", 1).await;

        let history = HistoryReconstructor::new(&store, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(history.preview(&SessionId::new("s")).await.unwrap(), "hello there");
    }

    #[tokio::test]
    async fn test_preview_empty_session_placeholder() {
        let store = MessageStore::new(MockRepository::new());
        let history = HistoryReconstructor::new(&store, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(history.preview(&SessionId::new("s")).await.unwrap(), "Empty chat");
    }

    #[tokio::test]
    async fn test_round_trip_equals_conversation_without_system() {
        let store = MessageStore::new(MockRepository::new());
        let c = CollectionName::with_suffix(1);
        let s = SessionId::new("20250101_000000");

        let mut original = Conversation::default();
        for (i, content) in ["one", "two", "three", "four"].iter().enumerate() {
            let role = if i % 2 == 0 { StoredRole::User } else { StoredRole::Assistant };
            match role {
                StoredRole::User => original.push_user(*content),
                StoredRole::Assistant => original.push_assistant(*content),
            }
            store.append(&c, &s, role, content).await.unwrap();
        }

        let history = HistoryReconstructor::new(&store, DEFAULT_SYSTEM_PROMPT);
        let loaded = history.load(&s).await.unwrap();
        assert_eq!(loaded, original.messages()[1..].to_vec());
    }
}
