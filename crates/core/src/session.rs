//! Per-conversation negotiation state.
//!
//! Stores replace whole values only: callers read a session, derive a new one
//! and write it back. Serializing that read-modify-write per conversation is
//! the dispatcher's job.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::session::ConversationSession;
use crate::errors::ApplicationError;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Defaults when nothing is stored. Never fails.
    async fn get(&self, conversation_id: &str) -> ConversationSession;
    async fn set(
        &self,
        conversation_id: &str,
        session: ConversationSession,
    ) -> Result<(), ApplicationError>;
    async fn reset(&self, conversation_id: &str) -> Result<(), ApplicationError>;
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, ConversationSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, conversation_id: &str) -> ConversationSession {
        let sessions = self.sessions.read().await;
        sessions.get(conversation_id).cloned().unwrap_or_default()
    }

    async fn set(
        &self,
        conversation_id: &str,
        session: ConversationSession,
    ) -> Result<(), ApplicationError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(conversation_id.to_string(), session);
        Ok(())
    }

    async fn reset(&self, conversation_id: &str) -> Result<(), ApplicationError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(conversation_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemorySessionStore, SessionStore};
    use crate::domain::session::ConversationSession;

    #[tokio::test]
    async fn unknown_conversation_reads_as_defaults() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.get("!room:example.org").await, ConversationSession::default());
    }

    #[tokio::test]
    async fn set_replaces_the_whole_session() {
        let store = InMemorySessionStore::new();
        let warned = ConversationSession::default().with_decryption_warned();
        store.set("room", warned).await.expect("set");

        let replaced = ConversationSession { slippage_percent: 4, ..ConversationSession::default() };
        store.set("room", replaced.clone()).await.expect("set");

        let stored = store.get("room").await;
        assert_eq!(stored, replaced);
        assert!(!stored.decryption_warned);
    }

    #[tokio::test]
    async fn reset_discards_state_for_that_conversation_only() {
        let store = InMemorySessionStore::new();
        let custom = ConversationSession { slippage_percent: 3, ..ConversationSession::default() };
        store.set("a", custom.clone()).await.expect("set a");
        store.set("b", custom.clone()).await.expect("set b");

        store.reset("a").await.expect("reset");

        assert_eq!(store.get("a").await, ConversationSession::default());
        assert_eq!(store.get("b").await, custom);
    }
}
