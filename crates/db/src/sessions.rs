use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use thiserror::Error;
use tracing::warn;

use swapdesk_core::domain::session::ConversationSession;
use swapdesk_core::errors::ApplicationError;
use swapdesk_core::session::SessionStore;

use crate::DbPool;

#[derive(Debug, Error)]
pub enum SessionRepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<SessionRepositoryError> for ApplicationError {
    fn from(error: SessionRepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

/// Durable sessions, one JSON document per conversation.
pub struct SqlSessionStore {
    pool: DbPool,
}

impl SqlSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn load(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationSession>, SessionRepositoryError> {
        let row = sqlx::query(
            "SELECT session_json FROM conversation_session WHERE conversation_id = ?",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let json: String = row.try_get("session_json")?;
            serde_json::from_str(&json)
                .map_err(|error| SessionRepositoryError::Decode(error.to_string()))
        })
        .transpose()
    }

    pub async fn save(
        &self,
        conversation_id: &str,
        session: &ConversationSession,
    ) -> Result<(), SessionRepositoryError> {
        let json = serde_json::to_string(session)
            .map_err(|error| SessionRepositoryError::Decode(error.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO conversation_session (conversation_id, session_json, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(conversation_id) DO UPDATE SET
                session_json = excluded.session_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(conversation_id)
        .bind(json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, conversation_id: &str) -> Result<(), SessionRepositoryError> {
        sqlx::query("DELETE FROM conversation_session WHERE conversation_id = ?")
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqlSessionStore {
    async fn get(&self, conversation_id: &str) -> ConversationSession {
        match self.load(conversation_id).await {
            Ok(session) => session.unwrap_or_default(),
            Err(error) => {
                warn!(
                    event_name = "session.load_failed",
                    conversation_id,
                    error = %error,
                    "session unreadable; starting from defaults"
                );
                ConversationSession::default()
            }
        }
    }

    async fn set(
        &self,
        conversation_id: &str,
        session: ConversationSession,
    ) -> Result<(), ApplicationError> {
        Ok(self.save(conversation_id, &session).await?)
    }

    async fn reset(&self, conversation_id: &str) -> Result<(), ApplicationError> {
        Ok(self.delete(conversation_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use swapdesk_core::domain::session::ConversationSession;
    use swapdesk_core::session::SessionStore;

    use super::SqlSessionStore;
    use crate::{connect_with_settings, migrations::run_pending};

    async fn store() -> SqlSessionStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrations");
        SqlSessionStore::new(pool)
    }

    #[tokio::test]
    async fn missing_rows_read_as_default_sessions() {
        let store = store().await;
        assert_eq!(store.get("room").await, ConversationSession::default());
    }

    #[tokio::test]
    async fn corrupt_rows_read_as_default_sessions() {
        let store = store().await;
        sqlx::query(
            "INSERT INTO conversation_session (conversation_id, session_json, updated_at)
             VALUES ('room', 'not json', '2026-01-01T00:00:00Z')",
        )
        .execute(&store.pool)
        .await
        .expect("insert corrupt row");

        assert!(store.load("room").await.is_err());
        assert_eq!(store.get("room").await, ConversationSession::default());
    }

    #[tokio::test]
    async fn set_then_reset_round_trips_through_sqlite() {
        let store = store().await;
        let session = ConversationSession { slippage_percent: 5, ..ConversationSession::default() }
            .with_decryption_warned();

        store.set("room", session.clone()).await.expect("set");
        assert_eq!(store.get("room").await, session);

        store.reset("room").await.expect("reset");
        assert_eq!(store.get("room").await, ConversationSession::default());
    }
}
