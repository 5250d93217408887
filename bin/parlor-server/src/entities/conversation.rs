use std::future::Future;

use chrono::{DateTime, Utc};

use crate::entities::{SqliteStore, dao::Conversation};

/// A conversation as shown in the sidebar list: its newest message stands in
/// as the preview (`None` when the conversation is still empty).
#[derive(Debug, Clone)]
pub struct ConversationPreview {
    pub id: String,
    pub preview: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub trait ConversationStore: Send + Sync + 'static {
    fn create_conversation(
        &self,
        conversation: Conversation,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_conversation(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Conversation>, sqlx::Error>> + Send;
    /// Newest-first listing with each conversation's latest message content.
    fn list_conversations(
        &self,
    ) -> impl Future<Output = Result<Vec<ConversationPreview>, sqlx::Error>> + Send;
    /// Deletes the conversation's messages, then the conversation row.
    /// Idempotent: deleting an unknown id succeeds.
    fn delete_conversation(&self, id: &str) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

impl ConversationStore for SqliteStore {
    async fn create_conversation(&self, conversation: Conversation) -> Result<(), sqlx::Error> {
        let created_at = conversation.created_at.to_rfc3339();
        sqlx::query("INSERT INTO conversations (id, created_at) VALUES (?1, ?2)")
            .bind(&conversation.id)
            .bind(&created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, sqlx::Error> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT id, created_at FROM conversations WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, created_at)| Conversation {
            id,
            created_at: parse_timestamp(&created_at),
        }))
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationPreview>, sqlx::Error> {
        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
            "SELECT c.id, c.created_at, \
                    (SELECT m.content FROM messages m \
                      WHERE m.conversation_id = c.id \
                      ORDER BY m.created_at DESC, m.rowid DESC \
                      LIMIT 1) AS preview \
               FROM conversations c \
              ORDER BY c.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, created_at, preview)| ConversationPreview {
                id,
                preview,
                created_at: parse_timestamp(&created_at),
            })
            .collect())
    }

    async fn delete_conversation(&self, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM messages WHERE conversation_id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM conversations WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        tracing::warn!(raw = %raw, error = %e, "failed to parse stored timestamp; using now");
        Utc::now()
    })
}
