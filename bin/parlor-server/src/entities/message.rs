use std::future::Future;

use crate::entities::conversation::parse_timestamp;
use crate::entities::{SqliteStore, dao::Message};

pub trait MessageStore: Send + Sync + 'static {
    fn append_message(&self, msg: Message) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Full transcript for one conversation, ascending by creation time
    /// (`rowid` breaks ties between same-instant inserts).
    fn list_messages(
        &self,
        conversation_id: &str,
    ) -> impl Future<Output = Result<Vec<Message>, sqlx::Error>> + Send;
}

impl MessageStore for SqliteStore {
    async fn append_message(&self, msg: Message) -> Result<(), sqlx::Error> {
        let created_at = msg.created_at.to_rfc3339();
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, kind, content, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&msg.id)
        .bind(&msg.conversation_id)
        .bind(&msg.role)
        .bind(&msg.kind)
        .bind(&msg.content)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, sqlx::Error> {
        let rows: Vec<(String, String, String, String, String, String)> = sqlx::query_as(
            "SELECT id, conversation_id, role, kind, content, created_at \
               FROM messages WHERE conversation_id = ?1 \
              ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(
                |(id, conversation_id, role, kind, content, created_at)| Message {
                    id,
                    conversation_id,
                    role,
                    kind,
                    content,
                    created_at: parse_timestamp(&created_at),
                },
            )
            .collect())
    }
}
