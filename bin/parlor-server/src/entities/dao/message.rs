use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A single message row in the `messages` table.
///
/// Rows are immutable once inserted; a conversation's transcript only ever
/// grows until the conversation itself is deleted.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    /// `"user"` or `"assistant"`.
    pub role: String,
    /// `"text"`, or `"image"` when `content` is an image URL.
    pub kind: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(conversation_id: impl Into<String>, content: impl Into<String>, kind: &str) -> Self {
        Self::stamped(conversation_id, "user", kind, content)
    }

    pub fn assistant(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::stamped(conversation_id, "assistant", "text", content)
    }

    fn stamped(
        conversation_id: impl Into<String>,
        role: &str,
        kind: &str,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.into(),
            role: role.to_owned(),
            kind: kind.to_owned(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
