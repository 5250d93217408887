use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A row in the `conversations` table.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Fresh conversation with a random id, stamped now.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
