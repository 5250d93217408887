//! Conversation API request / response types.
//!
//! JSON keys are camelCase on the wire, matching what the web client
//! expects; internal field names stay snake_case.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{ConversationPreview, dao::Message};

/// Shown in the conversation list: `preview` is the latest message content.
pub const NEW_CHAT_PREVIEW: &str = "New Chat";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub preview: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateConversationResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageView {
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
    /// `"text"` or `"image"`.
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub messages: Vec<MessageView>,
}

/// Body of `POST /api/conversations/{id}`; exactly one of `text` /
/// `imageRef` carries the new user turn (both may be absent).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageResponse {
    /// Authoritative conversation id; differs from the path id when the
    /// server had to create a fresh conversation.
    pub conversation_id: String,
    pub reply: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteConversationResponse {
    pub success: bool,
}

impl ConversationSummary {
    pub fn from_preview(p: ConversationPreview) -> Self {
        Self {
            id: p.id,
            preview: p.preview.unwrap_or_else(|| NEW_CHAT_PREVIEW.to_owned()),
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

impl MessageView {
    pub fn from_message(m: &Message) -> Self {
        Self {
            role: m.role.clone(),
            content: m.content.clone(),
            kind: m.kind.clone(),
        }
    }
}
