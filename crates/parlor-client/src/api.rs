//! Typed wrapper over the parlor-server HTTP surface.
//!
//! Wire bodies use camelCase keys; every call surfaces a failure exactly
//! once as a [`ClientError`] — no retries.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// One conversation as listed in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub preview: String,
    pub created_at: String,
}

/// One transcript entry as returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageView {
    pub role: String,
    pub content: String,
    #[serde(default = "default_kind")]
    pub kind: String,
}

fn default_kind() -> String {
    "text".to_owned()
}

/// Body of `POST /api/conversations/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageResponse {
    /// Authoritative conversation id (the server may have created a fresh
    /// conversation when the posted-to id was unknown).
    pub conversation_id: String,
    pub reply: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateConversationResponse {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct HistoryResponse {
    messages: Vec<MessageView>,
}

#[derive(Debug, Clone, Deserialize)]
struct UploadResponse {
    url: String,
}

/// HTTP client for one parlor-server instance.
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .user_agent(concat!("parlor-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        let base_url = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ClientError> {
        let resp = self.http.get(self.url("/api/conversations")).send().await?;
        checked_json(resp).await
    }

    /// Create an empty conversation and return its id.
    pub async fn create_conversation(&self) -> Result<String, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/conversations"))
            .send()
            .await?;
        let body: CreateConversationResponse = checked_json(resp).await?;
        Ok(body.id)
    }

    pub async fn get_history(&self, id: &str) -> Result<Vec<MessageView>, ClientError> {
        let resp = self
            .http
            .get(self.url(&format!("/api/conversations/{id}")))
            .send()
            .await?;
        let body: HistoryResponse = checked_json(resp).await?;
        Ok(body.messages)
    }

    pub async fn post_message(
        &self,
        id: &str,
        req: &PostMessageRequest,
    ) -> Result<PostMessageResponse, ClientError> {
        let resp = self
            .http
            .post(self.url(&format!("/api/conversations/{id}")))
            .json(req)
            .send()
            .await?;
        checked_json(resp).await
    }

    pub async fn delete_conversation(&self, id: &str) -> Result<(), ClientError> {
        let resp = self
            .http
            .delete(self.url(&format!("/api/conversations/{id}")))
            .send()
            .await?;
        let _: serde_json::Value = checked_json(resp).await?;
        Ok(())
    }

    /// Upload an image and return the public URL it is served from.
    pub async fn upload_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ClientError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_owned())
            .mime_str("application/octet-stream")?;
        let form = reqwest::multipart::Form::new().part("image", part);
        let resp = self
            .http
            .post(self.url("/api/uploads"))
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = checked_json(resp).await?;
        Ok(body.url)
    }
}

/// Decode the body as `T` on success; otherwise surface the server's
/// `{"error": …}` message with the status.
async fn checked_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let message = resp
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(ToOwned::to_owned))
            .unwrap_or_else(|| status.to_string());
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(resp.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = ApiClient::new("http://localhost:3000/");
        assert_eq!(api.url("/api/conversations"), "http://localhost:3000/api/conversations");
    }

    #[test]
    fn post_message_request_skips_absent_fields() {
        let req = PostMessageRequest {
            text: Some("hi".into()),
            image_ref: None,
        };
        let json = serde_json::to_value(&req).expect("serialize");
        assert_eq!(json, serde_json::json!({ "text": "hi" }));
    }

    #[test]
    fn message_view_defaults_kind_to_text() {
        let m: MessageView =
            serde_json::from_value(serde_json::json!({ "role": "user", "content": "hi" }))
                .expect("deserialize");
        assert_eq!(m.kind, "text");
    }
}
