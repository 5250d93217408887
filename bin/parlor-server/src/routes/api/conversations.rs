//! Conversation routes: list, create, history, post-a-turn, delete.
//!
//! Posting a turn is the one orchestrating operation: the user message is
//! persisted first, then the *full persisted history* — and nothing else —
//! is sent to the completion service, and the reply is persisted before it
//! is returned.  A completion failure therefore leaves the user message in
//! place and the transcript otherwise untouched; callers may simply retry.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::completion::CompletionTurn;
use crate::entities::{Conversation, ConversationStore, Message, MessageStore};
use crate::error::ServerError;
use crate::schemas::api::conversations::{
    ConversationSummary, CreateConversationResponse, DeleteConversationResponse, HistoryResponse,
    MessageView, PostMessageRequest, PostMessageResponse,
};
use crate::state::AppState;

/// Maximum allowed prompt length in bytes to prevent memory exhaustion.
const MAX_PROMPT_BYTES: usize = 128 * 1024; // 128 KiB

#[derive(OpenApi)]
#[openapi(
    paths(
        list_conversations,
        create_conversation,
        get_history,
        post_message,
        delete_conversation
    ),
    components(schemas(
        ConversationSummary,
        CreateConversationResponse,
        HistoryResponse,
        MessageView,
        PostMessageRequest,
        PostMessageResponse,
        DeleteConversationResponse
    ))
)]
pub struct ConversationsApi;

/// Register conversation routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/conversations/{id}",
            get(get_history)
                .post(post_message)
                .delete(delete_conversation),
        )
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// List conversations, newest first (`GET /api/conversations`).
///
/// Each entry carries its latest message content as `preview`, or
/// `"New Chat"` for an empty conversation.
#[utoipa::path(
    get,
    path = "/api/conversations",
    tag = "conversations",
    responses(
        (status = 200, description = "Conversation list", body = Vec<ConversationSummary>),
        (status = 500, description = "Store error"),
    )
)]
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ConversationSummary>>, ServerError> {
    let conversations = state.store.list_conversations().await?;
    Ok(Json(
        conversations
            .into_iter()
            .map(ConversationSummary::from_preview)
            .collect(),
    ))
}

/// Create an empty conversation (`POST /api/conversations`).
#[utoipa::path(
    post,
    path = "/api/conversations",
    tag = "conversations",
    responses(
        (status = 200, description = "Conversation created", body = CreateConversationResponse),
        (status = 500, description = "Store error"),
    )
)]
pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CreateConversationResponse>, ServerError> {
    let conversation = Conversation::new();
    state
        .store
        .create_conversation(conversation.clone())
        .await?;
    debug!(conversation = %conversation.id, "conversation created");
    Ok(Json(CreateConversationResponse {
        id: conversation.id,
    }))
}

/// Full ordered transcript of one conversation
/// (`GET /api/conversations/{id}`).
#[utoipa::path(
    get,
    path = "/api/conversations/{id}",
    tag = "conversations",
    responses(
        (status = 200, description = "Transcript, ascending by creation time", body = HistoryResponse),
        (status = 404, description = "Unknown conversation"),
        (status = 500, description = "Store error"),
    )
)]
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, ServerError> {
    if state.store.get_conversation(&id).await?.is_none() {
        return Err(ServerError::NotFound(format!("conversation {id} not found")));
    }
    let messages = state.store.list_messages(&id).await?;
    Ok(Json(HistoryResponse {
        messages: messages.iter().map(MessageView::from_message).collect(),
    }))
}

/// Post one user turn and obtain the assistant reply
/// (`POST /api/conversations/{id}`).
///
/// An unknown `{id}` is not an error: a fresh conversation is created and
/// the response carries the authoritative id.  With neither `text` nor
/// `imageRef` present nothing is persisted for the user, but the completion
/// service is still invoked with the existing history.
#[utoipa::path(
    post,
    path = "/api/conversations/{id}",
    tag = "conversations",
    request_body = PostMessageRequest,
    responses(
        (status = 200, description = "Assistant reply", body = PostMessageResponse),
        (status = 400, description = "Bad request"),
        (status = 502, description = "Completion service failure"),
        (status = 500, description = "Store error"),
    )
)]
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PostMessageRequest>,
) -> Result<Json<PostMessageResponse>, ServerError> {
    let text = req.text.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let image_ref = req
        .image_ref
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());

    if text.is_some() && image_ref.is_some() {
        return Err(ServerError::BadRequest(
            "send either text or imageRef, not both".into(),
        ));
    }
    if let Some(t) = text {
        if t.len() > MAX_PROMPT_BYTES {
            return Err(ServerError::BadRequest(format!(
                "prompt too large ({} bytes); maximum is {} bytes",
                t.len(),
                MAX_PROMPT_BYTES,
            )));
        }
    }

    let conversation = match state.store.get_conversation(&id).await? {
        Some(c) => c,
        None => {
            let c = Conversation::new();
            state.store.create_conversation(c.clone()).await?;
            debug!(requested = %id, created = %c.id, "conversation absent; created a fresh one");
            c
        }
    };

    // Persist the user turn before reading history, so the completion
    // request is always built from a prefix that includes it.
    let user_turn = text
        .map(|t| (t, "text"))
        .or_else(|| image_ref.map(|u| (u, "image")));
    if let Some((content, kind)) = user_turn {
        state
            .store
            .append_message(Message::user(conversation.id.as_str(), content, kind))
            .await?;
    }

    let history = state.store.list_messages(&conversation.id).await?;
    let turns: Vec<CompletionTurn> = history
        .iter()
        .map(|m| CompletionTurn {
            role: m.role.clone(),
            content: m.content.clone(),
        })
        .collect();

    let reply = state.completions.complete(&turns).await?;
    info!(
        conversation = %conversation.id,
        turns = turns.len(),
        reply_len = reply.len(),
        "completion done"
    );

    state
        .store
        .append_message(Message::assistant(conversation.id.as_str(), reply.clone()))
        .await?;

    Ok(Json(PostMessageResponse {
        conversation_id: conversation.id,
        reply,
    }))
}

/// Delete a conversation and its messages
/// (`DELETE /api/conversations/{id}`).  Idempotent.
#[utoipa::path(
    delete,
    path = "/api/conversations/{id}",
    tag = "conversations",
    responses(
        (status = 200, description = "Conversation deleted", body = DeleteConversationResponse),
        (status = 500, description = "Store error"),
    )
)]
pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteConversationResponse>, ServerError> {
    state.store.delete_conversation(&id).await?;
    info!(conversation = %id, "conversation deleted");
    Ok(Json(DeleteConversationResponse { success: true }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod test {
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::completion::{CompletionClient, CompletionError, CompletionTurn, GeneratedImage};
    use crate::config::Config;
    use crate::entities::{MessageStore, SqliteStore};
    use crate::state::AppState;

    /// Completion stub recording every call.
    pub(crate) struct StubCompletion {
        pub reply: String,
        pub fail: bool,
        pub calls: Mutex<Vec<Vec<CompletionTurn>>>,
    }

    impl StubCompletion {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: reply.to_owned(),
                fail: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::replying("")
            }
        }
    }

    #[async_trait::async_trait]
    impl CompletionClient for StubCompletion {
        async fn complete(&self, turns: &[CompletionTurn]) -> Result<String, CompletionError> {
            self.calls
                .lock()
                .expect("calls lock")
                .push(turns.to_vec());
            if self.fail {
                return Err(CompletionError::Malformed("stub failure".into()));
            }
            Ok(self.reply.clone())
        }

        async fn generate_image(&self, _prompt: &str) -> Result<GeneratedImage, CompletionError> {
            if self.fail {
                return Err(CompletionError::Malformed("stub failure".into()));
            }
            Ok(GeneratedImage::Url("http://img.example/cat.png".into()))
        }
    }

    pub(crate) fn test_config() -> Config {
        let upload_dir = std::env::temp_dir()
            .join(format!("parlor-test-{}", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .into_owned();
        Config {
            bind_address: "127.0.0.1:0".into(),
            database_url: "sqlite::memory:".into(),
            log_level: "info".into(),
            log_json: false,
            log_dir: None,
            cors_allowed_origins: None,
            enable_swagger: false,
            upload_dir,
            public_base_url: "http://127.0.0.1:3000".into(),
            completion_base_url: "http://127.0.0.1:9".into(),
            completion_api_key: None,
            chat_model: "test-model".into(),
            image_size: "512x512".into(),
            upstream_timeout_secs: 5,
        }
    }

    pub(crate) async fn test_state(completions: Arc<dyn CompletionClient>) -> Arc<AppState> {
        let store = SqliteStore::connect_in_memory()
            .await
            .expect("in-memory store");
        Arc::new(AppState {
            config: Arc::new(test_config()),
            store: Arc::new(store),
            completions,
        })
    }

    pub(crate) async fn send_json(
        app: &Router,
        method: &str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(path);
        let req = match body {
            Some(v) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(v.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        let resp = app.clone().oneshot(req).await.expect("response");
        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    async fn create(app: &Router) -> String {
        let (status, body) = send_json(app, "POST", "/api/conversations", None).await;
        assert_eq!(status, StatusCode::OK);
        body["id"].as_str().expect("id").to_owned()
    }

    #[tokio::test]
    async fn empty_conversation_lists_with_new_chat_preview() {
        let state = test_state(Arc::new(StubCompletion::replying("hi"))).await;
        let app = crate::routes::build(state);

        let id = create(&app).await;
        let (status, body) = send_json(&app, "GET", "/api/conversations", None).await;
        assert_eq!(status, StatusCode::OK);
        let list = body.as_array().expect("array");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["id"], serde_json::Value::String(id));
        assert_eq!(list[0]["preview"], "New Chat");
    }

    #[tokio::test]
    async fn post_then_history_round_trip() {
        let state = test_state(Arc::new(StubCompletion::replying("hello back"))).await;
        let app = crate::routes::build(state);

        let id = create(&app).await;
        let (status, body) = send_json(
            &app,
            "POST",
            &format!("/api/conversations/{id}"),
            Some(serde_json::json!({ "text": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"], "hello back");
        assert_eq!(body["conversationId"], serde_json::Value::String(id.clone()));

        let (status, body) =
            send_json(&app, "GET", &format!("/api/conversations/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "hello");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(messages[1]["content"], "hello back");
    }

    #[tokio::test]
    async fn completion_sees_history_including_the_new_user_turn() {
        let stub = Arc::new(StubCompletion::replying("ack"));
        let state = test_state(stub.clone()).await;
        let app = crate::routes::build(state);

        let id = create(&app).await;
        send_json(
            &app,
            "POST",
            &format!("/api/conversations/{id}"),
            Some(serde_json::json!({ "text": "first" })),
        )
        .await;
        send_json(
            &app,
            "POST",
            &format!("/api/conversations/{id}"),
            Some(serde_json::json!({ "text": "second" })),
        )
        .await;

        let calls = stub.calls.lock().expect("calls lock");
        assert_eq!(calls.len(), 2);
        // First call: just the new user turn.
        assert_eq!(calls[0].len(), 1);
        assert_eq!(calls[0][0].content, "first");
        // Second call: full history with the new turn last; no duplicated
        // trailing entry.
        assert_eq!(calls[1].len(), 3);
        assert_eq!(calls[1][2].content, "second");
        assert_eq!(calls[1][2].role, "user");
    }

    #[tokio::test]
    async fn preview_reflects_the_assistant_reply() {
        let state = test_state(Arc::new(StubCompletion::replying("pong"))).await;
        let app = crate::routes::build(state);

        let id = create(&app).await;
        send_json(
            &app,
            "POST",
            &format!("/api/conversations/{id}"),
            Some(serde_json::json!({ "text": "ping" })),
        )
        .await;

        let (_, body) = send_json(&app, "GET", "/api/conversations", None).await;
        let list = body.as_array().expect("array");
        assert_eq!(list[0]["preview"], "pong");
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_clears_messages() {
        let state = test_state(Arc::new(StubCompletion::replying("bye"))).await;
        let app = crate::routes::build(state.clone());

        let id = create(&app).await;
        send_json(
            &app,
            "POST",
            &format!("/api/conversations/{id}"),
            Some(serde_json::json!({ "text": "hi" })),
        )
        .await;

        let (status, body) =
            send_json(&app, "DELETE", &format!("/api/conversations/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        // Second delete of the same id still succeeds.
        let (status, _) =
            send_json(&app, "DELETE", &format!("/api/conversations/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);

        let remaining = state.store.list_messages(&id).await.expect("messages");
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn history_of_unknown_conversation_is_404() {
        let state = test_state(Arc::new(StubCompletion::replying("x"))).await;
        let app = crate::routes::build(state);

        let (status, _) = send_json(&app, "GET", "/api/conversations/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn post_to_unknown_id_creates_a_fresh_conversation() {
        let state = test_state(Arc::new(StubCompletion::replying("fresh"))).await;
        let app = crate::routes::build(state);

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/conversations/stale-id",
            Some(serde_json::json!({ "text": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let new_id = body["conversationId"].as_str().expect("id");
        assert_ne!(new_id, "stale-id");

        let (status, _) =
            send_json(&app, "GET", &format!("/api/conversations/{new_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_post_persists_nothing_but_still_invokes_completion() {
        let stub = Arc::new(StubCompletion::replying("still here"));
        let state = test_state(stub.clone()).await;
        let app = crate::routes::build(state);

        let id = create(&app).await;
        let (status, _) = send_json(
            &app,
            "POST",
            &format!("/api/conversations/{id}"),
            Some(serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let calls = stub.calls.lock().expect("calls lock");
        assert_eq!(calls.len(), 1);
        assert!(calls[0].is_empty(), "no spurious empty user turn");
        drop(calls);

        let (_, body) = send_json(&app, "GET", &format!("/api/conversations/{id}"), None).await;
        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 1, "only the assistant reply was persisted");
        assert_eq!(messages[0]["role"], "assistant");
    }

    #[tokio::test]
    async fn image_ref_is_persisted_as_an_image_turn() {
        let state = test_state(Arc::new(StubCompletion::replying("nice picture"))).await;
        let app = crate::routes::build(state);

        let id = create(&app).await;
        let (status, _) = send_json(
            &app,
            "POST",
            &format!("/api/conversations/{id}"),
            Some(serde_json::json!({ "imageRef": "http://127.0.0.1:3000/uploads/a.png" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send_json(&app, "GET", &format!("/api/conversations/{id}"), None).await;
        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages[0]["kind"], "image");
        assert_eq!(messages[0]["role"], "user");
    }

    #[tokio::test]
    async fn text_and_image_together_are_rejected() {
        let state = test_state(Arc::new(StubCompletion::replying("no"))).await;
        let app = crate::routes::build(state);

        let id = create(&app).await;
        let (status, _) = send_json(
            &app,
            "POST",
            &format!("/api/conversations/{id}"),
            Some(serde_json::json!({ "text": "hi", "imageRef": "http://x/y.png" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_prompt_is_rejected() {
        let state = test_state(Arc::new(StubCompletion::replying("no"))).await;
        let app = crate::routes::build(state);

        let id = create(&app).await;
        let long = "x".repeat(super::MAX_PROMPT_BYTES + 1);
        let (status, _) = send_json(
            &app,
            "POST",
            &format!("/api/conversations/{id}"),
            Some(serde_json::json!({ "text": long })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn completion_failure_is_502_and_keeps_the_user_message() {
        let state = test_state(Arc::new(StubCompletion::failing())).await;
        let app = crate::routes::build(state.clone());

        let id = create(&app).await;
        let (status, _) = send_json(
            &app,
            "POST",
            &format!("/api/conversations/{id}"),
            Some(serde_json::json!({ "text": "are you there?" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let messages = state.store.list_messages(&id).await.expect("messages");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content, "are you there?");
    }

    #[tokio::test]
    async fn history_is_ordered_by_creation_time() {
        let state = test_state(Arc::new(StubCompletion::replying("ok"))).await;
        let app = crate::routes::build(state.clone());

        let id = create(&app).await;
        for text in ["one", "two", "three"] {
            send_json(
                &app,
                "POST",
                &format!("/api/conversations/{id}"),
                Some(serde_json::json!({ "text": text })),
            )
            .await;
        }

        let messages = state.store.list_messages(&id).await.expect("messages");
        assert_eq!(messages.len(), 6);
        for pair in messages.windows(2) {
            assert!(
                pair[0].created_at <= pair[1].created_at,
                "history must be non-decreasing by creation time"
            );
        }
    }
}
