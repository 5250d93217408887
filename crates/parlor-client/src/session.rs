//! The UI-facing session state machine.
//!
//! [`SessionController`] owns the local view of one chat session: the
//! conversation list, the active conversation's transcript, the draft, and
//! the composing flag.  Network work is spawned onto a tokio runtime and
//! reports back as [`SessionEvent`]s over an unbounded channel; the UI
//! calls [`SessionController::poll`] once per frame to apply them.
//!
//! Two rules keep the optimistic UI honest:
//! - every message carries a [`Delivery`] tag, so an un-acknowledged turn
//!   is visibly `Pending` and a failed one visibly `Failed` instead of
//!   silently lingering;
//! - every fetch and submission carries the `generation` counter current
//!   at spawn time, and results from a superseded generation are
//!   discarded, so switching conversations mid-flight cannot let a stale
//!   response overwrite the new transcript.
//!
//! The controller itself rejects a submit while one is in flight; the UI
//! disabling its send affordance is cosmetic, not load-bearing.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::api::{ApiClient, ConversationSummary, MessageView, PostMessageRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn from_wire(role: &str) -> Self {
        match role {
            "user" => Role::User,
            _ => Role::Assistant,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Image,
}

/// Delivery state of an optimistically shown message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Shown locally, not yet acknowledged by the server.
    Pending,
    /// Persisted server-side (or loaded from server history).
    Confirmed,
    /// The submission carrying it failed.
    Failed,
}

/// One transcript entry as the UI renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMessage {
    pub role: Role,
    pub kind: MessageKind,
    pub content: String,
    pub delivery: Delivery,
}

impl LocalMessage {
    fn from_wire(m: &MessageView) -> Self {
        Self {
            role: Role::from_wire(&m.role),
            kind: if m.kind == "image" {
                MessageKind::Image
            } else {
                MessageKind::Text
            },
            content: m.content.clone(),
            delivery: Delivery::Confirmed,
        }
    }
}

/// Result of a submit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// The draft trimmed to nothing (or the upload was empty).
    RejectedEmpty,
    /// A submission is already in flight.
    RejectedBusy,
}

#[derive(Debug)]
enum SessionEvent {
    ConversationsLoaded(Vec<ConversationSummary>),
    HistoryLoaded {
        generation: u64,
        messages: Vec<MessageView>,
    },
    ConversationCreated {
        generation: u64,
        id: String,
    },
    UploadReady {
        generation: u64,
        url: String,
    },
    ReplyReceived {
        generation: u64,
        conversation_id: String,
        reply: String,
    },
    SubmitFailed {
        generation: u64,
        error: String,
    },
    RequestFailed {
        error: String,
    },
}

pub struct SessionController {
    api: Arc<ApiClient>,
    rt: tokio::runtime::Handle,
    events_tx: UnboundedSender<SessionEvent>,
    events_rx: UnboundedReceiver<SessionEvent>,

    conversations: Vec<ConversationSummary>,
    active: Option<String>,
    messages: Vec<LocalMessage>,
    pub draft: String,
    composing: bool,
    generation: u64,
    last_error: Option<String>,
}

impl SessionController {
    /// Build a controller and kick off the initial conversation-list load.
    pub fn new(api: ApiClient, rt: tokio::runtime::Handle) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let this = Self {
            api: Arc::new(api),
            rt,
            events_tx,
            events_rx,
            conversations: Vec::new(),
            active: None,
            messages: Vec::new(),
            draft: String::new(),
            composing: false,
            generation: 0,
            last_error: None,
        };
        this.refresh_conversations();
        this
    }

    // ── Read-side accessors ──────────────────────────────────────────────────

    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn messages(&self) -> &[LocalMessage] {
        &self.messages
    }

    pub fn is_composing(&self) -> bool {
        self.composing
    }

    /// Surface the most recent failure once.
    pub fn take_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    // ── Intents ──────────────────────────────────────────────────────────────

    /// Drain and apply queued events.  Returns `true` when state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            changed = true;
        }
        changed
    }

    /// Switch the active conversation (`None` = unsaved "New Chat" state).
    ///
    /// Bumps the generation so anything still in flight for the previous
    /// conversation is discarded on arrival rather than aborted.
    pub fn select(&mut self, id: Option<String>) {
        if self.active == id {
            return;
        }
        self.active = id.clone();
        self.messages.clear();
        self.composing = false;
        self.generation += 1;

        if let Some(id) = id {
            let generation = self.generation;
            let api = Arc::clone(&self.api);
            let tx = self.events_tx.clone();
            self.rt.spawn(async move {
                match api.get_history(&id).await {
                    Ok(messages) => {
                        let _ = tx.send(SessionEvent::HistoryLoaded {
                            generation,
                            messages,
                        });
                    }
                    Err(e) => {
                        let _ = tx.send(SessionEvent::RequestFailed {
                            error: e.to_string(),
                        });
                    }
                }
            });
        }
    }

    /// Submit the current draft as a user turn.
    pub fn submit_text(&mut self) -> SubmitOutcome {
        let text = self.draft.trim().to_owned();
        if text.is_empty() {
            return SubmitOutcome::RejectedEmpty;
        }
        if self.composing {
            return SubmitOutcome::RejectedBusy;
        }
        self.draft.clear();
        self.messages.push(LocalMessage {
            role: Role::User,
            kind: MessageKind::Text,
            content: text.clone(),
            delivery: Delivery::Pending,
        });
        self.composing = true;
        self.dispatch_turn(PostMessageRequest {
            text: Some(text),
            image_ref: None,
        });
        SubmitOutcome::Accepted
    }

    /// Upload an image and submit it as a user turn.
    ///
    /// The optimistic image bubble appears once the upload has produced a
    /// public URL (there is nothing meaningful to show before that).
    pub fn submit_image(&mut self, file_name: String, bytes: Vec<u8>) -> SubmitOutcome {
        if bytes.is_empty() {
            return SubmitOutcome::RejectedEmpty;
        }
        if self.composing {
            return SubmitOutcome::RejectedBusy;
        }
        self.composing = true;

        let generation = self.generation;
        let active = self.active.clone();
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        self.rt.spawn(async move {
            let url = match api.upload_image(&file_name, bytes).await {
                Ok(url) => url,
                Err(e) => {
                    let _ = tx.send(SessionEvent::SubmitFailed {
                        generation,
                        error: e.to_string(),
                    });
                    return;
                }
            };
            let _ = tx.send(SessionEvent::UploadReady {
                generation,
                url: url.clone(),
            });

            let id = match ensure_conversation(&api, &tx, generation, active).await {
                Some(id) => id,
                None => return,
            };
            let req = PostMessageRequest {
                text: None,
                image_ref: Some(url),
            };
            send_turn(&api, &tx, generation, &id, &req).await;
        });
        SubmitOutcome::Accepted
    }

    /// Start a fresh conversation: request an id, clear the transcript,
    /// refresh the list.
    pub fn new_conversation(&mut self) {
        self.active = None;
        self.messages.clear();
        self.composing = false;
        self.generation += 1;

        let generation = self.generation;
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        self.rt.spawn(async move {
            match api.create_conversation().await {
                Ok(id) => {
                    let _ = tx.send(SessionEvent::ConversationCreated { generation, id });
                }
                Err(e) => {
                    let _ = tx.send(SessionEvent::RequestFailed {
                        error: e.to_string(),
                    });
                }
            }
        });
    }

    /// Remove a conversation, optimistically.  The DELETE itself is
    /// fire-and-forget: local state is not rolled back on failure.
    pub fn delete(&mut self, id: &str) {
        self.conversations.retain(|c| c.id != id);
        if self.active.as_deref() == Some(id) {
            self.active = None;
            self.messages.clear();
            self.composing = false;
            self.generation += 1;
        }

        let api = Arc::clone(&self.api);
        let id = id.to_owned();
        self.rt.spawn(async move {
            if let Err(e) = api.delete_conversation(&id).await {
                warn!(conversation = %id, error = %e, "conversation delete failed");
            }
        });
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn refresh_conversations(&self) {
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        self.rt.spawn(async move {
            match api.list_conversations().await {
                Ok(list) => {
                    let _ = tx.send(SessionEvent::ConversationsLoaded(list));
                }
                Err(e) => {
                    let _ = tx.send(SessionEvent::RequestFailed {
                        error: e.to_string(),
                    });
                }
            }
        });
    }

    fn dispatch_turn(&self, req: PostMessageRequest) {
        let generation = self.generation;
        let active = self.active.clone();
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        self.rt.spawn(async move {
            let id = match ensure_conversation(&api, &tx, generation, active).await {
                Some(id) => id,
                None => return,
            };
            send_turn(&api, &tx, generation, &id, &req).await;
        });
    }

    fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ConversationsLoaded(list) => {
                self.conversations = list;
            }
            SessionEvent::HistoryLoaded {
                generation,
                messages,
            } => {
                if generation != self.generation {
                    debug!("stale history response discarded");
                    return;
                }
                self.messages = messages.iter().map(LocalMessage::from_wire).collect();
            }
            SessionEvent::ConversationCreated { generation, id } => {
                if generation != self.generation {
                    debug!("stale conversation-created response discarded");
                    return;
                }
                self.active = Some(id);
                self.refresh_conversations();
            }
            SessionEvent::UploadReady { generation, url } => {
                if generation != self.generation {
                    return;
                }
                self.messages.push(LocalMessage {
                    role: Role::User,
                    kind: MessageKind::Image,
                    content: url,
                    delivery: Delivery::Pending,
                });
            }
            SessionEvent::ReplyReceived {
                generation,
                conversation_id,
                reply,
            } => {
                // A reply for a superseded generation still ends that
                // submission; only the transcript update is dropped.
                self.composing = false;
                if generation != self.generation {
                    debug!("stale reply discarded");
                    return;
                }
                self.mark_last_pending(Delivery::Confirmed);
                self.messages.push(LocalMessage {
                    role: Role::Assistant,
                    kind: MessageKind::Text,
                    content: reply,
                    delivery: Delivery::Confirmed,
                });
                self.active = Some(conversation_id);
                self.refresh_conversations();
            }
            SessionEvent::SubmitFailed { generation, error } => {
                self.composing = false;
                if generation == self.generation {
                    self.mark_last_pending(Delivery::Failed);
                }
                self.last_error = Some(error);
            }
            SessionEvent::RequestFailed { error } => {
                self.last_error = Some(error);
            }
        }
    }

    fn mark_last_pending(&mut self, delivery: Delivery) {
        if let Some(message) = self
            .messages
            .iter_mut()
            .rev()
            .find(|m| m.role == Role::User && m.delivery == Delivery::Pending)
        {
            message.delivery = delivery;
        }
    }
}

/// Resolve the conversation id for a submission, creating one when the
/// session has no active conversation yet.  Reports failure itself and
/// returns `None`.
async fn ensure_conversation(
    api: &ApiClient,
    tx: &UnboundedSender<SessionEvent>,
    generation: u64,
    active: Option<String>,
) -> Option<String> {
    match active {
        Some(id) => Some(id),
        None => match api.create_conversation().await {
            Ok(id) => {
                let _ = tx.send(SessionEvent::ConversationCreated {
                    generation,
                    id: id.clone(),
                });
                Some(id)
            }
            Err(e) => {
                let _ = tx.send(SessionEvent::SubmitFailed {
                    generation,
                    error: e.to_string(),
                });
                None
            }
        },
    }
}

async fn send_turn(
    api: &ApiClient,
    tx: &UnboundedSender<SessionEvent>,
    generation: u64,
    id: &str,
    req: &PostMessageRequest,
) {
    match api.post_message(id, req).await {
        Ok(resp) => {
            let _ = tx.send(SessionEvent::ReplyReceived {
                generation,
                conversation_id: resp.conversation_id,
                reply: resp.reply,
            });
        }
        Err(e) => {
            let _ = tx.send(SessionEvent::SubmitFailed {
                generation,
                error: e.to_string(),
            });
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // The endpoint is never reachable in these tests; spawned requests fail
    // in the background and the transitions under test are driven by
    // calling `apply` directly.
    fn controller() -> SessionController {
        SessionController::new(
            ApiClient::new("http://127.0.0.1:9"),
            tokio::runtime::Handle::current(),
        )
    }

    #[tokio::test]
    async fn empty_draft_is_rejected() {
        let mut c = controller();
        c.draft = "   ".into();
        assert_eq!(c.submit_text(), SubmitOutcome::RejectedEmpty);
        assert!(c.messages().is_empty());
        assert!(!c.is_composing());
    }

    #[tokio::test]
    async fn submit_appends_a_pending_user_message_and_sets_composing() {
        let mut c = controller();
        c.draft = "hello".into();
        assert_eq!(c.submit_text(), SubmitOutcome::Accepted);
        assert!(c.is_composing());
        assert!(c.draft.is_empty());
        assert_eq!(c.messages().len(), 1);
        assert_eq!(c.messages()[0].delivery, Delivery::Pending);
        assert_eq!(c.messages()[0].role, Role::User);
    }

    #[tokio::test]
    async fn second_submit_while_composing_is_rejected() {
        let mut c = controller();
        c.draft = "one".into();
        assert_eq!(c.submit_text(), SubmitOutcome::Accepted);
        c.draft = "two".into();
        assert_eq!(c.submit_text(), SubmitOutcome::RejectedBusy);
        assert_eq!(c.messages().len(), 1, "rejected submit must not append");
    }

    #[tokio::test]
    async fn reply_confirms_the_pending_turn_and_appends_the_assistant() {
        let mut c = controller();
        c.draft = "hello".into();
        c.submit_text();

        c.apply(SessionEvent::ReplyReceived {
            generation: c.generation,
            conversation_id: "conv-1".into(),
            reply: "hi there".into(),
        });

        assert!(!c.is_composing());
        assert_eq!(c.active(), Some("conv-1"));
        assert_eq!(c.messages().len(), 2);
        assert_eq!(c.messages()[0].delivery, Delivery::Confirmed);
        assert_eq!(c.messages()[1].role, Role::Assistant);
        assert_eq!(c.messages()[1].content, "hi there");
    }

    #[tokio::test]
    async fn failure_marks_the_pending_turn_failed() {
        let mut c = controller();
        c.draft = "hello".into();
        c.submit_text();

        c.apply(SessionEvent::SubmitFailed {
            generation: c.generation,
            error: "boom".into(),
        });

        assert!(!c.is_composing());
        assert_eq!(c.messages()[0].delivery, Delivery::Failed);
        assert_eq!(c.take_error().as_deref(), Some("boom"));
        assert!(c.take_error().is_none(), "error surfaces once");
    }

    #[tokio::test]
    async fn stale_history_is_discarded() {
        let mut c = controller();
        c.select(Some("a".into()));
        let stale = c.generation;
        c.select(Some("b".into()));

        c.apply(SessionEvent::HistoryLoaded {
            generation: stale,
            messages: vec![MessageView {
                role: "user".into(),
                content: "from a".into(),
                kind: "text".into(),
            }],
        });
        assert!(c.messages().is_empty(), "stale history must not land");

        c.apply(SessionEvent::HistoryLoaded {
            generation: c.generation,
            messages: vec![MessageView {
                role: "user".into(),
                content: "from b".into(),
                kind: "text".into(),
            }],
        });
        assert_eq!(c.messages().len(), 1);
        assert_eq!(c.messages()[0].content, "from b");
    }

    #[tokio::test]
    async fn stale_reply_clears_composing_without_touching_the_transcript() {
        let mut c = controller();
        c.draft = "hello".into();
        c.submit_text();
        let stale = c.generation;

        c.select(Some("other".into()));
        c.apply(SessionEvent::ReplyReceived {
            generation: stale,
            conversation_id: "old".into(),
            reply: "too late".into(),
        });

        assert!(!c.is_composing());
        assert!(c.messages().is_empty());
        assert_eq!(c.active(), Some("other"));
    }

    #[tokio::test]
    async fn image_upload_appears_as_a_pending_image_bubble() {
        let mut c = controller();
        c.composing = true; // as submit_image would have set it
        c.apply(SessionEvent::UploadReady {
            generation: c.generation,
            url: "http://127.0.0.1:3000/uploads/x.png".into(),
        });
        assert_eq!(c.messages().len(), 1);
        assert_eq!(c.messages()[0].kind, MessageKind::Image);
        assert_eq!(c.messages()[0].delivery, Delivery::Pending);
    }

    #[tokio::test]
    async fn deleting_the_active_conversation_clears_local_state() {
        let mut c = controller();
        c.apply(SessionEvent::ConversationsLoaded(vec![ConversationSummary {
            id: "a".into(),
            preview: "New Chat".into(),
            created_at: "2025-01-01T00:00:00Z".into(),
        }]));
        c.select(Some("a".into()));
        c.apply(SessionEvent::HistoryLoaded {
            generation: c.generation,
            messages: vec![MessageView {
                role: "user".into(),
                content: "hi".into(),
                kind: "text".into(),
            }],
        });

        c.delete("a");
        assert!(c.conversations().is_empty());
        assert_eq!(c.active(), None);
        assert!(c.messages().is_empty());
    }

    #[tokio::test]
    async fn deleting_an_inactive_conversation_keeps_the_transcript() {
        let mut c = controller();
        c.apply(SessionEvent::ConversationsLoaded(vec![
            ConversationSummary {
                id: "a".into(),
                preview: "one".into(),
                created_at: "2025-01-01T00:00:00Z".into(),
            },
            ConversationSummary {
                id: "b".into(),
                preview: "two".into(),
                created_at: "2025-01-01T00:00:00Z".into(),
            },
        ]));
        c.select(Some("a".into()));
        c.apply(SessionEvent::HistoryLoaded {
            generation: c.generation,
            messages: vec![MessageView {
                role: "user".into(),
                content: "hi".into(),
                kind: "text".into(),
            }],
        });

        c.delete("b");
        assert_eq!(c.conversations().len(), 1);
        assert_eq!(c.active(), Some("a"));
        assert_eq!(c.messages().len(), 1);
    }

    #[tokio::test]
    async fn submit_while_unsaved_works_after_conversation_created_event() {
        let mut c = controller();
        c.draft = "first".into();
        c.submit_text();
        assert_eq!(c.active(), None);

        c.apply(SessionEvent::ConversationCreated {
            generation: c.generation,
            id: "fresh".into(),
        });
        assert_eq!(c.active(), Some("fresh"));
    }
}
