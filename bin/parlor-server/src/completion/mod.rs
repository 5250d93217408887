//! Client abstraction for the external completion service.
//!
//! The service is opaque: given an ordered list of role-tagged turns it
//! returns one assistant reply, and given a prompt it returns one generated
//! image.  [`OpenAiClient`] talks to any OpenAI-compatible HTTP API; tests
//! substitute their own [`CompletionClient`] implementation.
//!
//! No retries anywhere: a failed upstream call surfaces once to the caller.

pub mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use thiserror::Error;

/// One turn handed to the completion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionTurn {
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
}

/// Errors from the completion service.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The HTTP request failed (network error, timeout, non-2xx status).
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream answered 2xx but the body had an unexpected shape.
    #[error("completion response malformed: {0}")]
    Malformed(String),
}

/// Result of an image generation call.
///
/// Some upstreams host the image and return a URL; others inline the bytes.
/// The caller decides where inlined bytes end up.
#[derive(Debug, Clone)]
pub enum GeneratedImage {
    Url(String),
    Png(Vec<u8>),
}

#[async_trait]
pub trait CompletionClient: Send + Sync + 'static {
    /// Produce one assistant reply from the full ordered conversation.
    async fn complete(&self, turns: &[CompletionTurn]) -> Result<String, CompletionError>;

    /// Produce one image from a text prompt.
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, CompletionError>;
}
