//! OpenAI-compatible HTTP implementation of [`CompletionClient`].

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CompletionClient, CompletionError, CompletionTurn, GeneratedImage};
use crate::config::Config;

pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    image_size: String,
}

impl OpenAiClient {
    pub fn from_config(cfg: &Config) -> Self {
        let http = Client::builder()
            .user_agent(concat!("parlor-server/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(cfg.upstream_timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: cfg.completion_base_url.trim_end_matches('/').to_owned(),
            api_key: cfg.completion_api_key.clone(),
            chat_model: cfg.chat_model.clone(),
            image_size: cfg.image_size.clone(),
        }
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.post(format!("{}{path}", self.base_url));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, turns: &[CompletionTurn]) -> Result<String, CompletionError> {
        let body = ChatCompletionRequest {
            model: &self.chat_model,
            messages: turns
                .iter()
                .map(|t| WireMessage {
                    role: &t.role,
                    content: &t.content,
                })
                .collect(),
        };
        debug!(model = %self.chat_model, turns = turns.len(), "chat completion request");

        let resp: ChatCompletionResponse = self
            .request("/chat/completions")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| CompletionError::Malformed("no choices in response".into()))
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, CompletionError> {
        let body = ImageGenerationRequest {
            prompt,
            n: 1,
            size: &self.image_size,
        };
        debug!(size = %self.image_size, "image generation request");

        let resp: ImageGenerationResponse = self
            .request("/images/generations")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let image = resp
            .data
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::Malformed("no image returned".into()))?;

        if let Some(url) = image.url {
            return Ok(GeneratedImage::Url(url));
        }
        if let Some(b64) = image.b64_json {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(b64.as_bytes())
                .map_err(|e| CompletionError::Malformed(format!("invalid base64 image: {e}")))?;
            return Ok(GeneratedImage::Png(bytes));
        }
        Err(CompletionError::Malformed("no image returned".into()))
    }
}

// ── Wire types (OpenAI REST shapes, only the fields used here) ───────────────

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct ImageGenerationRequest<'a> {
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Deserialize)]
struct ImageGenerationResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
}
