//! Image generation route.
//!
//! Thin passthrough to the completion service's image endpoint.  Upstreams
//! that inline the image bytes instead of hosting them get their payload
//! stored under the upload directory, so callers always receive a URL.

use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::completion::GeneratedImage;
use crate::error::ServerError;
use crate::schemas::api::images::{ImageGenerationRequest, ImageGenerationResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(generate_image),
    components(schemas(ImageGenerationRequest, ImageGenerationResponse))
)]
pub struct ImagesApi;

/// Register image generation routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/images", post(generate_image))
}

/// Generate an image from a prompt (`POST /api/images`).
#[utoipa::path(
    post,
    path = "/api/images",
    tag = "images",
    request_body = ImageGenerationRequest,
    responses(
        (status = 200, description = "Generated image URL", body = ImageGenerationResponse),
        (status = 400, description = "Empty prompt"),
        (status = 502, description = "Completion service failure"),
    )
)]
pub async fn generate_image(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImageGenerationRequest>,
) -> Result<Json<ImageGenerationResponse>, ServerError> {
    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err(ServerError::BadRequest("prompt must not be empty".into()));
    }

    let url = match state.completions.generate_image(prompt).await? {
        GeneratedImage::Url(url) => url,
        GeneratedImage::Png(bytes) => {
            let stored_name = format!("{}.png", Uuid::new_v4());
            let dir = Path::new(&state.config.upload_dir);
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(dir.join(&stored_name), &bytes).await?;
            info!(file = %stored_name, bytes = bytes.len(), "generated image stored locally");
            super::uploads::public_url(&state.config.public_base_url, &stored_name)
        }
    };

    Ok(Json(ImageGenerationResponse { url }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
