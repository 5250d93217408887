//! Image upload route.
//!
//! Stores the multipart `image` field under the configured upload directory
//! and returns the public URL it is served from (`/uploads/{file}`).
//! Content is validated by size only, never by type.

use std::path::Path;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::error::ServerError;
use crate::schemas::api::uploads::UploadResponse;
use crate::state::AppState;

/// Upload size ceiling.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024; // 5 MiB

/// Request-body limit; leaves headroom above the file ceiling so the
/// explicit size check answers with 413 instead of a generic multipart
/// error.
const BODY_LIMIT_BYTES: usize = MAX_UPLOAD_BYTES + 2 * 1024 * 1024;

#[derive(OpenApi)]
#[openapi(paths(upload_image), components(schemas(UploadResponse)))]
pub struct UploadsApi;

/// Register upload routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/uploads", post(upload_image))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
}

/// Store an uploaded image (`POST /api/uploads`, multipart field `image`).
#[utoipa::path(
    post,
    path = "/api/uploads",
    tag = "uploads",
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "No file or malformed body"),
        (status = 413, description = "File exceeds the 5 MiB ceiling"),
    )
)]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ServerError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().map(ToOwned::to_owned);
        let data = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(format!("failed to read upload: {e}")))?;

        if data.is_empty() {
            return Err(ServerError::BadRequest("empty upload".into()));
        }
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(ServerError::TooLarge(format!(
                "file is {} bytes; maximum is {} bytes",
                data.len(),
                MAX_UPLOAD_BYTES,
            )));
        }

        let stored_name = format!(
            "{}.{}",
            Uuid::new_v4(),
            sanitized_extension(file_name.as_deref())
        );
        let dir = Path::new(&state.config.upload_dir);
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(dir.join(&stored_name), &data).await?;

        let url = public_url(&state.config.public_base_url, &stored_name);
        info!(file = %stored_name, bytes = data.len(), "upload stored");
        return Ok(Json(UploadResponse { url }));
    }

    Err(ServerError::BadRequest("no file uploaded".into()))
}

/// Lowercased alphanumeric extension from the client file name, `"bin"`
/// when absent or suspicious.  Stored names are always freshly generated,
/// so the client name never touches the filesystem beyond its extension.
fn sanitized_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_owned())
}

pub(crate) fn public_url(base: &str, stored_name: &str) -> String {
    format!("{}/uploads/{}", base.trim_end_matches('/'), stored_name)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
