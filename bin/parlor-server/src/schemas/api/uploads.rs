use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response body for `POST /api/uploads`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Public URL under which the stored file is served.
    pub url: String,
}
