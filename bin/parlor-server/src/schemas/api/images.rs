use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for `POST /api/images`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImageGenerationRequest {
    /// Text description of the desired image.
    pub prompt: String,
}

/// Response body for `POST /api/images`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImageGenerationResponse {
    pub url: String,
}
