pub mod conversations;
pub mod images;
pub mod uploads;

use std::sync::Arc;

use axum::Router;
use utoipa::OpenApi;

use crate::state::AppState;

/// Routes nested under `/api`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(conversations::router())
        .merge(uploads::router())
        .merge(images::router())
}

#[derive(OpenApi)]
#[openapi()]
pub struct ApiRoot;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut spec = ApiRoot::openapi();
    spec.merge(conversations::ConversationsApi::openapi());
    spec.merge(uploads::UploadsApi::openapi());
    spec.merge(images::ImagesApi::openapi());
    spec
}
