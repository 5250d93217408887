use utoipa::OpenApi;

use super::health;
use crate::routes::api;

#[derive(OpenApi)]
#[openapi(info(
    title = "parlor-server",
    description = "parlor chat API",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(api::api_docs());
    root
}
