pub mod api;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::services::storage::ObjectStore;
use crate::services::unzip_service::UnzipService;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::unzip::unzip,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            models::UnzipRequest,
            models::SourceDescriptor,
            models::UnzipResult,
            models::UnzipFile,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "unzip", description = "Archive expansion"),
        (name = "system", description = "Service health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub unzip: Arc<UnzipService>,
    pub store: Arc<dyn ObjectStore>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/unzip", post(api::handlers::unzip::unzip))
        .route("/health", get(api::handlers::health::health_check))
        .with_state(state)
}
