// Route path constants and router assembly

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::handlers::{health_handler, kvman_handler};
use crate::state::AppState;

pub const HEALTH: &str = "/health";
pub const KVMAN: &str = "/api/kvman";
pub const SWAGGER_UI: &str = "/swagger-ui";
pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";

/// Build the service router
pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_body_bytes);

    Router::new()
        .route(HEALTH, get(health_handler))
        .route(KVMAN, post(kvman_handler).layer(body_limit))
        .with_state(state)
        .merge(SwaggerUi::new(SWAGGER_UI).url(OPENAPI_JSON, ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}
