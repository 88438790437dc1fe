use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{HealthResponse, UnhealthyResponse};
use crate::handlers;
use crate::models::{AddRequest, Envelope, ExportEntry, ImportReport, KeyRequest, KeyValuePayload};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "kvman API",
        version = "1.0.0",
        description = "Token-guarded administration API for a key-value store"
    ),
    paths(
        handlers::health::health_handler,
        handlers::kvman::kvman_handler
    ),
    components(
        schemas(
            Envelope,
            AddRequest,
            KeyRequest,
            KeyValuePayload,
            ExportEntry,
            ImportReport,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "kv", description = "Key-value administration")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer` scheme referenced by the kvman endpoint
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
