use crate::error::{HealthResponse, UnhealthyResponse};
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};

/// GET /health handler - Health check endpoint
///
/// Asks the configured store to verify it is reachable.
/// Returns 200 OK if it is, 503 Service Unavailable otherwise.
#[utoipa::path(
    get,
    path = routes::HEALTH,
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = UnhealthyResponse)
    ),
    tag = "health"
)]
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<HealthResponse>), (StatusCode, Json<UnhealthyResponse>)> {
    match state.store.health_check().await {
        Ok(_) => {
            tracing::debug!("Health check passed");
            Ok((
                StatusCode::OK,
                Json(HealthResponse {
                    status: "healthy".to_string(),
                }),
            ))
        }
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(UnhealthyResponse {
                    status: "unhealthy".to_string(),
                    error: format!("Cannot reach key-value store: {}", e),
                }),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StoreBackend, DEFAULT_MAX_BODY_BYTES};
    use crate::store::{KvStore, MemoryStore};
    use anyhow::Result;
    use async_trait::async_trait;
    use axum::{body::Body, http::Request, routing::get, Router};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_config() -> Config {
        Config {
            auth_token: "123456789".to_string(),
            backend: StoreBackend::Memory,
            spanner: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            service_port: 3000,
            service_host: "0.0.0.0".to_string(),
        }
    }

    fn app(store: Arc<dyn KvStore>) -> Router {
        let state = AppState {
            store,
            config: Arc::new(test_config()),
        };

        Router::new()
            .route(crate::routes::HEALTH, get(health_handler))
            .with_state(state)
    }

    struct UnreachableStore;

    #[async_trait]
    impl KvStore for UnreachableStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(anyhow::anyhow!("connection refused"))
        }

        async fn put(&self, _key: &str, _value: &str) -> Result<()> {
            Err(anyhow::anyhow!("connection refused"))
        }

        async fn delete(&self, _key: &str) -> Result<()> {
            Err(anyhow::anyhow!("connection refused"))
        }

        async fn list_keys(&self) -> Result<Vec<String>> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    async fn call_health(app: Router) -> axum::response::Response {
        app.oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint_healthy() {
        let response = call_health(app(Arc::new(MemoryStore::new()))).await;

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let response_json: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response_json.status, "healthy");
    }

    #[tokio::test]
    async fn test_health_endpoint_unhealthy() {
        let response = call_health(app(Arc::new(UnreachableStore))).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let response_json: UnhealthyResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(response_json.status, "unhealthy");
        assert!(response_json.error.contains("connection refused"));
    }
}
