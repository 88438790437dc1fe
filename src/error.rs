use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::models::Envelope;

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Failures of the kvman endpoint
///
/// Every variant is rendered as a failed [`Envelope`] with HTTP 200. Callers
/// of the admin API read the outcome from the body, never from the status.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or mismatching bearer token
    Unauthorized,
    /// Query string could not be decoded
    InvalidQuery(String),
    /// Request body could not be read, e.g. it exceeds the size limit
    UnreadableBody(String),
    /// No `action` query parameter
    MissingAction,
    /// `action` is not one of the known actions
    InvalidAction(String),
    /// Request body does not match the action's input shape
    InvalidBody(serde_json::Error),
    /// Key supplied but empty
    EmptyKey,
    /// Key-value store operation error
    Store(anyhow::Error),
}

impl ApiError {
    pub fn message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Unauthorized".to_string(),
            ApiError::InvalidQuery(reason) => format!("Invalid query string: {}", reason),
            ApiError::UnreadableBody(reason) => format!("Unreadable request body: {}", reason),
            ApiError::MissingAction => "Missing action parameter".to_string(),
            ApiError::InvalidAction(action) => format!("Invalid action {}", action),
            ApiError::InvalidBody(err) => format!("Invalid request body: {}", err),
            ApiError::EmptyKey => "Key must not be empty".to_string(),
            ApiError::Store(err) => format!("Unexpected error {}", err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Store(err) = &self {
            tracing::error!("Store operation failed: {:#}", err);
        }

        (StatusCode::OK, Json(Envelope::fail(self.message()))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Store(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidBody(err)
    }
}
