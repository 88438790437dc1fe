use crate::actions;
use crate::auth;
use crate::error::ApiError;
use crate::models::{ActionQuery, AddRequest, Envelope, ExportEntry, KeyRequest};
use crate::routes;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use serde::de::DeserializeOwned;

/// Operations selectable through the `action` query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Get,
    List,
    Export,
    Import,
    Del,
}

impl Action {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "add" | "modify" => Some(Action::Add),
            "get" => Some(Action::Get),
            "list" => Some(Action::List),
            "export" => Some(Action::Export),
            "import" => Some(Action::Import),
            "del" => Some(Action::Del),
            _ => None,
        }
    }
}

/// POST /api/kvman handler - Key-value administration
///
/// Authenticates the bearer token, then runs the action named by the
/// `action` query parameter. Always answers 200; the envelope's `success`
/// and `message` fields carry the outcome.
#[utoipa::path(
    post,
    path = routes::KVMAN,
    params(ActionQuery),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Outcome of the action, including failures", body = Envelope)
    ),
    security(("bearer" = [])),
    tag = "kv"
)]
pub async fn kvman_handler(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Envelope>, ApiError> {
    let header = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    if !auth::authorize(&state.config.auth_token, header) {
        tracing::warn!("Rejected unauthorized kvman request");
        return Err(ApiError::Unauthorized);
    }

    let Query(pairs) = query.map_err(|rejection| ApiError::InvalidQuery(rejection.body_text()))?;
    let name = ActionQuery::from_pairs(pairs)
        .action
        .ok_or(ApiError::MissingAction)?;
    let action = Action::parse(&name).ok_or_else(|| ApiError::InvalidAction(name.clone()))?;
    tracing::debug!("Dispatching kvman action: {}", name);

    let store = state.store.as_ref();
    let envelope = match action {
        // list and export never look at the body
        Action::List => actions::list(store).await?,
        Action::Export => actions::export(store).await?,
        Action::Import => {
            let entries: Vec<ExportEntry> = parse_body(body)?;
            actions::import(store, entries).await?
        }
        Action::Add => {
            let request: AddRequest = parse_body(body)?;
            require_key(&request.key)?;
            actions::add(store, request).await?
        }
        Action::Get => {
            let request: KeyRequest = parse_body(body)?;
            require_key(&request.key)?;
            actions::get(store, request).await?
        }
        Action::Del => {
            let request: KeyRequest = parse_body(body)?;
            require_key(&request.key)?;
            actions::del(store, request).await?
        }
    };

    Ok(Json(envelope))
}

fn parse_body<T: DeserializeOwned>(body: Result<Bytes, BytesRejection>) -> Result<T, ApiError> {
    let bytes = body.map_err(|rejection| ApiError::UnreadableBody(rejection.body_text()))?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn require_key(key: &str) -> Result<(), ApiError> {
    if key.is_empty() {
        return Err(ApiError::EmptyKey);
    }
    Ok(())
}
