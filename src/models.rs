use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Uniform response body returned by every kvman action
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<JsonValue>,
}

impl Envelope {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            payload: None,
        }
    }

    pub fn ok_with<T: Serialize>(payload: T) -> serde_json::Result<Self> {
        Ok(Self {
            success: true,
            message: "OK".to_string(),
            payload: Some(serde_json::to_value(payload)?),
        })
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            payload: None,
        }
    }
}

/// Query parameters for the kvman endpoint
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActionQuery {
    /// One of: add, modify, get, list, export, import, del
    pub action: Option<String>,
}

impl ActionQuery {
    /// Pick parameters out of raw query pairs. A repeated `action` keeps its
    /// first value.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let action = pairs
            .into_iter()
            .find(|(name, _)| name == "action")
            .map(|(_, value)| value);
        Self { action }
    }
}

/// Body of `get` and `del`
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct KeyRequest {
    pub key: String,
}

/// Body of `add` and `modify`
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AddRequest {
    pub key: String,
    pub value: String,
}

/// Payload of a successful `get`
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct KeyValuePayload {
    pub key: String,
    pub value: String,
}

/// One record as produced by `export` and consumed by `import`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ExportEntry {
    pub name: String,
    pub value: String,
}

/// Payload of `import`
#[derive(Debug, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ImportReport {
    pub added: Vec<String>,
    pub skipped: Vec<String>,
}
