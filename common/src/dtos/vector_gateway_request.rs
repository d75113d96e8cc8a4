use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::helper::error_chain_fmt;

/// Request accepted by the vector gateway function
///
/// One invocation carries exactly one action. The collection is optional:
/// the gateway falls back to its configured default when it is omitted.
/// `now` lets the caller pin the timestamp used for expiry conditions so
/// that both execution paths evaluate visibility at the same instant.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum VectorGatewayRequestDto {
    Upsert {
        #[serde(default)]
        collection: Option<String>,
        ids: Vec<Uuid>,
        vectors: Vec<Vec<f32>>,
        payloads: Vec<JsonValue>,
    },
    Search {
        #[serde(default)]
        collection: Option<String>,
        tenant_id: String,
        session_id: String,
        #[serde(default)]
        scope: Option<String>,
        query_vector: Vec<f32>,
        #[serde(default = "default_top_k")]
        top_k: u32,
        #[serde(default)]
        now: Option<i64>,
    },
    PurgeExpired {
        #[serde(default)]
        collection: Option<String>,
        tenant_id: String,
        #[serde(default)]
        now: Option<i64>,
    },
}

fn default_top_k() -> u32 {
    5
}

impl VectorGatewayRequestDto {
    pub fn try_parsing(data: &[u8]) -> Result<Self, VectorGatewayRequestDtoError> {
        let data = std::str::from_utf8(data)?;
        let request = serde_json::from_str(data)
            .map_err(|e| VectorGatewayRequestDtoError::InvalidJsonData(e, data.to_string()))?;

        Ok(request)
    }
}

#[derive(thiserror::Error)]
pub enum VectorGatewayRequestDtoError {
    #[error("Data could not be converted from utf8 u8 vector to string")]
    InvalidStringData(#[from] std::str::Utf8Error),

    #[error("Data did not represent a valid gateway request: {0}. Data: {1}")]
    InvalidJsonData(serde_json::Error, String),
}

impl std::fmt::Debug for VectorGatewayRequestDtoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
