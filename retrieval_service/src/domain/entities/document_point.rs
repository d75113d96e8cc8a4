use chrono::{Duration, Utc};
use common::helper::error_chain_fmt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::tenant_id::TenantId;

pub type Embeddings = Vec<f32>;

/// The atomic stored unit: one embedded text chunk and its metadata
///
/// Ids are caller-generated. Upserting a point with an existing id fully
/// replaces it, which makes retries of the same batch safe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPoint {
    pub id: Uuid,
    pub vector: Embeddings,
    pub payload: DocumentPointPayload,
}

/// Visibility lifetime of a document point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointScope {
    Permanent,
    Temporary,
}

impl PointScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointScope::Permanent => "permanent",
            PointScope::Temporary => "temporary",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DocumentPointPayloadError> {
        match s {
            "permanent" => Ok(PointScope::Permanent),
            "temporary" => Ok(PointScope::Temporary),
            other => Err(DocumentPointPayloadError::UnknownScope(other.to_string())),
        }
    }
}

/// Metadata attached to every stored point
///
/// `tenant_id`, `scope`, `session_id` and `expires_at` drive the visibility
/// and purge predicates. The remaining fields are descriptive and opaque to
/// the retrieval logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPointPayload {
    pub tenant_id: TenantId,
    pub scope: PointScope,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub source: String,
    pub chunk_index: u32,
    pub created_at: i64,
    pub uploaded_by: String,
    pub text: String,
}

impl DocumentPointPayload {
    /// Payload for a point visible to every session of the tenant, forever
    pub fn permanent(
        tenant_id: TenantId,
        source: impl Into<String>,
        chunk_index: u32,
        uploaded_by: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id,
            scope: PointScope::Permanent,
            session_id: None,
            expires_at: None,
            source: source.into(),
            chunk_index,
            created_at: Utc::now().timestamp(),
            uploaded_by: uploaded_by.into(),
            text: text.into(),
        }
    }

    /// Payload for a point visible only to `session_id` until its expiry
    ///
    /// Expired points become invisible to searches immediately but stay in
    /// the store until an explicit purge reclaims them.
    pub fn temporary(
        tenant_id: TenantId,
        session_id: impl Into<String>,
        time_to_live: Duration,
        source: impl Into<String>,
        chunk_index: u32,
        uploaded_by: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let created_at = Utc::now().timestamp();

        Self {
            tenant_id,
            scope: PointScope::Temporary,
            session_id: Some(session_id.into()),
            expires_at: Some(created_at + time_to_live.num_seconds()),
            source: source.into(),
            chunk_index,
            created_at,
            uploaded_by: uploaded_by.into(),
            text: text.into(),
        }
    }

    /// Checks the scope/session/expiry coherence of a payload built outside
    /// of the constructors, for example deserialized from a gateway request
    pub fn validate(&self) -> Result<(), DocumentPointPayloadError> {
        match self.scope {
            PointScope::Temporary => {
                if self
                    .session_id
                    .as_deref()
                    .map_or(true, |s| s.trim().is_empty())
                {
                    return Err(DocumentPointPayloadError::MissingSessionId);
                }
                if self.expires_at.is_none() {
                    return Err(DocumentPointPayloadError::MissingExpiry);
                }
            }
            PointScope::Permanent => {
                if self.session_id.is_some() {
                    return Err(DocumentPointPayloadError::UnexpectedSessionId);
                }
                if self.expires_at.is_some() {
                    return Err(DocumentPointPayloadError::UnexpectedExpiry);
                }
            }
        }

        Ok(())
    }
}

#[derive(thiserror::Error)]
pub enum DocumentPointPayloadError {
    #[error("Unknown point scope: {0}. Use either `permanent` or `temporary`.")]
    UnknownScope(String),

    #[error("A temporary point requires a non-empty session id")]
    MissingSessionId,

    #[error("A temporary point requires an expiry timestamp")]
    MissingExpiry,

    #[error("A permanent point cannot carry a session id")]
    UnexpectedSessionId,

    #[error("A permanent point cannot carry an expiry timestamp")]
    UnexpectedExpiry,
}

impl std::fmt::Debug for DocumentPointPayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
