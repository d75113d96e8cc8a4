use common::helper::error_chain_fmt;
use serde::{Deserialize, Serialize};

/// Identifier of the tenant owning a set of document points
///
/// Every filter built by the retrieval layer starts from a tenant condition,
/// so an empty id can never reach the vector store: it is rejected here at
/// parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn parse(s: &str) -> Result<TenantId, TenantIdError> {
        if s.trim().is_empty() {
            return Err(TenantIdError::EmptyTenantId);
        }

        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for TenantId {
    type Error = TenantIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        TenantId::parse(&s)
    }
}

impl From<TenantId> for String {
    fn from(tenant_id: TenantId) -> Self {
        tenant_id.0
    }
}

#[derive(thiserror::Error)]
pub enum TenantIdError {
    #[error("A tenant id cannot be empty or whitespace")]
    EmptyTenantId,
}

impl std::fmt::Debug for TenantIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
