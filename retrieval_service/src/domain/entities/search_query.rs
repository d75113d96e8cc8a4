use common::helper::error_chain_fmt;

use super::{
    document_point::{Embeddings, PointScope},
    tenant_id::{TenantId, TenantIdError},
};

/// A validated similarity query scoped to one tenant
///
/// With `scope = None` the query covers the union of the tenant's permanent
/// points and the session's live temporary points, so a session id is
/// required whenever temporary points could be visible.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub tenant_id: TenantId,
    pub session_id: String,
    pub scope: Option<PointScope>,
    pub vector: Embeddings,
    pub top_k: u32,
}

impl SearchQuery {
    pub fn try_new(
        tenant_id: &str,
        session_id: &str,
        scope: Option<PointScope>,
        vector: Embeddings,
        top_k: u32,
    ) -> Result<Self, SearchQueryError> {
        let tenant_id = TenantId::parse(tenant_id)?;

        if top_k == 0 {
            return Err(SearchQueryError::ZeroTopK);
        }

        if scope != Some(PointScope::Permanent) && session_id.trim().is_empty() {
            return Err(SearchQueryError::MissingSessionId);
        }

        Ok(Self {
            tenant_id,
            session_id: session_id.to_string(),
            scope,
            vector,
            top_k,
        })
    }
}

#[derive(thiserror::Error)]
pub enum SearchQueryError {
    #[error(transparent)]
    InvalidTenantId(#[from] TenantIdError),

    #[error("top_k must be at least 1")]
    ZeroTopK,

    #[error("A session id is required when temporary points can be searched")]
    MissingSessionId,
}

impl std::fmt::Debug for SearchQueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
