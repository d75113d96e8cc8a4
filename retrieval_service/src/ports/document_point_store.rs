use async_trait::async_trait;
use common::helper::error_chain_fmt;

use crate::domain::entities::{
    document_point::DocumentPoint, retrieved_context::RetrievedContexts,
    search_query::SearchQuery, tenant_id::TenantId,
};

/// Port abstracting where document points are stored and searched
///
/// Two adapters implement it: the direct Qdrant repository and the vector
/// gateway HTTP repository. The `now` timestamp is passed in by the caller
/// so that expiry is evaluated at the same instant regardless of the
/// execution path.
#[async_trait]
pub trait DocumentPointStore: Send + Sync {
    /// Writes a batch of points, replacing any point sharing an id.
    /// Returns the number of points written; a failure means the whole
    /// batch must be retried.
    async fn batch_upsert(&self, points: Vec<DocumentPoint>)
        -> Result<u64, DocumentPointStoreError>;

    /// Returns up to `query.top_k` chunks visible to the query's tenant,
    /// session and scope, best matches first.
    async fn search(
        &self,
        query: &SearchQuery,
        now: i64,
    ) -> Result<RetrievedContexts, DocumentPointStoreError>;

    /// Deletes the tenant's strictly expired temporary points and returns
    /// how many were removed.
    async fn purge_expired(
        &self,
        tenant_id: &TenantId,
        now: i64,
    ) -> Result<u64, DocumentPointStoreError>;
}

#[derive(thiserror::Error)]
pub enum DocumentPointStoreError {
    #[error("The vector store could not be reached or failed: {0}")]
    StoreUnavailable(String),

    #[error("The vector store only acknowledged {written} points out of {expected}")]
    PartialWrite { expected: u64, written: u64 },

    #[error("The vector gateway rejected the request: {0}")]
    GatewayRejected(String),
}

impl std::fmt::Debug for DocumentPointStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
