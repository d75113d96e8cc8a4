use std::sync::Arc;

use chrono::Utc;
use common::helper::error_chain_fmt;
use tracing::info;
use uuid::Uuid;

use crate::{
    domain::entities::{
        document_point::{
            DocumentPoint, DocumentPointPayload, DocumentPointPayloadError, Embeddings, PointScope,
        },
        retrieved_context::RetrievedContexts,
        search_query::{SearchQuery, SearchQueryError},
        tenant_id::{TenantId, TenantIdError},
    },
    ports::document_point_store::{DocumentPointStore, DocumentPointStoreError},
};

/// Single entry point of the retrieval layer
///
/// The underlying store (direct Qdrant or the vector gateway) is chosen once
/// at construction; both paths share the same validation and the same filter
/// construction, so the execution mode never changes visibility semantics.
pub struct DocumentRetrievalService {
    store: Arc<dyn DocumentPointStore>,
}

impl DocumentRetrievalService {
    pub fn new(store: Arc<dyn DocumentPointStore>) -> Self {
        Self { store }
    }

    /// Writes a batch of document points
    ///
    /// The three slices must have the same length and every payload must be
    /// coherent; anything else is rejected before the store is contacted.
    /// Retrying a failed batch is always safe: ids are stable and an upsert
    /// with an existing id fully replaces the point.
    #[tracing::instrument(name = "Upserting document points", skip(self, vectors, payloads))]
    pub async fn upsert(
        &self,
        ids: Vec<Uuid>,
        vectors: Vec<Embeddings>,
        payloads: Vec<DocumentPointPayload>,
    ) -> Result<u64, RetrievalError> {
        if ids.len() != vectors.len() || ids.len() != payloads.len() {
            return Err(RetrievalError::MismatchedBatch {
                ids: ids.len(),
                vectors: vectors.len(),
                payloads: payloads.len(),
            });
        }

        for payload in &payloads {
            payload.validate()?;
        }

        if ids.is_empty() {
            return Ok(0);
        }

        let points: Vec<DocumentPoint> = ids
            .into_iter()
            .zip(vectors)
            .zip(payloads)
            .map(|((id, vector), payload)| DocumentPoint {
                id,
                vector,
                payload,
            })
            .collect();

        let written = self.store.batch_upsert(points).await?;

        info!(written, "Upserted document points");
        Ok(written)
    }

    /// Searches the chunks visible to `tenant_id` under the given scope
    ///
    /// The expiry timestamp is stamped here, once, so that both execution
    /// modes evaluate visibility at the same instant.
    #[tracing::instrument(name = "Searching document points", skip(self, query_vector))]
    pub async fn search(
        &self,
        tenant_id: &str,
        session_id: &str,
        scope: Option<PointScope>,
        query_vector: Embeddings,
        top_k: u32,
    ) -> Result<RetrievedContexts, RetrievalError> {
        let query = SearchQuery::try_new(tenant_id, session_id, scope, query_vector, top_k)?;
        let now = Utc::now().timestamp();

        Ok(self.store.search(&query, now).await?)
    }

    /// Reclaims the tenant's expired temporary points and returns the number
    /// actually deleted
    ///
    /// Purging is always caller-triggered: there is no background scheduler.
    /// Callers invoking it opportunistically (for example before a search)
    /// should treat a failure here as non-fatal and proceed with their
    /// primary operation.
    #[tracing::instrument(name = "Purging expired document points", skip(self))]
    pub async fn purge_expired(&self, tenant_id: &str) -> Result<u64, RetrievalError> {
        let tenant_id = TenantId::parse(tenant_id)?;
        let now = Utc::now().timestamp();

        let deleted = self.store.purge_expired(&tenant_id, now).await?;

        info!(deleted, %tenant_id, "Purged expired document points");
        Ok(deleted)
    }
}

#[derive(thiserror::Error)]
pub enum RetrievalError {
    #[error("Mismatched upsert batch: {ids} ids, {vectors} vectors, {payloads} payloads")]
    MismatchedBatch {
        ids: usize,
        vectors: usize,
        payloads: usize,
    },

    #[error(transparent)]
    InvalidTenantId(#[from] TenantIdError),

    #[error(transparent)]
    InvalidPayload(#[from] DocumentPointPayloadError),

    #[error(transparent)]
    InvalidQuery(#[from] SearchQueryError),

    #[error(transparent)]
    StoreError(#[from] DocumentPointStoreError),
}

impl RetrievalError {
    /// Whether the request was rejected before reaching the vector store
    ///
    /// Callers use this to distinguish caller bugs from store outages, which
    /// they may degrade on (for example answering without retrieved context).
    pub fn is_validation(&self) -> bool {
        !matches!(self, RetrievalError::StoreError(_))
    }
}

impl std::fmt::Debug for RetrievalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
