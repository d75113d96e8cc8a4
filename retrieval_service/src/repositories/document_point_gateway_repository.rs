use std::time::Duration;

use async_trait::async_trait;
use common::{
    dtos::{
        templates::rpc_response::{RpcErrorStatus, RpcResponse},
        vector_gateway_request::VectorGatewayRequestDto,
        vector_gateway_response::{VectorGatewayResponseData, VectorGatewayResponseDto},
    },
    helper::error_chain_fmt,
};
use tracing::info;

use crate::{
    configuration::VectorGatewaySettings,
    domain::entities::{
        document_point::DocumentPoint, retrieved_context::RetrievedContexts,
        search_query::SearchQuery, tenant_id::TenantId,
    },
    ports::document_point_store::{DocumentPointStore, DocumentPointStoreError},
};

/// Repository forwarding document point operations to the vector gateway
///
/// Used when the process cannot reach the Qdrant network directly. Every
/// call is one stateless request/response exchange; the gateway applies the
/// same filter construction as the direct repository, and retries are safe
/// on every operation.
pub struct DocumentPointGatewayRepository {
    http_client: reqwest::Client,
    endpoint: String,
}

impl DocumentPointGatewayRepository {
    pub fn try_new(
        settings: &VectorGatewaySettings,
    ) -> Result<Self, DocumentPointGatewayRepositoryError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(DocumentPointGatewayRepositoryError::HttpClientError)?;

        Ok(Self {
            http_client,
            endpoint: settings.endpoint.clone(),
        })
    }

    #[tracing::instrument(name = "Invoking the vector gateway", skip(self, request))]
    async fn invoke(
        &self,
        request: &VectorGatewayRequestDto,
    ) -> Result<VectorGatewayResponseData, DocumentPointStoreError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                DocumentPointStoreError::StoreUnavailable(format!(
                    "Failed to reach the vector gateway: {}",
                    e
                ))
            })?;

        let body = response.bytes().await.map_err(|e| {
            DocumentPointStoreError::StoreUnavailable(format!(
                "Failed to read the vector gateway response: {}",
                e
            ))
        })?;

        let response = VectorGatewayResponseDto::try_parsing(&body).map_err(|e| {
            DocumentPointStoreError::StoreUnavailable(format!(
                "The vector gateway answered with an unreadable body: {}",
                e
            ))
        })?;

        match response {
            RpcResponse::Ok { data } => Ok(data),
            RpcResponse::Error {
                status: RpcErrorStatus::BadRequest,
                message,
            } => Err(DocumentPointStoreError::GatewayRejected(message)),
            RpcResponse::Error { message, .. } => {
                Err(DocumentPointStoreError::StoreUnavailable(message))
            }
        }
    }
}

#[async_trait]
impl DocumentPointStore for DocumentPointGatewayRepository {
    async fn batch_upsert(
        &self,
        points: Vec<DocumentPoint>,
    ) -> Result<u64, DocumentPointStoreError> {
        let expected = points.len() as u64;

        let mut ids = Vec::with_capacity(points.len());
        let mut vectors = Vec::with_capacity(points.len());
        let mut payloads = Vec::with_capacity(points.len());
        for point in points {
            let payload = serde_json::to_value(&point.payload).map_err(|e| {
                DocumentPointStoreError::StoreUnavailable(format!(
                    "Failed to encode a point payload: {}",
                    e
                ))
            })?;

            ids.push(point.id);
            vectors.push(point.vector);
            payloads.push(payload);
        }

        let request = VectorGatewayRequestDto::Upsert {
            collection: None,
            ids,
            vectors,
            payloads,
        };

        match self.invoke(&request).await? {
            VectorGatewayResponseData::Upserted { upserted } if upserted < expected => {
                Err(DocumentPointStoreError::PartialWrite {
                    expected,
                    written: upserted,
                })
            }
            VectorGatewayResponseData::Upserted { upserted } => {
                info!(upserted, "Upserted document points through the gateway");
                Ok(upserted)
            }
            _ => Err(mismatched_response("upsert")),
        }
    }

    async fn search(
        &self,
        query: &SearchQuery,
        now: i64,
    ) -> Result<RetrievedContexts, DocumentPointStoreError> {
        let request = VectorGatewayRequestDto::Search {
            collection: None,
            tenant_id: query.tenant_id.as_ref().to_string(),
            session_id: query.session_id.clone(),
            scope: query.scope.map(|scope| scope.as_str().to_string()),
            query_vector: query.vector.clone(),
            top_k: query.top_k,
            now: Some(now),
        };

        match self.invoke(&request).await? {
            VectorGatewayResponseData::Found { contexts, sources } => {
                Ok(RetrievedContexts { contexts, sources })
            }
            _ => Err(mismatched_response("search")),
        }
    }

    async fn purge_expired(
        &self,
        tenant_id: &TenantId,
        now: i64,
    ) -> Result<u64, DocumentPointStoreError> {
        let request = VectorGatewayRequestDto::PurgeExpired {
            collection: None,
            tenant_id: tenant_id.as_ref().to_string(),
            now: Some(now),
        };

        match self.invoke(&request).await? {
            VectorGatewayResponseData::Purged { deleted } => Ok(deleted),
            _ => Err(mismatched_response("purge_expired")),
        }
    }
}

fn mismatched_response(action: &str) -> DocumentPointStoreError {
    DocumentPointStoreError::StoreUnavailable(format!(
        "The vector gateway answered {} with a mismatched response shape",
        action
    ))
}

#[derive(thiserror::Error)]
pub enum DocumentPointGatewayRepositoryError {
    #[error("Failed to build the gateway HTTP client: {0}")]
    HttpClientError(reqwest::Error),
}

impl std::fmt::Debug for DocumentPointGatewayRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
