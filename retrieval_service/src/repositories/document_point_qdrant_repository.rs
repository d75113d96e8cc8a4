use std::collections::HashMap;

use async_trait::async_trait;
use common::helper::error_chain_fmt;
use qdrant_client::{
    prelude::QdrantClient,
    qdrant::{
        self, points_selector::PointsSelectorOneOf, value::Kind, vectors_config::Config,
        CountPoints, CreateCollection, Distance, PointStruct, PointsSelector, SearchPoints,
        UpdateStatus, VectorParams, VectorsConfig, WithPayloadSelector,
        with_payload_selector::SelectorOptions,
    },
};
use tracing::info;

use crate::{
    configuration::QdrantSettings,
    domain::{
        entities::{
            document_point::{DocumentPoint, DocumentPointPayload},
            retrieved_context::RetrievedContexts,
            search_query::SearchQuery,
            tenant_id::TenantId,
        },
        services::visibility_filter,
    },
    ports::document_point_store::{DocumentPointStore, DocumentPointStoreError},
};

/// Repository for document points persisted in Qdrant
///
/// Bound to a default collection; the inherent methods take the collection
/// name so the vector gateway can honor per-request overrides.
pub struct DocumentPointQdrantRepository {
    client: QdrantClient,
    collection_name: String,
    collection_distance: Distance,
    collection_vector_size: u64,
}

impl DocumentPointQdrantRepository {
    #[tracing::instrument(name = "Initializing Qdrant and the associated collection", skip(client))]
    pub async fn try_new(
        client: QdrantClient,
        settings: &QdrantSettings,
    ) -> Result<Self, DocumentPointQdrantRepositoryError> {
        let collection_distance = Distance::from_str_name(&settings.collection_distance).ok_or(
            DocumentPointQdrantRepositoryError::QdrantConfigurationError(format!(
                "Invalid Qdrant distance from configuration: {}",
                settings.collection_distance
            )),
        )?;

        let repository = Self {
            client,
            collection_name: settings.collection.clone(),
            collection_distance,
            collection_vector_size: settings.collection_vector_size,
        };

        repository
            .ensure_collection(&settings.collection)
            .await?;

        Ok(repository)
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    /// Creates the collection if it does not exist yet
    ///
    /// Safe to call repeatedly and from concurrent first-time callers: the
    /// loser of a creation race gets an "already exists" answer, which is
    /// treated as success.
    #[tracing::instrument(name = "Ensuring the Qdrant collection exists", skip(self))]
    pub async fn ensure_collection(
        &self,
        collection_name: &str,
    ) -> Result<(), DocumentPointQdrantRepositoryError> {
        let exists = self
            .client
            .has_collection(collection_name)
            .await
            .map_err(|e| DocumentPointQdrantRepositoryError::QdrantError(e.to_string()))?;

        if exists {
            return Ok(());
        }

        match self
            .client
            .create_collection(&CreateCollection {
                collection_name: collection_name.to_string(),
                vectors_config: Some(VectorsConfig {
                    config: Some(Config::Params(VectorParams {
                        size: self.collection_vector_size,
                        distance: self.collection_distance as i32,
                        ..Default::default()
                    })),
                }),
                ..Default::default()
            })
            .await
        {
            Ok(_) => {
                info!("Created Qdrant collection {}", collection_name);
                Ok(())
            }
            Err(error) => {
                // Qdrant client only returns anyhow errors for now
                if error.to_string().contains("already exists") {
                    Ok(())
                } else {
                    Err(DocumentPointQdrantRepositoryError::QdrantError(
                        error.to_string(),
                    ))
                }
            }
        }
    }

    /// Writes a batch of points, waiting for the operation to complete
    ///
    /// Points sharing an id with an existing point replace it. The whole
    /// batch fails or succeeds: a non-completed operation is reported as an
    /// error, never as a silent zero-write.
    #[tracing::instrument(name = "Saving document points to Qdrant", skip(self, points))]
    pub async fn batch_upsert_into(
        &self,
        collection_name: &str,
        points: Vec<DocumentPoint>,
    ) -> Result<u64, DocumentPointQdrantRepositoryError> {
        let written = points.len() as u64;
        let points: Vec<PointStruct> = points.into_iter().map(PointStruct::from).collect();

        let response = self
            .client
            .upsert_points_blocking(collection_name, points, None)
            .await
            .map_err(|e| DocumentPointQdrantRepositoryError::QdrantError(e.to_string()))?;

        let result = response.result.ok_or_else(|| {
            DocumentPointQdrantRepositoryError::QdrantError(
                "Upsert answered without an operation result".to_string(),
            )
        })?;

        match result.status() {
            UpdateStatus::Completed | UpdateStatus::Acknowledged => {
                info!(written, "Saved document points");
                Ok(written)
            }
            other => Err(DocumentPointQdrantRepositoryError::QdrantError(format!(
                "Upsert finished with unexpected status {:?}",
                other
            ))),
        }
    }

    /// Runs a filtered similarity search and normalizes the ranked payloads
    ///
    /// Results come back best match first. Ordering among equal scores is
    /// backend-defined.
    #[tracing::instrument(name = "Searching document points in Qdrant", skip(self, query))]
    pub async fn search_in(
        &self,
        collection_name: &str,
        query: &SearchQuery,
        now: i64,
    ) -> Result<RetrievedContexts, DocumentPointQdrantRepositoryError> {
        let filter =
            visibility_filter::search_filter(&query.tenant_id, query.scope, &query.session_id, now);

        let response = self
            .client
            .search_points(&SearchPoints {
                collection_name: collection_name.to_string(),
                vector: query.vector.clone(),
                limit: query.top_k as u64,
                filter: Some(filter),
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| DocumentPointQdrantRepositoryError::QdrantError(e.to_string()))?;

        let found = RetrievedContexts::from_ranked_chunks(response.result.into_iter().map(
            |point| {
                (
                    payload_string(&point.payload, "text"),
                    payload_string(&point.payload, "source"),
                )
            },
        ));

        info!(
            nb_contexts = found.contexts.len(),
            "Searched document points"
        );
        Ok(found)
    }

    /// Deletes the tenant's strictly expired temporary points
    ///
    /// The count is taken right before the delete with the same predicate;
    /// points expiring concurrently are picked up by the next purge.
    #[tracing::instrument(name = "Purging expired document points from Qdrant", skip(self))]
    pub async fn purge_expired_in(
        &self,
        collection_name: &str,
        tenant_id: &TenantId,
        now: i64,
    ) -> Result<u64, DocumentPointQdrantRepositoryError> {
        let filter = visibility_filter::purge_filter(tenant_id, now);

        let response = self
            .client
            .count(&CountPoints {
                collection_name: collection_name.to_string(),
                filter: Some(filter.clone()),
                exact: Some(true),
            })
            .await
            .map_err(|e| DocumentPointQdrantRepositoryError::QdrantError(e.to_string()))?;

        let expired = response.result.map(|r| r.count).unwrap_or(0);
        if expired == 0 {
            return Ok(0);
        }

        self.client
            .delete_points_blocking(
                collection_name,
                &PointsSelector {
                    points_selector_one_of: Some(PointsSelectorOneOf::Filter(filter)),
                },
                None,
            )
            .await
            .map_err(|e| DocumentPointQdrantRepositoryError::QdrantError(e.to_string()))?;

        info!(deleted = expired, "Purged expired document points");
        Ok(expired)
    }
}

#[async_trait]
impl DocumentPointStore for DocumentPointQdrantRepository {
    async fn batch_upsert(
        &self,
        points: Vec<DocumentPoint>,
    ) -> Result<u64, DocumentPointStoreError> {
        Ok(self.batch_upsert_into(&self.collection_name, points).await?)
    }

    async fn search(
        &self,
        query: &SearchQuery,
        now: i64,
    ) -> Result<RetrievedContexts, DocumentPointStoreError> {
        Ok(self.search_in(&self.collection_name, query, now).await?)
    }

    async fn purge_expired(
        &self,
        tenant_id: &TenantId,
        now: i64,
    ) -> Result<u64, DocumentPointStoreError> {
        Ok(self
            .purge_expired_in(&self.collection_name, tenant_id, now)
            .await?)
    }
}

#[derive(thiserror::Error)]
pub enum DocumentPointQdrantRepositoryError {
    #[error("Error from Qdrant: {0}")]
    QdrantError(String),

    #[error("Error from Qdrant config: {0}")]
    QdrantConfigurationError(String),
}

impl std::fmt::Debug for DocumentPointQdrantRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<DocumentPointQdrantRepositoryError> for DocumentPointStoreError {
    fn from(error: DocumentPointQdrantRepositoryError) -> Self {
        DocumentPointStoreError::StoreUnavailable(error.to_string())
    }
}

impl From<DocumentPoint> for PointStruct {
    fn from(point: DocumentPoint) -> Self {
        Self {
            id: Some(point.id.to_string().into()),
            vectors: Some(point.vector.into()),
            payload: qdrant_payload(&point.payload),
        }
    }
}

/// Flattens a payload into Qdrant values
///
/// Absent optional fields are omitted instead of stored as nulls.
fn qdrant_payload(payload: &DocumentPointPayload) -> HashMap<String, qdrant::Value> {
    let mut map = HashMap::from([
        (
            "tenant_id".to_string(),
            qdrant::Value::from(payload.tenant_id.as_ref().to_string()),
        ),
        (
            "scope".to_string(),
            qdrant::Value::from(payload.scope.as_str().to_string()),
        ),
        (
            "source".to_string(),
            qdrant::Value::from(payload.source.clone()),
        ),
        (
            "chunk_index".to_string(),
            qdrant::Value::from(payload.chunk_index as i64),
        ),
        (
            "created_at".to_string(),
            qdrant::Value::from(payload.created_at),
        ),
        (
            "uploaded_by".to_string(),
            qdrant::Value::from(payload.uploaded_by.clone()),
        ),
        (
            "text".to_string(),
            qdrant::Value::from(payload.text.clone()),
        ),
    ]);

    if let Some(session_id) = &payload.session_id {
        map.insert(
            "session_id".to_string(),
            qdrant::Value::from(session_id.clone()),
        );
    }
    if let Some(expires_at) = payload.expires_at {
        map.insert("expires_at".to_string(), qdrant::Value::from(expires_at));
    }

    map
}

fn payload_string(payload: &HashMap<String, qdrant::Value>, key: &str) -> String {
    match payload.get(key).and_then(|value| value.kind.as_ref()) {
        Some(Kind::StringValue(s)) => s.clone(),
        _ => String::new(),
    }
}
