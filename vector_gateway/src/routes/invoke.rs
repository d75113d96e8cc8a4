use actix_web::{web, HttpResponse};
use chrono::Utc;
use common::dtos::{
    vector_gateway_request::VectorGatewayRequestDto,
    vector_gateway_response::{VectorGatewayResponseData, VectorGatewayResponseDto},
};
use serde_json::Value as JsonValue;
use tracing::{error, warn};
use uuid::Uuid;

use retrieval_service::{
    domain::entities::{
        document_point::{DocumentPoint, DocumentPointPayload, Embeddings, PointScope},
        search_query::SearchQuery,
        tenant_id::TenantId,
    },
    repositories::document_point_qdrant_repository::DocumentPointQdrantRepository,
};

/// Executes one gateway invocation
///
/// The gateway is stateless: each request names its action and carries every
/// parameter, the collection is (idempotently) ensured before acting, and
/// all three actions tolerate duplicate delivery. Malformed bodies and
/// unknown actions get an explicit error envelope, never a silent no-op.
#[tracing::instrument(name = "Handling a vector gateway invocation", skip(body, repository))]
pub async fn invoke(
    body: web::Bytes,
    repository: web::Data<DocumentPointQdrantRepository>,
) -> HttpResponse {
    let request = match VectorGatewayRequestDto::try_parsing(&body) {
        Ok(request) => request,
        Err(error) => {
            warn!(?error, "Failed to parse the gateway request");
            return bad_request(format!("Invalid gateway request: {}", error));
        }
    };

    let collection = match &request {
        VectorGatewayRequestDto::Upsert { collection, .. }
        | VectorGatewayRequestDto::Search { collection, .. }
        | VectorGatewayRequestDto::PurgeExpired { collection, .. } => collection
            .clone()
            .unwrap_or_else(|| repository.collection_name().to_string()),
    };

    if let Err(error) = repository.ensure_collection(&collection).await {
        error!(?error, "Failed to ensure the collection {}", collection);
        return internal_server_error(error.to_string());
    }

    match request {
        VectorGatewayRequestDto::Upsert {
            ids,
            vectors,
            payloads,
            ..
        } => handle_upsert(&repository, &collection, ids, vectors, payloads).await,
        VectorGatewayRequestDto::Search {
            tenant_id,
            session_id,
            scope,
            query_vector,
            top_k,
            now,
            ..
        } => {
            let scope = match scope.as_deref().map(PointScope::parse).transpose() {
                Ok(scope) => scope,
                Err(error) => return bad_request(error.to_string()),
            };

            let query =
                match SearchQuery::try_new(&tenant_id, &session_id, scope, query_vector, top_k) {
                    Ok(query) => query,
                    Err(error) => return bad_request(error.to_string()),
                };

            let now = now.unwrap_or_else(|| Utc::now().timestamp());

            match repository.search_in(&collection, &query, now).await {
                Ok(found) => ok(VectorGatewayResponseData::Found {
                    contexts: found.contexts,
                    sources: found.sources,
                }),
                Err(error) => {
                    error!(?error, "Failed to search document points");
                    internal_server_error(error.to_string())
                }
            }
        }
        VectorGatewayRequestDto::PurgeExpired { tenant_id, now, .. } => {
            let tenant_id = match TenantId::parse(&tenant_id) {
                Ok(tenant_id) => tenant_id,
                Err(error) => return bad_request(error.to_string()),
            };

            let now = now.unwrap_or_else(|| Utc::now().timestamp());

            match repository
                .purge_expired_in(&collection, &tenant_id, now)
                .await
            {
                Ok(deleted) => ok(VectorGatewayResponseData::Purged { deleted }),
                Err(error) => {
                    error!(?error, "Failed to purge expired document points");
                    internal_server_error(error.to_string())
                }
            }
        }
    }
}

async fn handle_upsert(
    repository: &DocumentPointQdrantRepository,
    collection: &str,
    ids: Vec<Uuid>,
    vectors: Vec<Embeddings>,
    payloads: Vec<JsonValue>,
) -> HttpResponse {
    if ids.len() != vectors.len() || ids.len() != payloads.len() {
        return bad_request(format!(
            "Mismatched upsert batch: {} ids, {} vectors, {} payloads",
            ids.len(),
            vectors.len(),
            payloads.len()
        ));
    }

    let mut points = Vec::with_capacity(ids.len());
    for ((id, vector), payload) in ids.into_iter().zip(vectors).zip(payloads) {
        let payload: DocumentPointPayload = match serde_json::from_value(payload) {
            Ok(payload) => payload,
            Err(error) => {
                return bad_request(format!("Invalid point payload: {}", error));
            }
        };
        if let Err(error) = payload.validate() {
            return bad_request(error.to_string());
        }

        points.push(DocumentPoint {
            id,
            vector,
            payload,
        });
    }

    match repository.batch_upsert_into(collection, points).await {
        Ok(upserted) => ok(VectorGatewayResponseData::Upserted { upserted }),
        Err(error) => {
            error!(?error, "Failed to upsert document points");
            internal_server_error(error.to_string())
        }
    }
}

fn ok(data: VectorGatewayResponseData) -> HttpResponse {
    HttpResponse::Ok().json(VectorGatewayResponseDto::ok(data))
}

fn bad_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(VectorGatewayResponseDto::bad_request(message))
}

fn internal_server_error(message: String) -> HttpResponse {
    HttpResponse::InternalServerError().json(VectorGatewayResponseDto::internal_server_error(
        message,
    ))
}
