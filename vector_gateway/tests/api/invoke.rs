use std::sync::Arc;

use chrono::Duration;
use serde_json::json;
use uuid::Uuid;

use common::dtos::{
    templates::rpc_response::{RpcErrorStatus, RpcResponse},
    vector_gateway_response::{VectorGatewayResponseData, VectorGatewayResponseDto},
};
use retrieval_service::{
    configuration::VectorGatewaySettings,
    domain::{
        entities::{
            document_point::{DocumentPointPayload, PointScope},
            tenant_id::TenantId,
        },
        services::document_retrieval::DocumentRetrievalService,
    },
    repositories::document_point_gateway_repository::DocumentPointGatewayRepository,
};

use crate::helpers::{a_tenant_name, spawn_app, TestApp};

/// The retrieval facade wired to the spawned gateway, in gateway mode
fn gateway_service(app: &TestApp) -> DocumentRetrievalService {
    let settings = VectorGatewaySettings {
        endpoint: app.invoke_endpoint(),
        timeout_seconds: 30,
    };
    let repository =
        DocumentPointGatewayRepository::try_new(&settings).expect("Failed to build the repository");

    DocumentRetrievalService::new(Arc::new(repository))
}

fn a_vector(seed: f32) -> Vec<f32> {
    vec![seed, 1.0, 0.0, 0.0]
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires a running Qdrant instance"]
async fn an_unknown_action_gets_an_explicit_error_response() {
    let app = spawn_app().await;

    let response = app
        .api_client
        .post(app.invoke_endpoint())
        .json(&json!({ "action": "reindex", "tenant_id": "acme" }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status().as_u16(), 400);

    let body = response.bytes().await.unwrap();
    match VectorGatewayResponseDto::try_parsing(&body).unwrap() {
        RpcResponse::Error { status, .. } => assert_eq!(status, RpcErrorStatus::BadRequest),
        RpcResponse::Ok { .. } => panic!("Expected an error envelope"),
    }
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires a running Qdrant instance"]
async fn an_upsert_with_mismatched_lengths_is_rejected() {
    let app = spawn_app().await;

    let response = app
        .api_client
        .post(app.invoke_endpoint())
        .json(&json!({
            "action": "upsert",
            "ids": [Uuid::new_v4()],
            "vectors": [[0.1, 1.0, 0.0, 0.0], [0.2, 1.0, 0.0, 0.0]],
            "payloads": [],
        }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires a running Qdrant instance"]
async fn a_search_with_an_empty_tenant_id_is_rejected() {
    let app = spawn_app().await;

    let response = app
        .api_client
        .post(app.invoke_endpoint())
        .json(&json!({
            "action": "search",
            "tenant_id": "",
            "session_id": "s1",
            "query_vector": [0.1, 1.0, 0.0, 0.0],
        }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires a running Qdrant instance"]
async fn a_purge_reports_the_deleted_count_in_its_envelope() {
    let app = spawn_app().await;
    let tenant = a_tenant_name();

    let response = app
        .api_client
        .post(app.invoke_endpoint())
        .json(&json!({ "action": "purge_expired", "tenant_id": tenant }))
        .send()
        .await
        .expect("Failed to execute request.");

    assert!(response.status().is_success());

    let body = response.bytes().await.unwrap();
    match VectorGatewayResponseDto::try_parsing(&body).unwrap() {
        RpcResponse::Ok {
            data: VectorGatewayResponseData::Purged { deleted },
        } => assert_eq!(deleted, 0),
        other => panic!("Expected a purged envelope, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires a running Qdrant instance"]
async fn the_full_retrieval_lifecycle_works_through_the_gateway() {
    let app = spawn_app().await;
    let service = gateway_service(&app);
    let tenant = a_tenant_name();
    let tenant_id = TenantId::parse(&tenant).unwrap();

    service
        .upsert(
            vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()],
            vec![a_vector(0.1), a_vector(0.2), a_vector(0.3)],
            vec![
                DocumentPointPayload::permanent(
                    tenant_id.clone(),
                    "report.pdf",
                    0,
                    "ops@example.com",
                    "a permanent chunk",
                ),
                DocumentPointPayload::temporary(
                    tenant_id.clone(),
                    "s1",
                    Duration::hours(1),
                    "notes.pdf",
                    0,
                    "ops@example.com",
                    "a live chunk of s1",
                ),
                DocumentPointPayload::temporary(
                    tenant_id.clone(),
                    "s1",
                    Duration::seconds(-10),
                    "notes.pdf",
                    1,
                    "ops@example.com",
                    "an expired chunk",
                ),
            ],
        )
        .await
        .unwrap();

    // The expired point is already invisible
    let found = service
        .search(&tenant, "s1", None, a_vector(0.1), 10)
        .await
        .unwrap();
    assert_eq!(found.contexts.len(), 2);
    assert!(found.contexts.contains(&"a permanent chunk".to_string()));
    assert!(found.contexts.contains(&"a live chunk of s1".to_string()));

    // Another session of the same tenant sees no temporary points
    let found = service
        .search(
            &tenant,
            "s2",
            Some(PointScope::Temporary),
            a_vector(0.1),
            10,
        )
        .await
        .unwrap();
    assert!(found.is_empty());

    // Purge reclaims the expired point once
    assert_eq!(service.purge_expired(&tenant).await.unwrap(), 1);
    assert_eq!(service.purge_expired(&tenant).await.unwrap(), 0);

    // The live points survive the purge
    let found = service
        .search(&tenant, "s1", None, a_vector(0.1), 10)
        .await
        .unwrap();
    assert_eq!(found.contexts.len(), 2);
}
