use chrono::Duration;
use fake::{faker::lorem::en::Sentence, Fake};
use uuid::Uuid;

use retrieval_service::domain::entities::document_point::PointScope;

use crate::helpers::{
    a_permanent_payload, a_temporary_payload, a_tenant_name, a_vector, spawn_store,
};

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires a running Qdrant instance"]
async fn a_search_never_returns_points_of_another_tenant() {
    let store = spawn_store().await;
    let tenant_1 = a_tenant_name();
    let tenant_2 = a_tenant_name();

    store
        .service
        .upsert(
            vec![Uuid::new_v4()],
            vec![a_vector(0.1)],
            vec![a_permanent_payload(&tenant_1, "belongs to the first tenant")],
        )
        .await
        .unwrap();
    store
        .service
        .upsert(
            vec![Uuid::new_v4()],
            vec![a_vector(0.1)],
            vec![a_permanent_payload(&tenant_2, "belongs to the second tenant")],
        )
        .await
        .unwrap();

    let found = store
        .service
        .search(&tenant_1, "s1", None, a_vector(0.1), 10)
        .await
        .unwrap();

    assert_eq!(found.contexts, vec!["belongs to the first tenant"]);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires a running Qdrant instance"]
async fn an_expired_temporary_point_is_invisible_to_search_but_eligible_for_purge() {
    let store = spawn_store().await;
    let tenant = a_tenant_name();

    // Already expired when written
    store
        .service
        .upsert(
            vec![Uuid::new_v4()],
            vec![a_vector(0.3)],
            vec![a_temporary_payload(
                &tenant,
                "s1",
                Duration::seconds(-10),
                "an expired chunk",
            )],
        )
        .await
        .unwrap();

    let found = store
        .service
        .search(&tenant, "s1", Some(PointScope::Temporary), a_vector(0.3), 10)
        .await
        .unwrap();
    assert!(found.is_empty());

    let deleted = store.service.purge_expired(&tenant).await.unwrap();
    assert_eq!(deleted, 1);

    // Idempotent: a second purge finds nothing left
    let deleted = store.service.purge_expired(&tenant).await.unwrap();
    assert_eq!(deleted, 0);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires a running Qdrant instance"]
async fn purge_never_selects_permanent_points() {
    let store = spawn_store().await;
    let tenant = a_tenant_name();

    store
        .service
        .upsert(
            vec![Uuid::new_v4()],
            vec![a_vector(0.2)],
            vec![a_permanent_payload(&tenant, "a permanent chunk")],
        )
        .await
        .unwrap();

    let deleted = store.service.purge_expired(&tenant).await.unwrap();
    assert_eq!(deleted, 0);

    let found = store
        .service
        .search(&tenant, "s1", None, a_vector(0.2), 10)
        .await
        .unwrap();
    assert_eq!(found.contexts, vec!["a permanent chunk"]);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires a running Qdrant instance"]
async fn upserting_the_same_id_twice_replaces_the_point() {
    let store = spawn_store().await;
    let tenant = a_tenant_name();
    let id = Uuid::new_v4();

    store
        .service
        .upsert(
            vec![id],
            vec![a_vector(0.1)],
            vec![a_permanent_payload(&tenant, "the first version")],
        )
        .await
        .unwrap();
    store
        .service
        .upsert(
            vec![id],
            vec![a_vector(0.9)],
            vec![a_permanent_payload(&tenant, "the second version")],
        )
        .await
        .unwrap();

    let found = store
        .service
        .search(&tenant, "s1", None, a_vector(0.9), 10)
        .await
        .unwrap();

    assert_eq!(found.contexts, vec!["the second version"]);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires a running Qdrant instance"]
async fn an_unscoped_search_returns_permanent_and_live_session_points_only() {
    let store = spawn_store().await;
    let tenant = a_tenant_name();

    store
        .service
        .upsert(
            vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()],
            vec![a_vector(0.1), a_vector(0.2), a_vector(0.3)],
            vec![
                a_permanent_payload(&tenant, "a permanent chunk"),
                a_temporary_payload(&tenant, "s1", Duration::hours(1), "a live chunk of s1"),
                a_temporary_payload(&tenant, "s2", Duration::hours(1), "a live chunk of s2"),
            ],
        )
        .await
        .unwrap();

    let found = store
        .service
        .search(&tenant, "s1", None, a_vector(0.1), 10)
        .await
        .unwrap();

    assert_eq!(found.contexts.len(), 2);
    assert!(found.contexts.contains(&"a permanent chunk".to_string()));
    assert!(found.contexts.contains(&"a live chunk of s1".to_string()));

    // A different session sees no temporary points at all
    let found = store
        .service
        .search(
            &tenant,
            "s3",
            Some(PointScope::Temporary),
            a_vector(0.1),
            10,
        )
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "Requires a running Qdrant instance"]
async fn sources_are_deduplicated_across_matching_chunks() {
    let store = spawn_store().await;
    let tenant = a_tenant_name();

    // Two chunks of the same document share a source
    let texts: Vec<String> = (0..2).map(|_| Sentence(3..8).fake()).collect();
    store
        .service
        .upsert(
            vec![Uuid::new_v4(), Uuid::new_v4()],
            vec![a_vector(0.1), a_vector(0.2)],
            vec![
                a_permanent_payload(&tenant, &texts[0]),
                a_permanent_payload(&tenant, &texts[1]),
            ],
        )
        .await
        .unwrap();

    let found = store
        .service
        .search(&tenant, "s1", None, a_vector(0.1), 10)
        .await
        .unwrap();

    assert_eq!(found.contexts.len(), 2);
    assert_eq!(found.sources, vec!["report.pdf"]);
}
