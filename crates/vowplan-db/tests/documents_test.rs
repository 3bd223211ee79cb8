//! Integration tests for document storage.
//!
//! Each test gets its own temporary database on the shared PostgreSQL
//! instance provided by `vowplan-test-utils`.

use serde_json::json;

use vowplan_db::models::Collection;
use vowplan_db::pool;
use vowplan_db::queries::documents;
use vowplan_test_utils::{create_test_db, drop_test_db};

#[tokio::test]
async fn set_and_get_document() {
    let (pool, db_name) = create_test_db().await;

    let body = json!({ "total": 50000, "categories": [] });
    let written = documents::set_document(&pool, Collection::Budgets, "user-1", &body)
        .await
        .expect("set_document should succeed");
    assert_eq!(written.collection, "budgets");
    assert_eq!(written.key, "user-1");

    let fetched = documents::get_document(&pool, Collection::Budgets, "user-1")
        .await
        .expect("get_document should succeed")
        .expect("document should exist");
    assert_eq!(fetched.data, body);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn get_missing_document_returns_none() {
    let (pool, db_name) = create_test_db().await;

    let fetched = documents::get_document(&pool, Collection::TodoLists, "nobody")
        .await
        .expect("get_document should not error");
    assert!(fetched.is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn set_overwrites_and_keeps_created_at() {
    let (pool, db_name) = create_test_db().await;

    let first = documents::set_document(
        &pool,
        Collection::VendorRecommendations,
        "user-2",
        &json!({ "vendors": { "venues": [{ "id": "venues-0" }] } }),
    )
    .await
    .unwrap();

    let second = documents::set_document(
        &pool,
        Collection::VendorRecommendations,
        "user-2",
        &json!({ "vendors": { "venues": [] } }),
    )
    .await
    .unwrap();

    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(second.data, json!({ "vendors": { "venues": [] } }));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn merge_preserves_untouched_keys() {
    let (pool, db_name) = create_test_db().await;

    documents::set_document(
        &pool,
        Collection::Users,
        "user-3",
        &json!({ "email": "a@example.com", "onboardingComplete": false }),
    )
    .await
    .unwrap();

    let merged = documents::merge_document(
        &pool,
        Collection::Users,
        "user-3",
        &json!({ "onboardingComplete": true }),
    )
    .await
    .unwrap();

    assert_eq!(merged.data["email"], "a@example.com");
    assert_eq!(merged.data["onboardingComplete"], true);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn merge_creates_missing_document() {
    let (pool, db_name) = create_test_db().await;

    let merged = documents::merge_document(
        &pool,
        Collection::Users,
        "fresh-user",
        &json!({ "onboardingComplete": true }),
    )
    .await
    .unwrap();
    assert_eq!(merged.data, json!({ "onboardingComplete": true }));

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn merge_rejects_non_object_patch() {
    let (pool, db_name) = create_test_db().await;

    let result =
        documents::merge_document(&pool, Collection::Users, "user-4", &json!([1, 2])).await;
    assert!(result.is_err());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn counts_by_collection() {
    let (pool, db_name) = create_test_db().await;

    for key in ["a", "b"] {
        documents::set_document(&pool, Collection::TodoLists, key, &json!({}))
            .await
            .unwrap();
    }
    documents::set_document(&pool, Collection::Budgets, "a", &json!({}))
        .await
        .unwrap();

    assert_eq!(
        documents::count_documents(&pool, Collection::TodoLists)
            .await
            .unwrap(),
        2
    );

    let counts = pool::collection_counts(&pool).await.unwrap();
    assert_eq!(
        counts,
        vec![("budgets".to_string(), 1), ("todoLists".to_string(), 2)]
    );

    pool::ping(&pool).await.expect("ping should succeed");

    pool.close().await;
    drop_test_db(&db_name).await;
}
