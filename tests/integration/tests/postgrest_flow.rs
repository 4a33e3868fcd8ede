//! Allocator driving a PostgREST endpoint end to end.

use langchat_core::SecretString;
use langchat_integration_tests::record;
use langchat_store::{AllocatorSettings, IdAllocator, PostgrestStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_empty_table(server: &MockServer, table: &str) {
    let table_path = format!("/rest/v1/{}", table);
    Mock::given(method("GET"))
        .and(path(table_path.as_str()))
        .and(query_param("order", "id.desc.nullslast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(table_path.as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "*/0")
                .set_body_json(json!([])),
        )
        .mount(server)
        .await;
}

fn allocator_for(server: &MockServer, table: &str) -> IdAllocator<PostgrestStore> {
    let store = PostgrestStore::new(
        server.uri(),
        SecretString::new("service-key"),
        Duration::from_secs(5),
    )
    .unwrap();
    IdAllocator::new(
        Arc::new(store),
        AllocatorSettings {
            tables: vec![table.to_string()],
            retry_delay: Duration::ZERO,
            ..AllocatorSettings::default()
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_conflict_then_success_over_http() {
    let server = MockServer::start().await;
    mount_empty_table(&server, "chat_history").await;

    // ID 1 was taken by another writer the store has not reported yet
    Mock::given(method("POST"))
        .and(path("/rest/v1/chat_history"))
        .and(body_partial_json(json!({"id": 1})))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"chat_history_pkey\""
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/chat_history"))
        .and(body_partial_json(json!({"id": 2, "query": "hello"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([{"id": 2, "query": "hello"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let allocator = allocator_for(&server, "chat_history");
    allocator.initialize().await.unwrap();

    let stored = allocator
        .insert_with_retry("chat_history", record(json!({"query": "hello"})))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stored["id"], 2);
    assert_eq!(allocator.stats().conflicts, 1);
}

#[tokio::test]
async fn test_exhaustion_over_http() {
    let server = MockServer::start().await;
    mount_empty_table(&server, "feedback").await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/feedback"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"feedback_pkey\""
        })))
        .expect(3)
        .mount(&server)
        .await;

    let allocator = allocator_for(&server, "feedback");
    let result = allocator
        .insert_with_retry("feedback", record(json!({"rating": 1})))
        .await
        .unwrap();

    assert!(result.is_none());
    assert_eq!(allocator.stats().exhausted, 1);
}

#[tokio::test]
async fn test_outage_during_initialize_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let allocator = allocator_for(&server, "request_metrics");
    let err = allocator.initialize().await.unwrap_err();
    assert!(!err.is_config());
    assert!(err.to_string().contains("503"));
}
