//! Allocator behaviour against shared stores and restarts.

use langchat_core::types::{ChatHistoryRecord, KnownTable};
use langchat_integration_tests::{record, RacingStore};
use langchat_store::{
    load_chat_history, seed_known_tables, AllocatorSettings, IdAllocator, MemoryRecordStore,
    RecordStore, SqliteRecordStore,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn settings() -> AllocatorSettings {
    AllocatorSettings {
        retry_delay: Duration::from_millis(1),
        ..AllocatorSettings::default()
    }
}

#[tokio::test]
async fn test_two_allocators_share_one_store() {
    let store = Arc::new(MemoryRecordStore::new());
    let first = IdAllocator::new(store.clone(), settings()).unwrap();
    let second = IdAllocator::new(store.clone(), settings()).unwrap();
    first.initialize().await.unwrap();
    second.initialize().await.unwrap();

    // Both start at 1; the store arbitrates
    for n in 0..5 {
        first
            .insert_with_retry("chat_history", record(json!({"from": "first", "n": n})))
            .await
            .unwrap()
            .expect("first allocator insert");
        second
            .insert_with_retry("chat_history", record(json!({"from": "second", "n": n})))
            .await
            .unwrap()
            .expect("second allocator insert");
    }

    let ids = store.ids("chat_history").await;
    assert_eq!(ids.len(), 10);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 10);
    assert!(first.stats().conflicts + second.stats().conflicts > 0);
}

#[tokio::test]
async fn test_rival_writer_forces_single_retry() {
    let inner = Arc::new(MemoryRecordStore::new());
    let store = Arc::new(RacingStore::new(inner.clone()));
    let allocator = IdAllocator::new(store.clone(), settings()).unwrap();
    allocator.initialize().await.unwrap();

    store.rival_claims("feedback", 1).await;
    let stored = allocator
        .insert_with_retry("feedback", record(json!({"rating": 5})))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stored["id"], 2);
    assert_eq!(allocator.stats().conflicts, 1);
    assert_eq!(inner.ids("feedback").await, vec![1, 2]);
    assert_eq!(inner.get("feedback", 1).await.unwrap()["rival"], true);
}

#[tokio::test]
async fn test_rival_high_id_pulls_counter_forward() {
    let inner = Arc::new(MemoryRecordStore::new());
    let store = Arc::new(RacingStore::new(inner.clone()));
    let allocator = IdAllocator::new(store.clone(), settings()).unwrap();
    allocator.initialize().await.unwrap();

    // The rival takes both the next ID and a far-away one
    store.rival_claims("request_metrics", 1).await;
    store.rival_claims("request_metrics", 90).await;

    let stored = allocator
        .insert_with_retry("request_metrics", record(json!({"success": true})))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["id"], 91);
    assert_eq!(allocator.next_id("request_metrics").unwrap(), 92);
}

#[tokio::test]
async fn test_sqlite_counters_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");

    {
        let store = Arc::new(SqliteRecordStore::open(&path).await.unwrap());
        for table in KnownTable::names() {
            store.ensure_table(&table).await.unwrap();
        }
        let allocator = IdAllocator::new(store, settings()).unwrap();
        allocator.initialize().await.unwrap();

        let seeded = seed_known_tables(&allocator).await.unwrap();
        assert_eq!(seeded.len(), 3);

        for n in 0..3 {
            let turn = ChatHistoryRecord::new("u1", "travel", format!("q{}", n), "a");
            allocator.insert_record(&turn).await.unwrap().unwrap();
        }
    }

    let store = Arc::new(SqliteRecordStore::open(&path).await.unwrap());
    assert_eq!(store.row_count("chat_history").await.unwrap(), 4);

    let allocator = IdAllocator::new(store.clone(), settings()).unwrap();
    allocator.initialize().await.unwrap();
    assert_eq!(allocator.counters()["chat_history"], 5);
    assert_eq!(allocator.counters()["feedback"], 2);

    let stored = allocator
        .insert_record(&ChatHistoryRecord::new("u2", "travel", "after restart", "ok"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored["id"], 5);
    assert_eq!(
        store.get("chat_history", 5).await.unwrap().unwrap()["query"],
        "after restart"
    );
}

#[tokio::test]
async fn test_initialize_after_external_writes_moves_forward() {
    let store = Arc::new(MemoryRecordStore::new());
    let allocator = IdAllocator::new(store.clone(), settings()).unwrap();
    allocator.initialize().await.unwrap();
    assert_eq!(allocator.counters()["feedback"], 1);

    for id in [1, 2, 3] {
        store.insert("feedback", record(json!({"id": id}))).await.unwrap();
    }
    allocator.initialize().await.unwrap();
    assert_eq!(allocator.next_id("feedback").unwrap(), 4);
}

#[tokio::test]
async fn test_saved_turns_read_back_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteRecordStore::open(&dir.path().join("records.db")).await.unwrap());
    store.ensure_table("chat_history").await.unwrap();
    let allocator = IdAllocator::new(store.clone(), settings()).unwrap();
    allocator.initialize().await.unwrap();
    seed_known_tables(&allocator).await.unwrap();

    for n in 0..4 {
        let turn = ChatHistoryRecord::new("u1", "travel", format!("q{}", n), format!("a{}", n));
        allocator.insert_record(&turn).await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    allocator
        .insert_record(&ChatHistoryRecord::new("u1", "food", "other", "domain"))
        .await
        .unwrap()
        .unwrap();

    let turns = load_chat_history(store.as_ref(), "u1", "travel", 3).await.unwrap();
    let queries: Vec<&str> = turns.iter().map(|t| t.query.as_str()).collect();
    assert_eq!(queries, vec!["q1", "q2", "q3"]);

    // The system seed row belongs to no user
    assert!(load_chat_history(store.as_ref(), "system", "travel", 3)
        .await
        .unwrap()
        .is_empty());
}
