//! Record store boundary and the in-memory implementation.

use crate::{Record, Result, StoreError, ID_FIELD};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// Authoritative row storage for the allocator.
///
/// Implementations must enforce uniqueness of the `id` column and report a
/// violation as [`StoreError::Conflict`], distinct from every other failure.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Total number of rows in `table`.
    async fn row_count(&self, table: &str) -> Result<u64>;

    /// Largest `id` in `table`, or `None` when it has no rows.
    async fn max_id(&self, table: &str) -> Result<Option<i64>>;

    /// Insert a record carrying an integer `id` and return the stored row.
    async fn insert(&self, table: &str, record: Record) -> Result<Record>;

    /// Up to `limit` rows of `table` whose string fields equal every
    /// `(field, value)` in `filters`, newest first.
    ///
    /// Rows are ordered by the RFC 3339 timestamp in `time_field`, then by
    /// `id`, both descending. Rows without a readable timestamp come last.
    async fn latest_rows(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        time_field: &str,
        limit: usize,
    ) -> Result<Vec<Record>>;

    /// Create `table` if the backend manages its own schema.
    ///
    /// The default does nothing, for stores whose tables are provisioned
    /// elsewhere.
    async fn ensure_table(&self, _table: &str) -> Result<()> {
        Ok(())
    }
}

/// Read the integer `id` out of a record.
pub(crate) fn record_id(record: &Record) -> Result<i64> {
    record
        .get(ID_FIELD)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| StoreError::InvalidRecord(format!("record has no integer '{}'", ID_FIELD)))
}

/// Ordering key for [`RecordStore::latest_rows`]: timestamp, then ID.
fn recency_key(record: &Record, time_field: &str) -> (Option<DateTime<FixedOffset>>, i64) {
    let time = record
        .get(time_field)
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok());
    let id = record.get(ID_FIELD).and_then(Value::as_i64).unwrap_or(i64::MIN);
    (time, id)
}

/// In-memory record store.
///
/// Tables are created on first insert; a table never written to reads as empty.
pub struct MemoryRecordStore {
    tables: RwLock<HashMap<String, BTreeMap<i64, Record>>>,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Create `table` if it does not exist.
    pub async fn create_table(&self, table: &str) {
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default();
    }

    /// Fetch a row by ID.
    pub async fn get(&self, table: &str, id: i64) -> Option<Record> {
        let tables = self.tables.read().await;
        tables.get(table).and_then(|rows| rows.get(&id)).cloned()
    }

    /// All rows of `table`, ordered by ID.
    pub async fn rows(&self, table: &str) -> Vec<Record> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// IDs present in `table`, ascending.
    pub async fn ids(&self, table: &str) -> Vec<i64> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .map(|rows| rows.keys().copied().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables.get(table).map_or(0, |rows| rows.len() as u64))
    }

    async fn max_id(&self, table: &str) -> Result<Option<i64>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .and_then(|rows| rows.keys().next_back().copied()))
    }

    async fn insert(&self, table: &str, record: Record) -> Result<Record> {
        let id = record_id(&record)?;
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();

        if rows.contains_key(&id) {
            return Err(StoreError::conflict(
                table,
                format!("duplicate key value violates unique constraint: id={}", id),
            ));
        }

        rows.insert(id, record.clone());
        Ok(record)
    }

    async fn latest_rows(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        time_field: &str,
        limit: usize,
    ) -> Result<Vec<Record>> {
        let tables = self.tables.read().await;
        let Some(rows) = tables.get(table) else {
            return Ok(Vec::new());
        };

        let mut matching: Vec<&Record> = rows
            .values()
            .filter(|row| {
                filters
                    .iter()
                    .all(|(field, value)| row.get(*field).and_then(Value::as_str) == Some(*value))
            })
            .collect();
        matching.sort_by_key(|row| Reverse(recency_key(row, time_field)));

        Ok(matching.into_iter().take(limit).cloned().collect())
    }

    async fn ensure_table(&self, table: &str) -> Result<()> {
        self.create_table(table).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_empty_table_reads() {
        let store = MemoryRecordStore::new();
        assert_eq!(store.row_count("chat_history").await.unwrap(), 0);
        assert_eq!(store.max_id("chat_history").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_insert_and_stats() {
        let store = MemoryRecordStore::new();
        store.insert("feedback", row(json!({"id": 7, "rating": 5}))).await.unwrap();
        store.insert("feedback", row(json!({"id": 2, "rating": 1}))).await.unwrap();

        assert_eq!(store.row_count("feedback").await.unwrap(), 2);
        assert_eq!(store.max_id("feedback").await.unwrap(), Some(7));
        assert_eq!(store.ids("feedback").await, vec![2, 7]);
        assert_eq!(store.get("feedback", 7).await.unwrap()["rating"], 5);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_conflict() {
        let store = MemoryRecordStore::new();
        store.insert("feedback", row(json!({"id": 1}))).await.unwrap();

        let err = store.insert("feedback", row(json!({"id": 1}))).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.row_count("feedback").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_requires_integer_id() {
        let store = MemoryRecordStore::new();
        let err = store.insert("feedback", row(json!({"id": "one"}))).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));

        let err = store.insert("feedback", row(json!({"rating": 3}))).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
    }

    #[tokio::test]
    async fn test_latest_rows_filters_and_orders() {
        let store = MemoryRecordStore::new();
        for (id, user, ts) in [
            (1, "u1", "2024-05-01T10:00:03Z"),
            (2, "u1", "2024-05-01T10:00:01Z"),
            (3, "u2", "2024-05-01T10:00:09Z"),
            (4, "u1", "2024-05-01T12:00:02+02:00"),
            (5, "u1", "not a time"),
        ] {
            store
                .insert("chat_history", row(json!({"id": id, "user_id": user, "timestamp": ts})))
                .await
                .unwrap();
        }

        let latest = store
            .latest_rows("chat_history", &[("user_id", "u1")], "timestamp", 10)
            .await
            .unwrap();
        let ids: Vec<i64> = latest.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        // 12:00:02+02:00 is 10:00:02Z
        assert_eq!(ids, vec![1, 4, 2, 5]);

        let newest = store
            .latest_rows("chat_history", &[("user_id", "u1")], "timestamp", 2)
            .await
            .unwrap();
        assert_eq!(newest.len(), 2);
        assert_eq!(newest[0]["id"], 1);

        assert!(store
            .latest_rows("feedback", &[], "timestamp", 5)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_tables_are_independent() {
        let store = MemoryRecordStore::new();
        store.create_table("request_metrics").await;
        store.insert("chat_history", row(json!({"id": 1}))).await.unwrap();
        store.insert("feedback", row(json!({"id": 1}))).await.unwrap();

        assert_eq!(store.row_count("request_metrics").await.unwrap(), 0);
        assert_eq!(store.rows("chat_history").await.len(), 1);
        assert_eq!(store.rows("feedback").await.len(), 1);
    }
}
