//! Shared fixtures for LangChat integration tests.

use async_trait::async_trait;
use langchat_core::types::Record;
use langchat_store::{MemoryRecordStore, RecordStore, StoreError};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Build a record from a `json!` object literal.
pub fn record(value: serde_json::Value) -> Record {
    value
        .as_object()
        .cloned()
        .expect("fixture record must be a JSON object")
}

/// A store shared with a simulated second process.
///
/// Every insert made through the allocator first lets the rival writer claim
/// the next ID(s) queued in `rival_ids`, mimicking another allocator instance
/// racing on the same table.
pub struct RacingStore {
    pub inner: Arc<MemoryRecordStore>,
    rival_ids: Mutex<Vec<(String, i64)>>,
}

impl RacingStore {
    pub fn new(inner: Arc<MemoryRecordStore>) -> Self {
        Self {
            inner,
            rival_ids: Mutex::new(Vec::new()),
        }
    }

    /// Queue an ID the rival writer will insert before the next allocator insert.
    pub async fn rival_claims(&self, table: &str, id: i64) {
        self.rival_ids.lock().await.push((table.to_string(), id));
    }
}

#[async_trait]
impl RecordStore for RacingStore {
    fn name(&self) -> &str {
        "racing"
    }

    async fn row_count(&self, table: &str) -> Result<u64, StoreError> {
        self.inner.row_count(table).await
    }

    async fn max_id(&self, table: &str) -> Result<Option<i64>, StoreError> {
        self.inner.max_id(table).await
    }

    async fn insert(&self, table: &str, record: Record) -> Result<Record, StoreError> {
        let claims: Vec<(String, i64)> = self.rival_ids.lock().await.drain(..).collect();
        for (rival_table, id) in claims {
            self.inner
                .insert(&rival_table, crate::record(serde_json::json!({"id": id, "rival": true})))
                .await?;
        }
        self.inner.insert(table, record).await
    }

    async fn latest_rows(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        time_field: &str,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        self.inner.latest_rows(table, filters, time_field, limit).await
    }

    async fn ensure_table(&self, table: &str) -> Result<(), StoreError> {
        self.inner.ensure_table(table).await
    }
}
