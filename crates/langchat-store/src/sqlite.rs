//! SQLite record store.
//!
//! Each table is `(id INTEGER PRIMARY KEY, data TEXT NOT NULL)`; every field
//! other than `id` is kept in `data` as a JSON object.

use crate::error::mentions_unique_violation;
use crate::store::record_id;
use crate::{Record, RecordStore, Result, StoreError, ID_FIELD};
use async_trait::async_trait;
use langchat_core::types::{validate_field_name, validate_table_name};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, info};

/// Record store backed by a SQLite database.
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Open (creating if needed) the database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::config(format!("Cannot create {}: {}", parent.display(), e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!(path = %path.display(), "opened SQLite record store");
        Ok(Self { pool })
    }

    /// Open a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        // Every connection to :memory: is a separate database, so keep exactly
        // one alive for the life of the pool.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    /// Fetch a row by ID.
    pub async fn get(&self, table: &str, id: i64) -> Result<Option<Record>> {
        validate_table_name(table)?;
        let data: Option<String> =
            sqlx::query_scalar(&format!("SELECT data FROM \"{}\" WHERE id = ?", table))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error(table, e))?;

        data.map(|data| decode_row(id, &data)).transpose()
    }
}

/// Rebuild a record from its `id` column and JSON `data` column.
fn decode_row(id: i64, data: &str) -> Result<Record> {
    let mut record: Record = serde_json::from_str(data)?;
    record.insert(ID_FIELD.to_string(), Value::from(id));
    Ok(record)
}

/// Map sqlx errors onto the store taxonomy.
fn map_sqlx_error(table: &str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() || mentions_unique_violation(db.message()) {
            return StoreError::conflict(table, db.message());
        }
        if db.message().contains("no such table") {
            return StoreError::UnknownTable(table.to_string());
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn row_count(&self, table: &str) -> Result<u64> {
        validate_table_name(table)?;
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{}\"", table))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(table, e))?;
        Ok(count.max(0) as u64)
    }

    async fn max_id(&self, table: &str) -> Result<Option<i64>> {
        validate_table_name(table)?;
        let max: Option<i64> = sqlx::query_scalar(&format!("SELECT MAX(id) FROM \"{}\"", table))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(table, e))?;
        Ok(max)
    }

    async fn insert(&self, table: &str, record: Record) -> Result<Record> {
        validate_table_name(table)?;
        let id = record_id(&record)?;

        let mut data = record.clone();
        data.remove(ID_FIELD);
        let data = serde_json::to_string(&data)?;

        sqlx::query(&format!("INSERT INTO \"{}\" (id, data) VALUES (?, ?)", table))
            .bind(id)
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(table, e))?;

        Ok(record)
    }

    async fn latest_rows(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        time_field: &str,
        limit: usize,
    ) -> Result<Vec<Record>> {
        validate_table_name(table)?;
        validate_field_name(time_field)?;

        let mut sql = format!("SELECT id, data FROM \"{}\"", table);
        for (i, (field, _)) in filters.iter().enumerate() {
            validate_field_name(field)?;
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            sql.push_str(&format!("json_extract(data, '$.{}') = ?", field));
        }
        // julianday() is NULL for unreadable timestamps, which sorts them last
        sql.push_str(&format!(
            " ORDER BY julianday(json_extract(data, '$.{}')) DESC, id DESC LIMIT ?",
            time_field
        ));

        let mut query = sqlx::query_as::<_, (i64, String)>(&sql);
        for (_, value) in filters {
            query = query.bind(*value);
        }
        let rows = query
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(table, e))?;

        rows.iter().map(|(id, data)| decode_row(*id, data)).collect()
    }

    async fn ensure_table(&self, table: &str) -> Result<()> {
        validate_table_name(table)?;
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (id INTEGER PRIMARY KEY, data TEXT NOT NULL)",
            table
        ))
        .execute(&self.pool)
        .await?;
        debug!(table, "ensured SQLite table");
        Ok(())
    }
}
