//! Startup helpers: open the configured store and seed the known tables.

use crate::{
    IdAllocator, IdError, MemoryRecordStore, PostgrestStore, RecordStore, Result,
    SqliteRecordStore,
};
use langchat_core::config::{StoreBackend, StoreConfig};
use langchat_core::paths;
use langchat_core::types::{
    ChatHistoryRecord, FeedbackRecord, KnownTable, RequestMetricsRecord, TableRecord,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Open the store selected by `config`, preparing `tables` where the backend
/// manages its own schema.
pub async fn open_store(config: &StoreConfig, tables: &[String]) -> Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryRecordStore::new()),
        StoreBackend::Postgrest => Arc::new(PostgrestStore::from_config(config)?),
        StoreBackend::Sqlite => {
            let path = match &config.sqlite_path {
                Some(path) => path.clone(),
                None => paths::default_sqlite_file()?,
            };
            Arc::new(SqliteRecordStore::open(&path).await?)
        }
    };

    for table in tables {
        store.ensure_table(table).await?;
    }

    info!(backend = store.name(), "record store ready");
    Ok(store)
}

/// Write one `system` seed row into every known table that is empty.
///
/// Known tables missing from the allocator's registry are registered first.
/// Returns the tables that received a seed row.
pub async fn seed_known_tables<S>(
    allocator: &IdAllocator<S>,
) -> std::result::Result<Vec<KnownTable>, IdError>
where
    S: RecordStore + ?Sized,
{
    let mut seeded = Vec::new();

    for table in KnownTable::ALL {
        allocator.register_table(table.as_str())?;
        if allocator.store().row_count(table.as_str()).await? > 0 {
            continue;
        }

        let inserted = match table {
            KnownTable::ChatHistory => allocator.insert_record(&ChatHistoryRecord::seed()).await?,
            KnownTable::RequestMetrics => {
                allocator.insert_record(&RequestMetricsRecord::seed()).await?
            }
            KnownTable::Feedback => allocator.insert_record(&FeedbackRecord::seed()).await?,
        };

        match inserted {
            Some(_) => {
                info!(%table, "seeded empty table");
                seeded.push(table);
            }
            None => warn!(%table, "could not seed table"),
        }
    }

    Ok(seeded)
}
