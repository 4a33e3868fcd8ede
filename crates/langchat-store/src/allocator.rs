//! Sequential per-table ID allocation.
//!
//! The allocator keeps one in-memory counter per registered table, derived
//! from the backing store's row count and largest `id`. Drawing an ID is a
//! local operation; the store's uniqueness constraint remains the real
//! guarantee, and [`IdAllocator::insert_with_retry`] recovers from the
//! conflicts that other writers cause.
//!
//! ```rust,ignore
//! let store = Arc::new(MemoryRecordStore::new());
//! let allocator = IdAllocator::new(store, AllocatorSettings::default())?;
//! allocator.initialize().await?;
//!
//! let row = allocator
//!     .insert_record(&ChatHistoryRecord::new("u1", "travel", "hi", "hello"))
//!     .await?;
//! ```

use crate::{IdError, Record, RecordStore, ID_FIELD};
use langchat_core::config::IdConfig;
use langchat_core::types::{validate_table_name, KnownTable, TableRecord};
use langchat_core::ConfigError;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Allocator tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatorSettings {
    /// Lowest ID issued for an empty table.
    pub initial_value: i64,

    /// Insert attempts before giving up.
    pub retry_attempts: u32,

    /// Pause after each conflicting attempt.
    pub retry_delay: Duration,

    /// Tables registered at construction.
    pub tables: Vec<String>,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self {
            initial_value: 1,
            retry_attempts: 3,
            retry_delay: Duration::from_millis(200),
            tables: KnownTable::names(),
        }
    }
}

impl From<&IdConfig> for AllocatorSettings {
    fn from(config: &IdConfig) -> Self {
        Self {
            initial_value: config.initial_value,
            retry_attempts: config.retry_attempts,
            retry_delay: config.retry_delay(),
            tables: config.tables.clone(),
        }
    }
}

/// Lifecycle of an allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocatorState {
    Uninitialized,
    Initialized,
}

/// Cumulative allocator activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Inserts rejected by the store as duplicate IDs.
    pub conflicts: u64,
    /// Counter re-derivations from the store, including initialization.
    pub resyncs: u64,
    /// Rows successfully inserted.
    pub inserted: u64,
    /// Inserts abandoned after every attempt conflicted.
    pub exhausted: u64,
}

#[derive(Default)]
struct StatCounters {
    conflicts: AtomicU64,
    resyncs: AtomicU64,
    inserted: AtomicU64,
    exhausted: AtomicU64,
}

impl StatCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> AllocatorStats {
        AllocatorStats {
            conflicts: self.conflicts.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
            inserted: self.inserted.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }
}

/// Issues sequential IDs per table and inserts rows with conflict recovery.
///
/// Share one instance per store across the process (`Arc<IdAllocator<_>>`).
pub struct IdAllocator<S: RecordStore + ?Sized> {
    store: Arc<S>,
    settings: AllocatorSettings,
    /// Registered tables; `None` until the table's counter is synced.
    counters: Mutex<HashMap<String, Option<i64>>>,
    initialized: AtomicBool,
    stats: StatCounters,
}

impl<S: RecordStore + ?Sized> IdAllocator<S> {
    /// Create an allocator over `store`, registering `settings.tables`.
    ///
    /// No store I/O happens until [`initialize`](Self::initialize).
    pub fn new(store: Arc<S>, settings: AllocatorSettings) -> Result<Self, IdError> {
        if settings.retry_attempts == 0 {
            return Err(ConfigError::Validation("retry_attempts must be at least 1".into()).into());
        }

        let mut counters = HashMap::with_capacity(settings.tables.len());
        for table in &settings.tables {
            validate_table_name(table)?;
            counters.insert(table.clone(), None);
        }

        Ok(Self {
            store,
            settings,
            counters: Mutex::new(counters),
            initialized: AtomicBool::new(false),
            stats: StatCounters::default(),
        })
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn settings(&self) -> &AllocatorSettings {
        &self.settings
    }

    pub fn state(&self) -> AllocatorState {
        if self.initialized.load(Ordering::Acquire) {
            AllocatorState::Initialized
        } else {
            AllocatorState::Uninitialized
        }
    }

    pub fn stats(&self) -> AllocatorStats {
        self.stats.snapshot()
    }

    /// Register an additional table. Its counter stays unsynced until
    /// [`sync_table`](Self::sync_table) or the first insert.
    pub fn register_table(&self, table: &str) -> Result<(), IdError> {
        validate_table_name(table)?;
        let mut counters = self.counters.lock();
        if !counters.contains_key(table) {
            counters.insert(table.to_string(), None);
            debug!(table, "registered table");
        }
        Ok(())
    }

    /// Register `table` and have the store create it if it manages its own
    /// schema.
    pub async fn provision_table(&self, table: &str) -> Result<(), IdError> {
        self.register_table(table)?;
        self.store.ensure_table(table).await?;
        Ok(())
    }

    pub fn is_registered(&self, table: &str) -> bool {
        self.counters.lock().contains_key(table)
    }

    /// Registered table names, sorted.
    pub fn tables(&self) -> Vec<String> {
        let mut tables: Vec<String> = self.counters.lock().keys().cloned().collect();
        tables.sort();
        tables
    }

    /// Next ID for every synced table.
    pub fn counters(&self) -> BTreeMap<String, i64> {
        self.counters
            .lock()
            .iter()
            .filter_map(|(table, next)| next.map(|next| (table.clone(), next)))
            .collect()
    }

    /// Sync every registered table's counter with the store.
    ///
    /// Safe to call repeatedly; store failures propagate.
    pub async fn initialize(&self) -> Result<(), IdError> {
        for table in self.tables() {
            self.sync_table(&table).await?;
        }
        self.initialized.store(true, Ordering::Release);
        info!(store = self.store.name(), tables = ?self.counters(), "ID allocator initialized");
        Ok(())
    }

    /// Re-derive `table`'s counter from the store and return it.
    ///
    /// The counter only moves forward: IDs already issued by this allocator
    /// are never issued again.
    pub async fn sync_table(&self, table: &str) -> Result<i64, IdError> {
        if !self.is_registered(table) {
            return Err(IdError::UnknownTable(table.to_string()));
        }

        let row_count = self.store.row_count(table).await?;
        let max_id = self.store.max_id(table).await?;
        let derived = next_from_store(self.settings.initial_value, row_count, max_id);

        let next = {
            let mut counters = self.counters.lock();
            let slot = counters
                .get_mut(table)
                .ok_or_else(|| IdError::UnknownTable(table.to_string()))?;
            let next = slot.map_or(derived, |current| current.max(derived));
            *slot = Some(next);
            next
        };

        StatCounters::bump(&self.stats.resyncs);
        info!(table, next, row_count, ?max_id, "synced ID counter");
        Ok(next)
    }

    /// Issue the next ID for `table`. No store I/O.
    ///
    /// Fails with [`IdError::IdSpaceExhausted`] once the counter sits at
    /// `i64::MAX`, which happens when the store already holds that ID.
    pub fn next_id(&self, table: &str) -> Result<i64, IdError> {
        let mut counters = self.counters.lock();
        match counters.get_mut(table) {
            None => Err(IdError::UnknownTable(table.to_string())),
            Some(None) => Err(IdError::NotInitialized(table.to_string())),
            Some(Some(next)) => {
                let id = *next;
                *next = id
                    .checked_add(1)
                    .ok_or_else(|| IdError::IdSpaceExhausted(table.to_string()))?;
                Ok(id)
            }
        }
    }

    /// Insert `data` into `table` under a freshly issued ID.
    ///
    /// On a uniqueness conflict the counter is resynced and the insert retried
    /// with a new ID after `retry_delay`. Returns `Ok(None)` once
    /// `retry_attempts` attempts have all conflicted. Any other store error is
    /// returned immediately.
    ///
    /// An `id` key in `data` is replaced by the issued ID.
    pub async fn insert_with_retry(
        &self,
        table: &str,
        data: Record,
    ) -> Result<Option<Record>, IdError> {
        let synced = {
            let counters = self.counters.lock();
            match counters.get(table) {
                None => return Err(IdError::UnknownTable(table.to_string())),
                Some(next) => next.is_some(),
            }
        };
        if !synced {
            self.sync_table(table).await?;
        }
        if data.contains_key(ID_FIELD) {
            debug!(table, "replacing caller-supplied id");
        }

        let attempts = self.settings.retry_attempts;
        for attempt in 1..=attempts {
            let id = self.next_id(table)?;
            let mut record = data.clone();
            record.insert(ID_FIELD.to_string(), Value::from(id));

            match self.store.insert(table, record).await {
                Ok(stored) => {
                    StatCounters::bump(&self.stats.inserted);
                    debug!(table, id, attempt, "inserted record");
                    return Ok(Some(stored));
                }
                Err(e) if e.is_conflict() => {
                    StatCounters::bump(&self.stats.conflicts);
                    warn!(table, id, attempt, error = %e, "ID conflict, resyncing counter");
                    self.sync_table(table).await?;
                    if attempt < attempts {
                        tokio::time::sleep(self.settings.retry_delay).await;
                    }
                }
                Err(e) => {
                    error!(table, id, attempt, error = %e, "insert failed");
                    return Err(e.into());
                }
            }
        }

        StatCounters::bump(&self.stats.exhausted);
        error!(table, attempts, "insert abandoned after repeated ID conflicts");
        Ok(None)
    }

    /// Insert a typed record into its table.
    pub async fn insert_record<R: TableRecord + Sync>(
        &self,
        record: &R,
    ) -> Result<Option<Record>, IdError> {
        let data = record.to_record().map_err(crate::StoreError::from)?;
        self.insert_with_retry(R::TABLE.as_str(), data).await
    }
}

/// Counter value implied by the store's current contents.
fn next_from_store(initial_value: i64, row_count: u64, max_id: Option<i64>) -> i64 {
    let after_rows = i64::try_from(row_count).unwrap_or(i64::MAX).saturating_add(1);
    let next = after_rows.max(initial_value);
    match max_id {
        Some(max_id) => next.max(max_id.saturating_add(1)),
        None => next,
    }
}
