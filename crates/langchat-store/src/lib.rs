//! Record stores and sequential ID allocation for LangChat.
//!
//! This crate provides:
//! - The [`RecordStore`] boundary and its in-memory, PostgREST and SQLite
//!   implementations
//! - [`IdAllocator`], which issues per-table sequential IDs and inserts rows
//!   with conflict recovery
//! - Startup helpers to open the configured store and seed the known tables
//! - [`load_chat_history`] for reading recent conversation turns back

pub mod allocator;
pub mod bootstrap;
pub mod error;
pub mod history;
pub mod postgrest;
pub mod sqlite;
pub mod store;

pub use allocator::{AllocatorSettings, AllocatorState, AllocatorStats, IdAllocator};
pub use bootstrap::{open_store, seed_known_tables};
pub use error::{IdError, StoreError};
pub use history::load_chat_history;
pub use postgrest::PostgrestStore;
pub use sqlite::SqliteRecordStore;
pub use store::{MemoryRecordStore, RecordStore};

pub use langchat_core::types::{Record, ID_FIELD};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
