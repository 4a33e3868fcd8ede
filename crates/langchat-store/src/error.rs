//! Store and allocator error types.

use langchat_core::ConfigError;
use thiserror::Error;

/// Errors raised by a [`RecordStore`](crate::RecordStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The insert violated the table's uniqueness constraint.
    #[error("Uniqueness conflict in {table}: {message}")]
    Conflict { table: String, message: String },

    /// The table does not exist in the store.
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// The record cannot be stored as given.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reported by a remote store API.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The store answered with something unexpected.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Create a uniqueness conflict error.
    pub fn conflict(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this is a uniqueness conflict that a fresh ID may resolve.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<ConfigError> for StoreError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Case-insensitive check for the uniqueness-violation wording used by
/// Postgres and SQLite.
pub(crate) fn mentions_unique_violation(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("duplicate key") || message.contains("unique constraint")
}

/// Errors raised by the [`IdAllocator`](crate::IdAllocator).
#[derive(Debug, Error)]
pub enum IdError {
    /// The table was never registered with the allocator.
    #[error("Table not registered: {0}")]
    UnknownTable(String),

    /// The table is registered but its counter was never synced.
    #[error("Counter for {0} not initialized")]
    NotInitialized(String),

    /// The counter reached `i64::MAX`; no larger ID exists.
    #[error("ID space exhausted for {0}")]
    IdSpaceExhausted(String),

    /// Invalid allocator configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backing store failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IdError {
    /// Whether the error comes from configuration rather than the store.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::UnknownTable(_) | Self::NotInitialized(_) | Self::Config(_)
        )
    }
}
