//! Configuration schema definitions.

use crate::secret::SecretString;
use crate::types::KnownTable;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main LangChat configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LangChatConfig {
    /// Backing record store.
    #[serde(default)]
    pub store: StoreConfig,

    /// Sequential ID allocation.
    #[serde(default)]
    pub ids: IdConfig,

    /// Conversation history reads.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which backing store implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store; contents are lost on exit.
    #[default]
    Memory,
    /// Supabase / PostgREST over HTTP.
    Postgrest,
    /// Local SQLite database file.
    Sqlite,
}

/// Backing store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Project URL for the PostgREST backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// API key for the PostgREST backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<SecretString>,

    /// Database file for the SQLite backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqlite_path: Option<PathBuf>,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: None,
            api_key: None,
            sqlite_path: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Sequential ID allocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdConfig {
    /// Lowest ID issued for an empty table.
    #[serde(default = "default_initial_value")]
    pub initial_value: i64,

    /// Insert attempts before `insert_with_retry` gives up.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Pause after each conflicting insert, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Tables registered at startup.
    #[serde(default = "KnownTable::names")]
    pub tables: Vec<String>,
}

impl IdConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            initial_value: default_initial_value(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            tables: KnownTable::names(),
        }
    }
}

fn default_initial_value() -> i64 {
    1
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    200
}

/// Conversation history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Most recent turns read back per user and domain.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

fn default_max_turns() -> usize {
    20
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when no filter is set in the environment.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
