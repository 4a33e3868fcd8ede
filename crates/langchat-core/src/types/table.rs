//! Table names.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tables present in every LangChat deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnownTable {
    /// Conversation turns, one row per query/response pair.
    ChatHistory,
    /// Per-request latency and outcome.
    RequestMetrics,
    /// User feedback on responses.
    Feedback,
}

impl KnownTable {
    /// All known tables, in startup order.
    pub const ALL: [KnownTable; 3] = [
        KnownTable::ChatHistory,
        KnownTable::RequestMetrics,
        KnownTable::Feedback,
    ];

    /// Table name in the backing store.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownTable::ChatHistory => "chat_history",
            KnownTable::RequestMetrics => "request_metrics",
            KnownTable::Feedback => "feedback",
        }
    }

    /// Names of all known tables.
    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|t| t.as_str().to_string()).collect()
    }
}

impl fmt::Display for KnownTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnownTable {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ConfigError::InvalidTableName(s.to_string()))
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Check that a table name is safe to place in a URL path or SQL identifier.
///
/// Accepts non-empty names made of ASCII alphanumerics and underscores that do
/// not start with a digit.
pub fn validate_table_name(name: &str) -> Result<(), ConfigError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTableName(name.to_string()))
    }
}

/// Same rules as [`validate_table_name`], for column and JSON field names used
/// in filters and ordering.
pub fn validate_field_name(name: &str) -> Result<(), ConfigError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("Invalid field name: {:?}", name)))
    }
}
