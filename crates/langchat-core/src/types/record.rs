//! Typed rows for the known tables.

use super::KnownTable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A row as exchanged with a backing store: a JSON object.
pub type Record = serde_json::Map<String, Value>;

/// Name of the allocator-assigned identity column.
pub const ID_FIELD: &str = "id";

/// User and domain written on seed rows.
pub const SYSTEM_USER: &str = "system";

/// A typed row bound to one of the known tables.
pub trait TableRecord: Serialize {
    /// Table the record is stored in.
    const TABLE: KnownTable;

    /// Placeholder row written into an empty table at startup.
    fn seed() -> Self;

    /// Convert into a store record (without an ID).
    fn to_record(&self) -> Result<Record, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
                "{} record serialized to a non-object: {}",
                Self::TABLE,
                other
            ))),
        }
    }
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHistoryRecord {
    pub user_id: String,
    pub domain: String,
    pub query: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatHistoryRecord {
    /// Create a turn stamped with the current time.
    pub fn new(
        user_id: impl Into<String>,
        domain: impl Into<String>,
        query: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            domain: domain.into(),
            query: query.into(),
            response: response.into(),
            timestamp: Utc::now(),
        }
    }
}

impl TableRecord for ChatHistoryRecord {
    const TABLE: KnownTable = KnownTable::ChatHistory;

    fn seed() -> Self {
        Self::new(SYSTEM_USER, SYSTEM_USER, "init", "init")
    }
}

/// Timing and outcome of one chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMetricsRecord {
    pub user_id: String,
    pub request_time: DateTime<Utc>,
    /// Seconds between request and response.
    pub response_time: f64,
    pub success: bool,
    pub error_message: Option<String>,
}

impl RequestMetricsRecord {
    /// A successful request that took `response_time` seconds.
    pub fn success(user_id: impl Into<String>, request_time: DateTime<Utc>, response_time: f64) -> Self {
        Self {
            user_id: user_id.into(),
            request_time,
            response_time,
            success: true,
            error_message: None,
        }
    }

    /// A failed request.
    pub fn failure(
        user_id: impl Into<String>,
        request_time: DateTime<Utc>,
        response_time: f64,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            request_time,
            response_time,
            success: false,
            error_message: Some(error_message.into()),
        }
    }
}

impl TableRecord for RequestMetricsRecord {
    const TABLE: KnownTable = KnownTable::RequestMetrics;

    fn seed() -> Self {
        Self::success(SYSTEM_USER, Utc::now(), 0.0)
    }
}

/// User feedback on a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub user_id: String,
    pub domain: String,
    pub response: String,
    pub feedback_text: String,
    pub rating: i32,
}

impl TableRecord for FeedbackRecord {
    const TABLE: KnownTable = KnownTable::Feedback;

    fn seed() -> Self {
        Self {
            timestamp: Utc::now(),
            kind: SYSTEM_USER.to_string(),
            user_id: SYSTEM_USER.to_string(),
            domain: SYSTEM_USER.to_string(),
            response: "init".to_string(),
            feedback_text: "init".to_string(),
            rating: 1,
        }
    }
}
