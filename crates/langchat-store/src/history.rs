//! Reading conversation history back out of a store.

use crate::{RecordStore, Result};
use langchat_core::types::{ChatHistoryRecord, KnownTable};
use serde_json::Value;
use tracing::debug;

/// Field the turns are ordered by.
const TIMESTAMP_FIELD: &str = "timestamp";

/// Load the `max_turns` most recent turns of `user_id` in `domain`, oldest
/// first.
pub async fn load_chat_history<S>(
    store: &S,
    user_id: &str,
    domain: &str,
    max_turns: usize,
) -> Result<Vec<ChatHistoryRecord>>
where
    S: RecordStore + ?Sized,
{
    if max_turns == 0 {
        return Ok(Vec::new());
    }

    let rows = store
        .latest_rows(
            KnownTable::ChatHistory.as_str(),
            &[("user_id", user_id), ("domain", domain)],
            TIMESTAMP_FIELD,
            max_turns,
        )
        .await?;

    let mut turns = rows
        .into_iter()
        .map(|row| serde_json::from_value::<ChatHistoryRecord>(Value::Object(row)))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    turns.reverse();

    debug!(user_id, domain, turns = turns.len(), "loaded chat history");
    Ok(turns)
}
