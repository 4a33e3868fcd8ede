//! Environment variable handling.

use std::env;
use std::str::FromStr;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a raw variable value into `T`.
///
/// Unparseable values are ignored with a warning rather than aborting startup.
pub fn parse_var<T: FromStr>(name: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring unparseable environment variable");
            None
        }
    }
}

/// Environment variable names understood by LangChat.
pub mod vars {
    /// Supabase / PostgREST project URL.
    pub const SUPABASE_URL: &str = "SUPABASE_URL";

    /// Supabase / PostgREST API key.
    pub const SUPABASE_KEY: &str = "SUPABASE_KEY";

    /// SQLite database path override.
    pub const LANGCHAT_SQLITE_PATH: &str = "LANGCHAT_SQLITE_PATH";

    /// First ID issued for an empty table.
    pub const LANGCHAT_ID_INITIAL: &str = "LANGCHAT_ID_INITIAL";

    /// Insert attempts before giving up.
    pub const LANGCHAT_ID_RETRIES: &str = "LANGCHAT_ID_RETRIES";

    /// Pause between conflicting insert attempts, in milliseconds.
    pub const LANGCHAT_ID_RETRY_DELAY_MS: &str = "LANGCHAT_ID_RETRY_DELAY_MS";

    /// Chat history turns read back per user and domain.
    pub const LANGCHAT_MAX_CHAT_HISTORY: &str = "LANGCHAT_MAX_CHAT_HISTORY";

    /// LangChat config file override.
    pub const LANGCHAT_CONFIG: &str = "LANGCHAT_CONFIG";

    /// LangChat log filter.
    pub const LANGCHAT_LOG: &str = "LANGCHAT_LOG";
}
