//! Path resolution utilities.

use crate::error::ConfigError;
use std::path::PathBuf;

/// Get the LangChat base directory (~/.langchat).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".langchat"))
}

/// Get the main config file path (~/.langchat/langchat.json5).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("langchat.json5"))
}

/// Get the default SQLite database path (~/.langchat/records.db).
pub fn default_sqlite_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("records.db"))
}
