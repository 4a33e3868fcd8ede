//! Configuration loading, environment overrides, and validation.

use super::{LangChatConfig, StoreBackend};
use crate::env::{self, vars};
use crate::error::ConfigError;
use crate::paths;
use crate::secret::SecretString;
use crate::types::validate_table_name;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Where a resolved configuration was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Loaded from this file.
    File(PathBuf),
    /// No file at the default path; built-in defaults were used.
    Defaults { missing: PathBuf },
}

impl LangChatConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to a JSON5-compatible string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 has no serializer; plain JSON is valid JSON5
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Resolve configuration for a process: explicit path, else the default
    /// path, else built-in defaults; then environment overrides.
    ///
    /// A missing default file is not an error. A missing explicit file is.
    /// The returned [`ConfigSource`] says where the settings came from, so the
    /// caller can report it once logging is up.
    pub fn resolve(path: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        match path {
            Some(path) => Self::resolve_from(Some(path), path),
            None => Self::resolve_from(None, &paths::config_file()?),
        }
    }

    fn resolve_from(
        explicit: Option<&Path>,
        default_path: &Path,
    ) -> Result<(Self, ConfigSource), ConfigError> {
        let (mut config, source) = match explicit {
            Some(path) => (Self::load(path)?, ConfigSource::File(path.to_path_buf())),
            None => match Self::load(default_path) {
                Ok(config) => (config, ConfigSource::File(default_path.to_path_buf())),
                Err(ConfigError::NotFound(missing)) => {
                    (Self::default(), ConfigSource::Defaults { missing })
                }
                Err(e) => return Err(e),
            },
        };
        config.apply_env();
        Ok((config, source))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(env::get_var);
    }

    /// Apply overrides using `lookup` to read variables.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(vars::SUPABASE_URL) {
            self.store.url = Some(url);
            // A Supabase URL moves the default in-memory backend to REST.
            if self.store.backend == StoreBackend::Memory {
                self.store.backend = StoreBackend::Postgrest;
            }
        }
        if let Some(key) = lookup(vars::SUPABASE_KEY) {
            self.store.api_key = Some(SecretString::new(key));
        }
        if let Some(path) = lookup(vars::LANGCHAT_SQLITE_PATH) {
            self.store.sqlite_path = Some(PathBuf::from(path));
        }
        if let Some(v) = env::parse_var(
            vars::LANGCHAT_ID_INITIAL,
            lookup(vars::LANGCHAT_ID_INITIAL),
        ) {
            self.ids.initial_value = v;
        }
        if let Some(v) = env::parse_var(
            vars::LANGCHAT_ID_RETRIES,
            lookup(vars::LANGCHAT_ID_RETRIES),
        ) {
            self.ids.retry_attempts = v;
        }
        if let Some(v) = env::parse_var(
            vars::LANGCHAT_ID_RETRY_DELAY_MS,
            lookup(vars::LANGCHAT_ID_RETRY_DELAY_MS),
        ) {
            self.ids.retry_delay_ms = v;
        }
        if let Some(v) = env::parse_var(
            vars::LANGCHAT_MAX_CHAT_HISTORY,
            lookup(vars::LANGCHAT_MAX_CHAT_HISTORY),
        ) {
            self.history.max_turns = v;
        }
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        // 1. Store backend requirements
        match self.store.backend {
            StoreBackend::Postgrest => {
                match self.store.url.as_deref() {
                    None => errors.push("PostgREST backend requires store.url".to_string()),
                    Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                        errors.push(format!("store.url must be an http(s) URL, got '{}'", url));
                    }
                    Some(_) => {}
                }
                if self.store.api_key.as_ref().map_or(true, |k| k.is_empty()) {
                    errors.push("PostgREST backend requires store.api_key".to_string());
                }
            }
            StoreBackend::Sqlite | StoreBackend::Memory => {}
        }
        if self.store.timeout_secs == 0 {
            errors.push("store.timeout_secs must be greater than 0".to_string());
        }

        // 2. Allocator knobs
        if self.ids.retry_attempts == 0 {
            errors.push("ids.retry_attempts must be at least 1".to_string());
        }
        if self.ids.initial_value < 0 {
            errors.push(format!(
                "ids.initial_value must not be negative, got {}",
                self.ids.initial_value
            ));
        }

        // 3. Registered tables
        let mut seen = HashSet::new();
        for table in &self.ids.tables {
            if validate_table_name(table).is_err() {
                errors.push(format!("ids.tables: invalid table name '{}'", table));
            } else if !seen.insert(table.as_str()) {
                errors.push(format!("ids.tables: duplicate table '{}'", table));
            }
        }

        // 4. Log level
        if !matches!(
            self.logging.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            errors.push(format!("Unknown logging.level '{}'", self.logging.level));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}
