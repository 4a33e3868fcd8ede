//! Config file to running allocator.

use langchat_cli::commands::ids::build_allocator;
use langchat_core::config::{LangChatConfig, StoreBackend};
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_config_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("langchat.json5");

    let mut config = LangChatConfig::default();
    config.ids.initial_value = 0;
    config.ids.retry_attempts = 5;
    config.save(&path).unwrap();

    let loaded = LangChatConfig::load(&path).unwrap();
    assert_eq!(loaded.ids.initial_value, 0);
    assert_eq!(loaded.ids.retry_attempts, 5);
    assert_eq!(loaded.ids.tables, config.ids.tables);
}

#[test]
fn test_config_load_nonexistent() {
    assert!(LangChatConfig::load(Path::new("/nonexistent/langchat.json5")).is_err());
}

#[tokio::test]
async fn test_sqlite_config_builds_working_allocator() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("langchat.json5");
    let db = dir.path().join("records.db");

    std::fs::write(
        &path,
        format!(
            r#"{{
                store: {{ backend: "sqlite", sqlite_path: {:?} }},
                ids: {{ initial_value: 100, tables: ["chat_history", "audit_log"] }},
            }}"#,
            db.display().to_string()
        ),
    )
    .unwrap();

    let config = LangChatConfig::load(&path).unwrap();
    assert_eq!(config.store.backend, StoreBackend::Sqlite);

    let allocator = build_allocator(&config).await.unwrap();
    assert_eq!(allocator.next_id("audit_log").unwrap(), 100);
    assert!(allocator.next_id("feedback").is_err());
    assert!(db.exists());
}
