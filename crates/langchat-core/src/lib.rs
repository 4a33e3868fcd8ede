//! # langchat-core
//!
//! Core types, configuration, and utilities for LangChat.
//!
//! This crate provides shared functionality used across the LangChat crates:
//!
//! - **Configuration**: Loading, validation, and environment overrides
//! - **Types**: Known tables and the typed records persisted into them
//! - **Utilities**: Path resolution, table name validation, and secrets

pub mod config;
pub mod types;
pub mod error;
pub mod paths;
pub mod env;
pub mod secret;

// Re-exports for convenience
pub use config::LangChatConfig;
pub use error::ConfigError;
pub use types::*;
pub use secret::SecretString;
