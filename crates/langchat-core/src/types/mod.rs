//! Core type definitions for LangChat.

mod record;
mod table;

pub use record::*;
pub use table::*;
