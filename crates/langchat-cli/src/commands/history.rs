//! Conversation history commands.

use anyhow::Context;
use clap::Args;
use langchat_core::types::ChatHistoryRecord;
use langchat_core::LangChatConfig;
use langchat_store::{load_chat_history, open_store};

/// Arguments for `history`.
#[derive(Args)]
pub struct HistoryArgs {
    /// User whose turns to show
    pub user_id: String,

    /// Conversation domain
    pub domain: String,

    /// Number of turns (defaults to `history.max_turns`)
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// Print recent turns, oldest first.
pub async fn run(args: HistoryArgs, config: &LangChatConfig) -> anyhow::Result<()> {
    config.validate()?;
    let store = open_store(&config.store, &config.ids.tables)
        .await
        .context("Failed to open record store")?;

    let limit = args.limit.unwrap_or(config.history.max_turns);
    let turns = load_chat_history(store.as_ref(), &args.user_id, &args.domain, limit)
        .await
        .context("Failed to load chat history")?;

    if turns.is_empty() {
        println!("No history for {} in {}.", args.user_id, args.domain);
    }
    for turn in &turns {
        println!("{}", format_turn(turn));
    }
    Ok(())
}

fn format_turn(turn: &ChatHistoryRecord) -> String {
    format!(
        "[{}] {}\n  {}",
        turn.timestamp.format("%Y-%m-%d %H:%M:%S"),
        turn.query,
        turn.response
    )
}
