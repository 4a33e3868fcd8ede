//! ID allocation commands.

use anyhow::Context;
use clap::Args;
use langchat_core::types::Record;
use langchat_core::LangChatConfig;
use langchat_store::{open_store, seed_known_tables, IdAllocator, RecordStore};
use tracing::debug;

/// Arguments for `next-id`.
#[derive(Args)]
pub struct NextIdArgs {
    /// Table to draw from
    pub table: String,

    /// Number of IDs to draw
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: u32,
}

/// Arguments for `insert`.
#[derive(Args)]
pub struct InsertArgs {
    /// Target table
    pub table: String,

    /// Row fields as a JSON object (without `id`)
    pub data: String,

    /// Register the table if it is not in `ids.tables`
    #[arg(long)]
    pub register: bool,
}

/// Open the configured store and build an initialized allocator over it.
pub async fn build_allocator(config: &LangChatConfig) -> anyhow::Result<IdAllocator<dyn RecordStore>> {
    config.validate()?;
    debug!(backend = ?config.store.backend, tables = ?config.ids.tables, "building ID allocator");
    let store = open_store(&config.store, &config.ids.tables)
        .await
        .context("Failed to open record store")?;
    let allocator = IdAllocator::new(store, (&config.ids).into())?;
    allocator
        .initialize()
        .await
        .context("Failed to initialize ID counters")?;
    Ok(allocator)
}

/// Parse a JSON object argument into a record.
pub fn parse_record(data: &str) -> anyhow::Result<Record> {
    let value: serde_json::Value = serde_json::from_str(data).context("Invalid JSON")?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => anyhow::bail!("Expected a JSON object, got: {}", other),
    }
}

/// Print the next ID of every registered table.
pub async fn counters(config: &LangChatConfig) -> anyhow::Result<()> {
    let allocator = build_allocator(config).await?;
    let counters = allocator.counters();
    let width = counters.keys().map(|t| t.len()).max().unwrap_or(0);

    println!("store: {}", allocator.store().name());
    for (table, next) in counters {
        println!("  {:<width$}  next id {}", table, next, width = width);
    }
    Ok(())
}

/// Draw IDs from one table.
pub async fn next_id(args: NextIdArgs, config: &LangChatConfig) -> anyhow::Result<()> {
    let allocator = build_allocator(config).await?;
    for _ in 0..args.count {
        println!("{}", allocator.next_id(&args.table)?);
    }
    Ok(())
}

/// Insert one row.
pub async fn insert(args: InsertArgs, config: &LangChatConfig) -> anyhow::Result<()> {
    let data = parse_record(&args.data)?;
    let allocator = build_allocator(config).await?;

    if args.register {
        allocator.provision_table(&args.table).await?;
    }

    match allocator.insert_with_retry(&args.table, data).await? {
        Some(stored) => {
            println!("{}", serde_json::to_string_pretty(&stored)?);
            Ok(())
        }
        None => anyhow::bail!(
            "Insert into {} failed after {} attempts due to ID conflicts",
            args.table,
            allocator.settings().retry_attempts
        ),
    }
}

/// Seed empty known tables.
pub async fn seed(config: &LangChatConfig) -> anyhow::Result<()> {
    let allocator = build_allocator(config).await?;
    let seeded = seed_known_tables(&allocator).await?;

    if seeded.is_empty() {
        println!("All known tables already have rows.");
    } else {
        for table in seeded {
            println!("Seeded {}", table);
        }
    }
    Ok(())
}
