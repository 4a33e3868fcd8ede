//! LangChat command-line interface.

pub mod commands;

use clap::{Parser, Subcommand};
use langchat_core::config::LoggingConfig;
use langchat_core::env::{self, vars};
use langchat_core::LangChatConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// LangChat - record store and ID allocation tools
#[derive(Parser)]
#[command(name = "langchat")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    #[arg(short, long, env = vars::LANGCHAT_CONFIG, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show the next ID of every registered table
    Counters,

    /// Draw IDs from a table's counter
    NextId(commands::ids::NextIdArgs),

    /// Insert a JSON object under a freshly allocated ID
    Insert(commands::ids::InsertArgs),

    /// Write a seed row into every empty known table
    Seed,

    /// Show a user's recent conversation turns
    History(commands::history::HistoryArgs),

    /// Configuration management
    Config(commands::config::ConfigArgs),

    /// Show version information
    Version,
}

/// Install the global tracing subscriber.
///
/// `LANGCHAT_LOG` (or `RUST_LOG`) wins over the configured level; each `-v`
/// raises the default by one step.
pub fn init_tracing(verbose: u8, logging: &LoggingConfig) {
    let filter = env::get_var(vars::LANGCHAT_LOG)
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive(verbose, &logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn default_directive(verbose: u8, level: &str) -> String {
    let level = match verbose {
        0 => level,
        1 => "debug",
        _ => "trace",
    };
    format!("langchat={}", level.to_lowercase())
}

/// Run the CLI with the given arguments.
pub async fn run(cli: Cli, config: LangChatConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Counters => commands::ids::counters(&config).await,
        Commands::NextId(args) => commands::ids::next_id(args, &config).await,
        Commands::Insert(args) => commands::ids::insert(args, &config).await,
        Commands::Seed => commands::ids::seed(&config).await,
        Commands::History(args) => commands::history::run(args, &config).await,
        Commands::Config(args) => commands::config::run(args, cli.config.as_deref(), &config),
        Commands::Version => {
            println!("langchat {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
