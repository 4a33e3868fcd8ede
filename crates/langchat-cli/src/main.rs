//! LangChat CLI entry point.

use clap::Parser;
use langchat_cli::{init_tracing, run, Cli};
use langchat_core::config::ConfigSource;
use langchat_core::LangChatConfig;
use tracing::debug;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Resolve configuration before logging so the log format can come from it
    let (config, source) = LangChatConfig::resolve(cli.config.as_deref())?;

    // Initialize logging
    init_tracing(cli.verbose, &config.logging);
    match source {
        ConfigSource::File(path) => debug!(path = %path.display(), "loaded config file"),
        ConfigSource::Defaults { missing } => {
            debug!(path = %missing.display(), "no config file, using defaults")
        }
    }

    // Run the command
    run(cli, config).await
}
