//! Configuration management commands.

use clap::Args;
use langchat_core::paths;
use langchat_core::LangChatConfig;
use std::path::Path;

/// Config command arguments.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(clap::Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (secrets redacted)
    Show,

    /// Show configuration file path
    Path,

    /// Validate configuration
    Validate,
}

/// Run the config command.
pub fn run(
    args: ConfigArgs,
    explicit_path: Option<&Path>,
    config: &LangChatConfig,
) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let mut json = serde_json::to_value(config)?;
            if let Some(key) = json.pointer_mut("/store/api_key") {
                *key = serde_json::Value::String("[REDACTED]".to_string());
            }
            println!("{}", serde_json::to_string_pretty(&json)?);
        }

        ConfigCommand::Path => {
            let path = match explicit_path {
                Some(path) => path.to_path_buf(),
                None => paths::config_file()?,
            };
            let note = if path.exists() { "" } else { " (not found, using defaults)" };
            println!("{}{}", path.display(), note);
        }

        ConfigCommand::Validate => match config.validate() {
            Ok(()) => println!("Configuration is valid."),
            Err(e) => anyhow::bail!("Configuration is invalid: {}", e),
        },
    }
    Ok(())
}
