//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};

use ferry_config::{
    ChatConfig, DEFAULT_CHAT_URL, DEFAULT_MCP_ENDPOINT, FerryConfig, LoggingConfig, McpConfig,
};

use super::Context;
use super::output::print_success;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./ferry.toml) instead of user config
        #[arg(long)]
        local: bool,
    },

    /// Show configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(),
        ConfigCommand::Init { local } => cmd_init(local),
        ConfigCommand::Path => cmd_path(),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    println!("# Ferry Configuration\n");

    let loaded = ferry_config::load_config(None)?;
    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Loaded from:");
        for path in &sources {
            println!("  {}", path.display());
        }
        println!();
    }

    let mcp = config.mcp();
    println!("[mcp]");
    println!("  endpoint = {}", mcp.endpoint());
    println!("  connect_timeout_secs = {}", mcp.connect_timeout_secs);
    match mcp.request_timeout_secs {
        Some(secs) => println!("  request_timeout_secs = {}", secs),
        None => println!("  request_timeout_secs = (none, waits until disconnect)"),
    }

    let chat = config.chat();
    println!("\n[chat]");
    println!("  base_url = {}", chat.base_url());
    println!("  timeout_secs = {}", chat.timeout_secs);

    let logging = config.logging();
    println!("\n[logging]");
    println!(
        "  level = {}",
        logging.level.as_deref().unwrap_or("(default)")
    );
    println!("  file = {}", logging.file);
    match ferry_config::log_dir(config) {
        Some(dir) => println!("  directory = {}", dir.display()),
        None => println!("  directory = (unavailable)"),
    }

    Ok(())
}

fn cmd_which() -> Result<()> {
    let loaded = ferry_config::load_config(None)?;

    println!("Config file search order (later overrides earlier):\n");

    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!("  {} {}", status, source.path.display());
    }

    for warning in &loaded.warnings {
        println!("  ! {}", warning);
    }

    println!();
    let loaded_count = loaded.loaded_from().len();
    if loaded_count == 0 {
        println!("No config files found. Run 'ferry config init' to create one.");
    } else {
        println!("{} config file(s) loaded.", loaded_count);
    }

    Ok(())
}

fn cmd_init(local: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("ferry.toml")
    } else {
        ferry_config::xdg_config_path()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    ferry_config::save_config(&starter_config(), &path)?;
    print_success(&format!("Created {}", path.display()));
    Ok(())
}

fn cmd_path() -> Result<()> {
    if let Some(path) = ferry_config::xdg_config_path() {
        println!("{}", path.display());
    } else {
        eprintln!("Could not determine config directory");
    }
    Ok(())
}

/// Defaults written out explicitly so the file documents every field.
fn starter_config() -> FerryConfig {
    FerryConfig {
        mcp: Some(McpConfig {
            endpoint: Some(DEFAULT_MCP_ENDPOINT.to_string()),
            ..McpConfig::default()
        }),
        chat: Some(ChatConfig {
            base_url: Some(DEFAULT_CHAT_URL.to_string()),
            ..ChatConfig::default()
        }),
        logging: Some(LoggingConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starter_config_round_trips_and_validates() {
        let config = starter_config();
        config.validate().unwrap();

        let parsed = FerryConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.mcp().endpoint(), DEFAULT_MCP_ENDPOINT);
        assert_eq!(parsed.chat().base_url(), DEFAULT_CHAT_URL);
    }
}
