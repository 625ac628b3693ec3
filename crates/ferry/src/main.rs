//! Ferry - command line client for remote tool hosts.
//!
//! Main entry point for the Ferry CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod commands;

use commands::{call, chat, config, history, run, tools};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Ferry - command line client for remote tool hosts
#[derive(Parser)]
#[command(name = "ferry")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Tool host WebSocket endpoint (overrides [mcp] endpoint)
    #[arg(long, global = true, env = "FERRY_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Chat service base URL (overrides [chat] base_url)
    #[arg(long, global = true, env = "FERRY_CHAT_URL")]
    pub chat_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the tools the host exposes
    Tools(tools::ToolsArgs),

    /// Call one tool
    Call(call::CallArgs),

    /// Plan a goal and run it step by step
    Run(run::RunArgs),

    /// Interactive chat, routed through a tool or the chat service
    Chat(chat::ChatArgs),

    /// Show or delete a stored chat
    History(history::HistoryArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = ferry_config::load_config(None)?;
    let logging = loaded.config.logging();

    // Console (human-readable) + optional daily JSON file
    let console_filter = if cli.verbose {
        "ferry=debug,ferry_mcp=debug,ferry_agent=debug,ferry_client=debug,ferry_config=debug,warn"
            .to_string()
    } else {
        logging.level.clone().unwrap_or_else(|| {
            "ferry=warn,ferry_mcp=warn,ferry_agent=warn,ferry_client=warn,error".to_string()
        })
    };

    let log_dir: Option<PathBuf> = logging
        .file
        .then(|| ferry_config::log_dir(&loaded.config))
        .flatten();
    let file_appender = log_dir.and_then(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("ferry")
            .filename_suffix("log")
            .build(&dir)
            .map_err(|e| eprintln!("warning: file logging disabled ({}): {}", dir.display(), e))
            .ok()
    });
    let (file_layer, _guard) = match file_appender {
        Some(file_appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(
                    "ferry=trace,ferry_mcp=trace,ferry_agent=trace,ferry_client=trace,ferry_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new(&console_filter)),
                ),
        )
        .with(file_layer)
        .init();

    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }

    let mut config = loaded.config;
    if let Some(endpoint) = cli.endpoint {
        config.mcp.get_or_insert_with(Default::default).endpoint = Some(endpoint);
    }
    if let Some(chat_url) = cli.chat_url {
        config.chat.get_or_insert_with(Default::default).base_url = Some(chat_url);
    }
    config.validate()?;

    let ctx = commands::Context {
        config,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Tools(args) => tools::run(args, &ctx).await,
        Commands::Call(args) => call::run(args, &ctx).await,
        Commands::Run(args) => run::run(args, &ctx).await,
        Commands::Chat(args) => chat::run(args, &ctx).await,
        Commands::History(args) => history::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
