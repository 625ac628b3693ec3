//! CLI command handlers.

pub mod call;
pub mod chat;
pub mod config;
pub mod history;
pub mod output;
pub mod repl;
pub mod run;
pub mod tools;

use anyhow::{Context as _, Result};
use ferry_client::ChatClient;
use ferry_config::FerryConfig;
use ferry_mcp::{McpClient, McpServerConfig};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Resolved configuration with CLI overrides applied.
    pub config: FerryConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Tool host settings.
    pub fn server_config(&self) -> McpServerConfig {
        let mcp = self.config.mcp();
        let mut config =
            McpServerConfig::new(mcp.endpoint()).with_connect_timeout(mcp.connect_timeout());
        if let Some(timeout) = mcp.request_timeout() {
            config = config.with_request_timeout(timeout);
        }
        config
    }

    /// Connect to the tool host.
    pub async fn connect(&self) -> Result<McpClient> {
        let config = self.server_config();
        let endpoint = config.endpoint.clone();
        McpClient::connect_to(config)
            .await
            .with_context(|| format!("could not reach tool host at {}", endpoint))
    }

    /// Chat service client.
    pub fn chat_client(&self) -> Result<ChatClient> {
        let chat = self.config.chat();
        Ok(ChatClient::builder()
            .base_url(chat.base_url())
            .timeout(chat.timeout())
            .build()?)
    }
}
