//! Configuration types mapping to the TOML schema.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Tool host endpoint used when none is configured.
pub const DEFAULT_MCP_ENDPOINT: &str = "ws://localhost:8080/mcp";

/// Chat service base URL used when none is configured.
pub const DEFAULT_CHAT_URL: &str = "http://localhost:8000/api";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FerryConfig {
    /// Tool host connection.
    pub mcp: Option<McpConfig>,
    /// Chat history service.
    pub chat: Option<ChatConfig>,
    /// Log output.
    pub logging: Option<LoggingConfig>,
}

impl FerryConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not merged field by field.
    pub fn merge(&mut self, other: FerryConfig) {
        if other.mcp.is_some() {
            self.mcp = other.mcp;
        }
        if other.chat.is_some() {
            self.chat = other.chat;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// The `[mcp]` section, or its defaults.
    pub fn mcp(&self) -> McpConfig {
        self.mcp.clone().unwrap_or_default()
    }

    /// The `[chat]` section, or its defaults.
    pub fn chat(&self) -> ChatConfig {
        self.chat.clone().unwrap_or_default()
    }

    /// The `[logging]` section, or its defaults.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Reject values that cannot be used.
    pub fn validate(&self) -> Result<()> {
        let mcp = self.mcp();
        if mcp.endpoint().trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "mcp.endpoint".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if mcp.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "mcp.connect_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if mcp.request_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "mcp.request_timeout_secs".to_string(),
                reason: "must be greater than zero; omit it to disable".to_string(),
            });
        }
        if self.chat().timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "chat.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Host
// ─────────────────────────────────────────────────────────────────────────────

/// Tool host connection settings.
///
/// ```toml
/// [mcp]
/// endpoint = "ws://localhost:8080/mcp"
/// connect_timeout_secs = 5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    /// WebSocket endpoint of the tool host.
    pub endpoint: Option<String>,
    /// Bound on the connection handshake.
    pub connect_timeout_secs: u64,
    /// Bound on each request. Unset waits until the connection drops.
    pub request_timeout_secs: Option<u64>,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            connect_timeout_secs: 5,
            request_timeout_secs: None,
        }
    }
}

impl McpConfig {
    /// Configured endpoint, or the default.
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_MCP_ENDPOINT)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat Service
// ─────────────────────────────────────────────────────────────────────────────

/// Chat history service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Base URL of the chat API.
    pub base_url: Option<String>,
    /// HTTP request timeout.
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
        }
    }
}

impl ChatConfig {
    /// Configured base URL, or the default.
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_CHAT_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g. `"info"`).
    pub level: Option<String>,
    /// Whether to write JSON logs to daily files.
    pub file: bool,
    /// Directory for log files. Defaults to `logs/` in the config directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            file: true,
            directory: None,
        }
    }
}
