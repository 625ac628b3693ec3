//! Tool host client: registry and executor on top of the multiplexer.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::{McpError, Result};
use crate::protocol::{
    CallToolParams, ExecutionResult, ListToolsResult, METHOD_CALL_TOOL, METHOD_LIST_TOOLS,
    ToolDescriptor,
};
use crate::registry::ToolRegistry;
use crate::rpc::RpcClient;
use crate::transport::{ConnectionState, DEFAULT_CONNECT_TIMEOUT, Session, SessionConfig};

/// Configuration for a tool host connection.
#[derive(Debug, Clone)]
pub struct McpServerConfig {
    /// WebSocket endpoint of the host.
    pub endpoint: String,
    /// Bound on the connection handshake.
    pub connect_timeout: Duration,
    /// Bound on each request. `None` waits until the connection drops.
    pub request_timeout: Option<Duration>,
}

impl McpServerConfig {
    /// Create a config for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: None,
        }
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set a per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

/// Marks a tool call as outstanding for its lifetime.
struct ExecutingGuard<'a>(&'a AtomicUsize);

impl<'a> ExecutingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ExecutingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A client for one tool host.
pub struct McpClient {
    config: McpServerConfig,
    rpc: RpcClient,
    registry: ToolRegistry,
    executing: AtomicUsize,
    last_error: Mutex<Option<String>>,
}

impl McpClient {
    /// Create a disconnected client.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(config: McpServerConfig) -> Result<Self> {
        let session = Session::new(
            SessionConfig::new(config.endpoint.clone()).with_connect_timeout(config.connect_timeout),
        )?;
        let rpc = RpcClient::new(session, config.request_timeout);

        Ok(Self {
            config,
            rpc,
            registry: ToolRegistry::new(),
            executing: AtomicUsize::new(0),
            last_error: Mutex::new(None),
        })
    }

    /// Create a client and connect it.
    pub async fn connect_to(config: McpServerConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.connect().await?;
        Ok(client)
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &McpServerConfig {
        &self.config
    }

    /// The underlying multiplexer.
    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// The underlying session.
    pub fn session(&self) -> &Session {
        self.rpc.session()
    }

    /// Open the connection. No-op when already connected.
    pub async fn connect(&self) -> Result<()> {
        self.session().connect().await
    }

    /// Close the connection, fail outstanding requests and drop cached tools.
    pub fn disconnect(&self) {
        tracing::info!(endpoint = %self.session().endpoint(), "disconnecting from tool host");
        self.rpc.disconnect();
        self.registry.invalidate();
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.session().state()
    }

    /// Whether the session is connected.
    pub fn is_connected(&self) -> bool {
        self.session().is_connected()
    }

    /// Watch connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.session().watch_state()
    }

    /// List the host's tools.
    ///
    /// Connects if needed. The list is fetched once per connection and served
    /// from cache afterwards; a new connection fetches again.
    pub async fn list_tools(&self) -> Result<Arc<[ToolDescriptor]>> {
        self.connect().await?;
        let generation = self
            .session()
            .generation()
            .ok_or(McpError::ConnectionLost)?;

        if let Some(tools) = self.registry.cached(generation) {
            return Ok(tools);
        }

        let result = self
            .rpc
            .send_request(METHOD_LIST_TOOLS, Value::Object(Map::new()))
            .await?;
        let list: ListToolsResult = serde_json::from_value(result)?;
        let tools = self.registry.store(generation, list.tools);

        tracing::debug!(tool_count = tools.len(), generation, "listed tools");
        Ok(tools)
    }

    /// Tools cached for the live connection, without a round trip.
    pub fn cached_tools(&self) -> Option<Arc<[ToolDescriptor]>> {
        self.registry.cached(self.session().generation()?)
    }

    /// Look up a cached tool by name.
    pub fn find_tool(&self, name: &str) -> Option<ToolDescriptor> {
        self.registry.find(self.session().generation()?, name)
    }

    /// Call a tool and wait for its result.
    ///
    /// Never connects on its own: fails with `NotConnected` when the session
    /// is down.
    pub async fn execute_tool(&self, name: &str, arguments: Value) -> Result<ExecutionResult> {
        if !self.is_connected() {
            return Err(McpError::NotConnected);
        }

        let _executing = ExecutingGuard::enter(&self.executing);
        let arguments = if arguments.is_null() {
            Value::Object(Map::new())
        } else {
            arguments
        };
        let params = serde_json::to_value(CallToolParams {
            name: name.to_string(),
            arguments,
        })?;

        let outcome = match self.rpc.send_request(METHOD_CALL_TOOL, params).await {
            Ok(Value::Null) => Ok(ExecutionResult::default()),
            Ok(value) => serde_json::from_value::<ExecutionResult>(value).map_err(McpError::from),
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(result) => {
                tracing::debug!(
                    tool = %name,
                    items = result.content.len(),
                    sources = result.sources.len(),
                    "tool call succeeded"
                );
            }
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "tool call failed");
                *self.last_error.lock() = Some(format!("Failed to execute tool: {}", e));
            }
        }

        outcome
    }

    /// Whether at least one tool call is outstanding.
    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::SeqCst) > 0
    }

    /// Message of the most recent failed tool call.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        self.rpc.disconnect();
    }
}
