//! The seam between the plan engine and whatever runs tools.

use std::sync::Arc;

use async_trait::async_trait;
use ferry_mcp::{ConnectionState, ExecutionResult, McpClient};
use serde_json::Value;
use tokio::sync::watch;

/// Runs one tool call and reports its outcome.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Call `name` with `arguments` and wait for the result.
    async fn execute_tool(&self, name: &str, arguments: Value) -> ferry_mcp::Result<ExecutionResult>;

    /// Connection state of the underlying session, if the executor has one.
    ///
    /// When present, the engine fails an in-flight step as soon as this
    /// reports `Disconnected`.
    fn watch_state(&self) -> Option<watch::Receiver<ConnectionState>> {
        None
    }
}

#[async_trait]
impl ToolExecutor for McpClient {
    async fn execute_tool(&self, name: &str, arguments: Value) -> ferry_mcp::Result<ExecutionResult> {
        McpClient::execute_tool(self, name, arguments).await
    }

    fn watch_state(&self) -> Option<watch::Receiver<ConnectionState>> {
        Some(McpClient::watch_state(self))
    }
}

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    async fn execute_tool(&self, name: &str, arguments: Value) -> ferry_mcp::Result<ExecutionResult> {
        (**self).execute_tool(name, arguments).await
    }

    fn watch_state(&self) -> Option<watch::Receiver<ConnectionState>> {
        (**self).watch_state()
    }
}
