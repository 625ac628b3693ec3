//! Client for remote tool hosts.
//!
//! Talks JSON-RPC-styled envelopes over one persistent WebSocket, lets many
//! requests share that socket, caches the host's tool list per connection and
//! runs tool calls.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  McpClient                                                  │
//! │  - list_tools (cached per connection), execute_tool         │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  RpcClient                                                  │
//! │  - id allocation, pending table, response routing           │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Session                                                    │
//! │  - one WebSocket, connect timeout, event subscribers        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use ferry_mcp::{McpClient, McpServerConfig};
//!
//! let client = McpClient::connect_to(McpServerConfig::new("ws://localhost:8765")).await?;
//!
//! for tool in client.list_tools().await?.iter() {
//!     println!("{} - {}", tool.name, tool.description);
//! }
//!
//! let result = client.execute_tool("search", json!({"query": "reset"})).await?;
//! println!("{}", result.text());
//! ```
//!
//! # Wire format
//!
//! ```text
//! → {"jsonrpc": "2.0", "method": "call_tool", "params": {"name": ..., "arguments": {...}}, "id": "3"}
//! ← {"id": "3", "result": {"content": [{"type": "text", "text": ...}], "sources": [...]}}
//! ← {"id": "3", "error": {"message": ...}}
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod rpc;
pub mod transport;

pub use client::{McpClient, McpServerConfig};
pub use error::{McpError, Result};
pub use protocol::{
    CallToolParams, ContentItem, ExecutionResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, ParamKind, Source, ToolDescriptor,
};
pub use registry::{ToolRegistry, default_tool};
pub use rpc::RpcClient;
pub use transport::{
    ConnectionState, DEFAULT_CONNECT_TIMEOUT, DisconnectReason, Session, SessionConfig,
    SessionEvent,
};
