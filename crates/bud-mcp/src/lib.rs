//! MCP tool gateway core for Bud.
//!
//! This crate serves a set of tools to one upstream client over JSON-RPC,
//! and can merge in the tools of other MCP servers by running them as child
//! processes and forwarding calls to them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  transport (stdio, newline-delimited JSON)                  │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Dispatcher                                                 │
//! │  - initialize, tools/list, tools/call                       │
//! └─────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ToolRegistry                                               │
//! │  - local tools                                              │
//! │  - ProxyTool ──▶ ProxySession ──▶ child MCP server          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bud_mcp::{Dispatcher, ProxyAggregator, ServerInfo, ToolRegistry, serve_stdio};
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(my_local_tool)?;
//!
//! let mut proxies = ProxyAggregator::new();
//! proxies.start_from_path(".mcp.json".as_ref(), &mut registry).await?;
//!
//! let dispatcher = Dispatcher::new(Arc::new(registry), ServerInfo {
//!     name: "bud2".into(),
//!     version: "0.1.0".into(),
//! });
//! serve_stdio(&dispatcher).await?;
//! proxies.shutdown_all().await;
//! ```
//!
//! # Protocol flow
//!
//! 1. Client sends `initialize`; the server answers with its capabilities
//! 2. Client sends `notifications/initialized` (no response)
//! 3. Client calls `tools/list` and `tools/call`
//!
//! Proxy sessions run the same flow in the client role against each child.

pub mod aggregator;
pub mod child;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod forward;
pub mod protocol;
pub mod proxy;
pub mod registry;
pub mod tool;
pub mod transport;

#[cfg(test)]
mod fake_child;

// Re-export main types
pub use aggregator::ProxyAggregator;
pub use child::{ChildLauncher, ChildProcess, ProcessLauncher, StdioChild};
pub use config::{McpConfigFile, McpServerEntry, load_mcp_config};
pub use dispatcher::{Dispatcher, SessionState};
pub use error::{McpError, Result};
pub use forward::ProxyTool;
pub use protocol::{
    CallToolParams, CallToolResult, ClientInfo, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    MCP_PROTOCOL_VERSION, RpcMessage, ServerCapabilities, ServerInfo, ToolContent, ToolInfo,
    ToolsCapability,
};
pub use proxy::{ChildServerConfig, ProxySession};
pub use registry::ToolRegistry;
pub use tool::{
    ArgsExt, Arguments, FnTool, PropertyDef, Tool, ToolDefinition, ToolError, ToolResult,
    tool_fn,
};
pub use transport::{encode_line, serve, serve_stdio, write_message};
