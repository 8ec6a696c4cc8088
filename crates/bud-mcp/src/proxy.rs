//! Proxy sessions to child MCP servers.
//!
//! A [`ProxySession`] owns one child process. It performs the MCP handshake,
//! discovers the child's tools, and then forwards calls one at a time: the
//! session lock is held across the whole write-then-read exchange, so a
//! response is always read by the caller that sent the matching request.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::child::{ChildLauncher, ChildProcess, ProcessLauncher};
use crate::error::{McpError, Result};
use crate::protocol::{
    CallToolResult, InitializeParams, InitializeResult, JsonRpcNotification, JsonRpcRequest,
    ListToolsResult, RpcMessage, ServerInfo, ToolInfo,
};
use crate::tool::Arguments;

/// How to start one child server.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildServerConfig {
    /// Unique name for this server, used in logs.
    pub name: String,
    /// Command to spawn.
    pub command: String,
    /// Arguments to pass to the command.
    pub args: Vec<String>,
    /// Environment overrides on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    /// Per-request deadline. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl ChildServerConfig {
    /// Create a new config with no arguments or overrides.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            request_timeout: None,
        }
    }

    /// Set arguments.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Add an argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set environment overrides.
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Add an environment override.
    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the per-request deadline.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// A running child server.
pub struct ProxySession {
    name: String,
    /// `None` once the session has been closed.
    child: Mutex<Option<Box<dyn ChildProcess>>>,
    next_id: AtomicU64,
    request_timeout: Option<Duration>,
    pid: Option<u32>,
    server_info: Option<ServerInfo>,
    tools: Vec<ToolInfo>,
}

impl ProxySession {
    /// Spawn the configured command and complete the handshake.
    pub async fn start(config: &ChildServerConfig) -> Result<Self> {
        Self::start_with(config, &ProcessLauncher).await
    }

    /// Like [`start`](Self::start), with a custom launcher.
    pub async fn start_with(config: &ChildServerConfig, launcher: &dyn ChildLauncher) -> Result<Self> {
        let child = launcher.launch(config).await?;
        Self::from_child(config, child).await
    }

    /// Complete the handshake on an already running child.
    ///
    /// On failure the child is stopped before the error is returned.
    pub async fn from_child(config: &ChildServerConfig, child: Box<dyn ChildProcess>) -> Result<Self> {
        let pid = child.id();
        let mut session = Self {
            name: config.name.clone(),
            child: Mutex::new(Some(child)),
            next_id: AtomicU64::new(1),
            request_timeout: config.request_timeout,
            pid,
            server_info: None,
            tools: Vec::new(),
        };

        tracing::debug!(server = %session.name, pid = ?pid, "starting MCP handshake");

        match session.handshake().await {
            Ok((server_info, tools)) => {
                tracing::info!(
                    server = %session.name,
                    pid = ?pid,
                    tools = tools.len(),
                    "connected to MCP server"
                );
                session.server_info = server_info;
                session.tools = tools;
                Ok(session)
            }
            Err(e) => {
                session.close().await;
                Err(e)
            }
        }
    }

    async fn handshake(&self) -> Result<(Option<ServerInfo>, Vec<ToolInfo>)> {
        let params = serde_json::to_value(InitializeParams::default())?;
        let result = self.request("initialize", Some(params)).await?;
        let server_info = match serde_json::from_value::<InitializeResult>(result) {
            Ok(init) => Some(init.server_info),
            Err(e) => {
                tracing::warn!(server = %self.name, error = %e, "unexpected initialize result");
                None
            }
        };

        self.notify("notifications/initialized", None).await?;
        let tools = self.list_tools().await?;
        Ok((server_info, tools))
    }

    /// Server name from the configuration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What the child reported about itself during the handshake.
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    /// OS process id of the child, if known.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Tools discovered during the handshake.
    pub fn tools(&self) -> &[ToolInfo] {
        &self.tools
    }

    /// Send a request and wait for its response.
    ///
    /// Lines that are blank, not JSON, notifications, requests from the
    /// child, or responses to some other id are skipped.
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let mut guard = self.child.lock().await;
        let child = guard.as_mut().ok_or(McpError::SessionClosed)?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let line = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;

        tracing::trace!(server = %self.name, id, method, "sending request");
        child.write_line(&line).await.map_err(|e| {
            McpError::transport(format!("failed to write to '{}': {}", self.name, e))
        })?;

        let read = read_response(&self.name, child.as_mut(), id);
        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, read).await.map_err(|_| {
                tracing::warn!(server = %self.name, id, method, "request timed out");
                McpError::Timeout
            })?,
            None => read.await,
        }
    }

    /// Send a notification; no response is read.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let mut guard = self.child.lock().await;
        let child = guard.as_mut().ok_or(McpError::SessionClosed)?;
        let line = serde_json::to_string(&JsonRpcNotification::new(method, params))?;
        child.write_line(&line).await.map_err(|e| {
            McpError::transport(format!("failed to write to '{}': {}", self.name, e))
        })
    }

    /// Ask the child for its current tool list.
    pub async fn list_tools(&self) -> Result<Vec<ToolInfo>> {
        let result = self.request("tools/list", None).await?;
        let list: ListToolsResult = serde_json::from_value(result)?;
        Ok(list.tools)
    }

    /// Call a tool on the child.
    ///
    /// Returns the first text block. A result flagged `isError` becomes
    /// [`McpError::ToolError`] carrying the child's text.
    pub async fn call_tool(&self, name: &str, args: Arguments) -> Result<String> {
        let params = json!({"name": name, "arguments": args});
        let result = self.request("tools/call", Some(params)).await?;
        let result: CallToolResult = serde_json::from_value(result)?;

        match (result.is_error(), result.text()) {
            (true, Some(text)) => Err(McpError::tool_error(text)),
            (true, None) => Err(McpError::tool_error("tool returned error")),
            (false, text) => Ok(text.unwrap_or_default().to_string()),
        }
    }

    /// Close stdin, kill and reap the child.
    ///
    /// Safe to call more than once; only the first call does anything.
    pub async fn close(&self) {
        let Some(mut child) = self.child.lock().await.take() else {
            return;
        };

        if let Err(e) = child.close_stdin().await {
            tracing::debug!(server = %self.name, error = %e, "closing stdin failed");
        }
        if let Err(e) = child.kill().await {
            tracing::debug!(server = %self.name, error = %e, "kill failed");
        }
        match child.wait().await {
            Ok(code) => tracing::info!(server = %self.name, exit_code = ?code, "MCP server stopped"),
            Err(e) => tracing::warn!(server = %self.name, error = %e, "failed to reap MCP server"),
        }
    }

    /// Whether [`close`](Self::close) has run.
    pub async fn is_closed(&self) -> bool {
        self.child.lock().await.is_none()
    }
}

async fn read_response(server: &str, child: &mut dyn ChildProcess, id: u64) -> Result<Value> {
    let expected = Value::from(id);
    loop {
        let Some(line) = child.read_line().await? else {
            tracing::warn!(server, id, "MCP server closed its output");
            return Err(McpError::ConnectionClosed);
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match RpcMessage::parse(line) {
            Ok(RpcMessage::Response(response)) if response.id == expected => {
                return response
                    .into_result()
                    .map_err(|e| McpError::server_error(e.code, e.message, e.data));
            }
            Ok(RpcMessage::Response(response)) => {
                tracing::warn!(server, id, stale = %response.id, "skipping response for another request");
            }
            Ok(RpcMessage::Notification(n)) => {
                tracing::debug!(server, method = %n.method, "skipping notification");
            }
            Ok(RpcMessage::Request(r)) => {
                tracing::debug!(server, method = %r.method, "ignoring request from MCP server");
            }
            Ok(RpcMessage::Invalid { .. }) => {
                tracing::warn!(server, json = %line, "skipping malformed message");
            }
            Err(_) => {
                tracing::warn!(server, line, "skipping non-JSON output");
            }
        }
    }
}

impl std::fmt::Debug for ProxySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxySession")
            .field("name", &self.name)
            .field("pid", &self.pid)
            .field("tools", &self.tools.len())
            .finish()
    }
}
