//! Tools served by the gateway itself.

use std::sync::Arc;

use bud_mcp::{
    ArgsExt, ProxySession, ServerInfo, ToolDefinition, ToolRegistry, tool_fn,
};
use parking_lot::RwLock;

/// What `gateway_status` reports.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    /// Identity reported to clients.
    pub server: ServerInfo,
    /// Registered tools, local and proxied.
    pub tool_count: usize,
    /// Connected child servers with the number of tools each advertised.
    pub children: Vec<(String, usize)>,
}

/// Shared, updatable status for the `gateway_status` tool.
///
/// The tool is registered before the proxies start, so the numbers are
/// filled in once startup finishes.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    inner: Arc<RwLock<StatusSnapshot>>,
}

impl StatusBoard {
    pub fn new(server: ServerInfo) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StatusSnapshot {
                server,
                tool_count: 0,
                children: Vec::new(),
            })),
        }
    }

    /// Record the finished registry size and the running child servers.
    pub fn update(&self, tool_count: usize, sessions: &[Arc<ProxySession>]) {
        let mut snapshot = self.inner.write();
        snapshot.tool_count = tool_count;
        snapshot.children = sessions
            .iter()
            .map(|s| (s.name().to_string(), s.tools().len()))
            .collect();
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.read().clone()
    }

    /// Human-readable summary.
    pub fn render(&self) -> String {
        let snapshot = self.snapshot();
        let mut out = format!(
            "{} {}\ntools: {}\n",
            snapshot.server.name, snapshot.server.version, snapshot.tool_count
        );
        if snapshot.children.is_empty() {
            out.push_str("child servers: none\n");
        } else {
            out.push_str(&format!("child servers: {}\n", snapshot.children.len()));
            for (name, tools) in &snapshot.children {
                out.push_str(&format!("  {name}: {tools} tools\n"));
            }
        }
        out
    }
}

/// Register the built-in tools. They go in first so they win name collisions.
pub fn register_all(registry: &mut ToolRegistry, board: &StatusBoard) -> bud_mcp::Result<()> {
    registry.register(tool_fn(
        ToolDefinition::new("echo", "Return the given message unchanged").required_property(
            "message",
            "string",
            "Text to return",
        ),
        |args| async move { args.required_str("message").map(str::to_string) },
    ))?;

    let board = board.clone();
    registry.register(tool_fn(
        ToolDefinition::new(
            "gateway_status",
            "Report the gateway version, tool count and connected MCP servers",
        ),
        move |_args| {
            let board = board.clone();
            async move { Ok(board.render()) }
        },
    ))?;

    Ok(())
}
