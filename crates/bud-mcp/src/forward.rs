//! Forwarding tools: a child server's tool registered as a local [`Tool`].
//!
//! Tools are registered under the child's own names, without a namespace
//! prefix, so the upstream client sees one flat tool list.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::McpError;
use crate::protocol::ToolInfo;
use crate::proxy::ProxySession;
use crate::tool::{Arguments, Tool, ToolDefinition, ToolError, ToolResult};

/// Adapter that forwards calls to a tool on a child server.
pub struct ProxyTool {
    session: Arc<ProxySession>,
    /// Name of the tool on the child.
    remote_name: String,
    definition: ToolDefinition,
}

impl ProxyTool {
    /// Wrap one tool discovered on `session`.
    pub fn new(session: Arc<ProxySession>, info: &ToolInfo) -> Self {
        Self {
            session,
            remote_name: info.name.clone(),
            definition: ToolDefinition::from_wire(info),
        }
    }

    /// Adapters for every tool the session discovered.
    pub fn from_session(session: &Arc<ProxySession>) -> Vec<Self> {
        session
            .tools()
            .iter()
            .map(|info| Self::new(Arc::clone(session), info))
            .collect()
    }

    /// The child server this tool belongs to.
    pub fn server_name(&self) -> &str {
        self.session.name()
    }

    /// The tool's name on the child.
    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }
}

#[async_trait]
impl Tool for ProxyTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn call(&self, args: Arguments) -> ToolResult {
        tracing::debug!(
            server = %self.session.name(),
            tool = %self.remote_name,
            "forwarding tool call"
        );

        self.session
            .call_tool(&self.remote_name, args)
            .await
            .map_err(|e| match e {
                McpError::ToolError(text) => ToolError::Failed(text),
                other => ToolError::Failed(format!(
                    "MCP server '{}' failed: {}",
                    self.session.name(),
                    other
                )),
            })
    }
}

impl std::fmt::Debug for ProxyTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyTool")
            .field("server", &self.session.name())
            .field("remote_name", &self.remote_name)
            .finish()
    }
}
