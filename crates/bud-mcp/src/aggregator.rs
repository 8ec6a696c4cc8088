//! Starts proxy sessions for every declared child server and registers their
//! tools.
//!
//! A child that fails to start is logged and skipped; startup as a whole
//! never fails because of one child.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::child::{ChildLauncher, ProcessLauncher};
use crate::config::{McpConfigFile, load_mcp_config};
use crate::error::{McpError, Result};
use crate::forward::ProxyTool;
use crate::proxy::ProxySession;
use crate::registry::ToolRegistry;

/// Owner of all running proxy sessions.
pub struct ProxyAggregator {
    launcher: Arc<dyn ChildLauncher>,
    request_timeout: Option<Duration>,
    sessions: Vec<Arc<ProxySession>>,
}

impl Default for ProxyAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyAggregator {
    /// Create an aggregator that spawns real processes.
    pub fn new() -> Self {
        Self::with_launcher(Arc::new(ProcessLauncher))
    }

    /// Create an aggregator with a custom launcher.
    pub fn with_launcher(launcher: Arc<dyn ChildLauncher>) -> Self {
        Self {
            launcher,
            request_timeout: None,
            sessions: Vec::new(),
        }
    }

    /// Apply a per-request deadline to every session started afterwards.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Running sessions, in start order.
    pub fn sessions(&self) -> &[Arc<ProxySession>] {
        &self.sessions
    }

    /// Start every stdio entry of `config` and register its tools.
    ///
    /// Entries are visited in name order. A tool whose name is already taken
    /// is skipped with a warning; the existing tool wins. Returns the
    /// sessions started by this call.
    pub async fn start_all(
        &mut self,
        config: &McpConfigFile,
        registry: &mut ToolRegistry,
    ) -> Vec<Arc<ProxySession>> {
        let mut started = Vec::new();

        for (name, entry) in &config.mcp_servers {
            if !entry.is_stdio() {
                tracing::debug!(
                    server = %name,
                    transport = %entry.transport,
                    "skipping non-stdio MCP server"
                );
                continue;
            }

            tracing::info!(
                server = %name,
                command = %entry.command,
                args = ?entry.args,
                "starting MCP server"
            );

            let child_config = entry.to_child_config(name.clone(), self.request_timeout);
            let session = match ProxySession::start_with(&child_config, self.launcher.as_ref()).await {
                Ok(session) => Arc::new(session),
                Err(e) => {
                    tracing::error!(server = %name, error = %e, "failed to start MCP server");
                    continue;
                }
            };

            let mut registered = 0;
            for tool in ProxyTool::from_session(&session) {
                match registry.register(tool) {
                    Ok(()) => registered += 1,
                    Err(McpError::DuplicateTool(tool)) => {
                        tracing::warn!(
                            server = %name,
                            tool = %tool,
                            "tool name already registered, skipping"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(server = %name, error = %e, "failed to register tool");
                    }
                }
            }

            tracing::info!(
                server = %name,
                discovered = session.tools().len(),
                registered,
                "MCP server tools registered"
            );

            self.sessions.push(Arc::clone(&session));
            started.push(session);
        }

        tracing::info!(
            started = started.len(),
            configured = config.mcp_servers.len(),
            "MCP proxy startup complete"
        );
        started
    }

    /// Load `.mcp.json` from `path` and [`start_all`](Self::start_all).
    pub async fn start_from_path(
        &mut self,
        path: &Path,
        registry: &mut ToolRegistry,
    ) -> Result<Vec<Arc<ProxySession>>> {
        let config = load_mcp_config(path)?;
        Ok(self.start_all(&config, registry).await)
    }

    /// Close every session exactly once.
    pub async fn shutdown_all(&mut self) {
        let sessions = std::mem::take(&mut self.sessions);
        if sessions.is_empty() {
            return;
        }
        tracing::info!(count = sessions.len(), "shutting down MCP servers");
        for session in sessions {
            session.close().await;
        }
    }
}

impl std::fmt::Debug for ProxyAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sessions.iter().map(|s| s.name()).collect();
        f.debug_struct("ProxyAggregator")
            .field("sessions", &names)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::McpServerEntry;
    use crate::fake_child::FakeLauncher;
    use crate::registry::MockTool;

    fn entry(command: &str) -> McpServerEntry {
        McpServerEntry {
            command: command.to_string(),
            ..Default::default()
        }
    }

    fn config(entries: &[(&str, McpServerEntry)]) -> McpConfigFile {
        McpConfigFile {
            mcp_servers: entries
                .iter()
                .map(|(name, entry)| (name.to_string(), entry.clone()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_middle_child_fails_to_spawn() {
        let launcher = Arc::new(
            FakeLauncher::default()
                .with_command("one-mcp", &["one_a", "one_b"])
                .with_command("three-mcp", &["three_a"]),
        );
        let mut aggregator = ProxyAggregator::with_launcher(launcher);
        let mut registry = ToolRegistry::new();

        let started = aggregator
            .start_all(
                &config(&[
                    ("a-one", entry("one-mcp")),
                    ("b-two", entry("missing-mcp")),
                    ("c-three", entry("three-mcp")),
                ]),
                &mut registry,
            )
            .await;

        let names: Vec<_> = started.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["a-one", "c-three"]);
        assert_eq!(registry.names(), vec!["one_a", "one_b", "three_a"]);
        assert_eq!(aggregator.sessions().len(), 2);
    }

    #[tokio::test]
    async fn test_skips_non_stdio_entries() {
        let launcher = Arc::new(FakeLauncher::default().with_command("one-mcp", &["one"]));
        let mut aggregator = ProxyAggregator::with_launcher(launcher.clone());
        let mut registry = ToolRegistry::new();

        let http = McpServerEntry {
            transport: "http".to_string(),
            url: "http://localhost:9000".to_string(),
            command: "one-mcp".to_string(),
            ..Default::default()
        };
        let started = aggregator
            .start_all(
                &config(&[("remote", http), ("empty", entry("")), ("local", entry("one-mcp"))]),
                &mut registry,
            )
            .await;

        assert_eq!(started.len(), 1);
        assert_eq!(launcher.states.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_local_tool_wins_collision() {
        let launcher = Arc::new(FakeLauncher::default().with_command("one-mcp", &["echo", "extra"]));
        let mut aggregator = ProxyAggregator::with_launcher(launcher);
        let mut registry = ToolRegistry::new();
        registry
            .register(MockTool::new("echo").with_description("local echo"))
            .unwrap();

        aggregator
            .start_all(&config(&[("one", entry("one-mcp"))]), &mut registry)
            .await;

        assert_eq!(registry.names(), vec!["echo", "extra"]);
        assert_eq!(
            registry.get("echo").unwrap().definition().description,
            "local echo"
        );
    }

    #[tokio::test]
    async fn test_all_children_fail() {
        let mut aggregator = ProxyAggregator::with_launcher(Arc::new(FakeLauncher::default()));
        let mut registry = ToolRegistry::new();
        let started = aggregator
            .start_all(
                &config(&[("x", entry("nope")), ("y", entry("nada"))]),
                &mut registry,
            )
            .await;
        assert!(started.is_empty());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_all_closes_each_once() {
        let launcher = Arc::new(
            FakeLauncher::default()
                .with_command("one-mcp", &["one"])
                .with_command("two-mcp", &["two"]),
        );
        let mut aggregator = ProxyAggregator::with_launcher(launcher.clone());
        let mut registry = ToolRegistry::new();
        aggregator
            .start_all(
                &config(&[("one", entry("one-mcp")), ("two", entry("two-mcp"))]),
                &mut registry,
            )
            .await;

        aggregator.shutdown_all().await;
        aggregator.shutdown_all().await;
        assert!(aggregator.sessions().is_empty());

        for (_, state) in launcher.states.lock().iter() {
            let state = state.lock();
            assert_eq!(state.killed, 1);
            assert_eq!(state.waited, 1);
        }

        let err = registry.call("one", Default::default()).await.unwrap_err();
        assert!(err.to_string().contains("session closed"));
    }
}
