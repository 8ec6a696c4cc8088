//! Startup wiring: local tools first, then proxied tools, then the dispatcher.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use bud_config::{ProxyConfig, ServerConfig};
use bud_mcp::{Dispatcher, ProxyAggregator, ServerInfo, ToolRegistry};
use tracing::{info, warn};

use crate::builtin::{self, StatusBoard};

/// A running gateway: the dispatcher plus the child servers behind it.
pub struct Gateway {
    dispatcher: Arc<Dispatcher>,
    proxies: ProxyAggregator,
}

impl Gateway {
    /// Build the registry and start every configured child server.
    ///
    /// Child servers that fail to start, or a malformed `.mcp.json`, are
    /// logged and skipped; the gateway still starts.
    pub async fn start(server: &ServerConfig, proxy: &ProxyConfig) -> Result<Self> {
        let info = ServerInfo {
            name: server.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        let board = StatusBoard::new(info.clone());

        let mut registry = ToolRegistry::new();
        builtin::register_all(&mut registry, &board).context("registering built-in tools")?;

        let mut proxies = ProxyAggregator::new().with_request_timeout(proxy.request_timeout());
        let path = &proxy.mcp_config;
        if path.is_file() {
            match proxies.start_from_path(path, &mut registry).await {
                Ok(started) => info!(
                    path = %path.display(),
                    servers = started.len(),
                    "child MCP servers started"
                ),
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring MCP server config"),
            }
        } else {
            info!(path = %path.display(), "no MCP server config, serving local tools only");
        }

        board.update(registry.len(), proxies.sessions());
        info!(tools = registry.len(), "tool registry ready");

        Ok(Self {
            dispatcher: Arc::new(Dispatcher::new(Arc::new(registry), info)),
            proxies,
        })
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.dispatcher.registry()
    }

    /// Names of the child servers that started.
    pub fn child_names(&self) -> Vec<&str> {
        self.proxies.sessions().iter().map(|s| s.name()).collect()
    }

    /// Close every child server.
    pub async fn shutdown(mut self) {
        self.proxies.shutdown_all().await;
    }
}
