//! CLI command handlers.

pub mod serve;
pub mod tools;

use std::path::PathBuf;

use bud_config::{GatewayConfig, ProxyConfig};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// The merged gateway configuration.
    pub config: GatewayConfig,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// The `[proxy]` section with a CLI override for the `.mcp.json` path.
    pub fn proxy_config(&self, mcp_config: Option<PathBuf>) -> ProxyConfig {
        let mut proxy = self.config.proxy();
        if let Some(path) = mcp_config {
            proxy.mcp_config = path;
        }
        proxy
    }
}
