//! Configuration types.
//!
//! ```toml
//! [server]
//! name = "bud2"
//! http_addr = "127.0.0.1:8066"
//!
//! [proxy]
//! mcp_config = "state/.mcp.json"
//! request_timeout_secs = 0    # 0 waits forever
//!
//! [logging]
//! dir = "logs"
//! file = true
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default `serverInfo.name`.
pub const DEFAULT_SERVER_NAME: &str = "bud2";

/// Default HTTP listen address.
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8066";

/// Default location of the child server declarations.
pub const DEFAULT_MCP_CONFIG: &str = "state/.mcp.json";

/// Default log directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Root configuration structure.
///
/// Every section is optional; a missing section means defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Identity and HTTP binding.
    pub server: Option<ServerConfig>,

    /// Child server proxying.
    pub proxy: Option<ProxyConfig>,

    /// Log output.
    pub logging: Option<LoggingConfig>,
}

impl GatewayConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one.
    ///
    /// Sections present in `other` replace the whole section here.
    pub fn merge(&mut self, other: GatewayConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }

        if other.proxy.is_some() {
            self.proxy = other.proxy;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// The `[server]` section, or defaults.
    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    /// The `[proxy]` section, or defaults.
    pub fn proxy(&self) -> ProxyConfig {
        self.proxy.clone().unwrap_or_default()
    }

    /// The `[logging]` section, or defaults.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name reported to clients in `initialize`.
    pub name: String,
    /// Address the HTTP transport binds to.
    pub http_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SERVER_NAME.to_string(),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Proxy Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Child server proxying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Path of the `.mcp.json` file declaring child servers.
    pub mcp_config: PathBuf,
    /// Per-request deadline for child servers, in seconds. 0 disables it.
    pub request_timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            mcp_config: PathBuf::from(DEFAULT_MCP_CONFIG),
            request_timeout_secs: 0,
        }
    }
}

impl ProxyConfig {
    /// The request deadline, if one is configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for the daily rolling JSON log file.
    pub dir: PathBuf,
    /// Whether to write the JSON log file at all.
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_LOG_DIR),
            file: true,
        }
    }
}
