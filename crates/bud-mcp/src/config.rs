//! Child server declarations (`.mcp.json`).
//!
//! ```json
//! { "mcpServers": {
//!     "things": { "command": "things-mcp", "args": [], "env": {"K": "V"} },
//!     "remote": { "type": "http", "url": "http://localhost:9000/mcp" } } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{McpError, Result};
use crate::proxy::ChildServerConfig;

/// Contents of a `.mcp.json` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpConfigFile {
    /// Server name to entry. Sorted, so startup order is deterministic.
    #[serde(rename = "mcpServers", default)]
    pub mcp_servers: BTreeMap<String, McpServerEntry>,
}

impl McpConfigFile {
    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| McpError::config(format!("parse .mcp.json: {e}")))
    }
}

/// One server entry in `.mcp.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerEntry {
    /// Transport type; empty or "stdio" for a local process.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub transport: String,
    /// URL for network transports.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Command to spawn.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command: String,
    /// Arguments to pass to the command.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Environment overrides.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl McpServerEntry {
    /// Whether this entry describes a child process the gateway can spawn.
    pub fn is_stdio(&self) -> bool {
        (self.transport.is_empty() || self.transport == "stdio") && !self.command.is_empty()
    }

    /// Convert to a session config.
    pub fn to_child_config(
        &self,
        name: impl Into<String>,
        request_timeout: Option<Duration>,
    ) -> ChildServerConfig {
        ChildServerConfig::new(name, self.command.clone())
            .with_args(self.args.clone())
            .with_env(self.env.clone())
            .with_request_timeout(request_timeout)
    }
}

/// Read and parse a `.mcp.json` file.
pub fn load_mcp_config(path: &Path) -> Result<McpConfigFile> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        McpError::config(format!("failed to read {}: {}", path.display(), e))
    })?;
    McpConfigFile::from_json(&content)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    const SAMPLE: &str = r#"{
        "mcpServers": {
            "things": {"command": "things-mcp", "args": ["--db", "x"], "env": {"TOKEN": "t"}},
            "calendar": {"type": "stdio", "command": "cal-mcp"},
            "notion": {"type": "http", "url": "http://localhost:9000/mcp"},
            "broken": {"args": ["x"]}
        }
    }"#;

    #[test]
    fn test_parse_sorted() {
        let config = McpConfigFile::from_json(SAMPLE).unwrap();
        let names: Vec<_> = config.mcp_servers.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["broken", "calendar", "notion", "things"]);
    }

    #[test]
    fn test_is_stdio() {
        let config = McpConfigFile::from_json(SAMPLE).unwrap();
        assert!(config.mcp_servers["things"].is_stdio());
        assert!(config.mcp_servers["calendar"].is_stdio());
        assert!(!config.mcp_servers["notion"].is_stdio());
        assert!(!config.mcp_servers["broken"].is_stdio());
    }

    #[test]
    fn test_to_child_config() {
        let config = McpConfigFile::from_json(SAMPLE).unwrap();
        let child = config.mcp_servers["things"].to_child_config("things", None);
        assert_eq!(child.name, "things");
        assert_eq!(child.command, "things-mcp");
        assert_eq!(child.args, vec!["--db", "x"]);
        assert_eq!(child.env["TOKEN"], "t");
        assert_eq!(child.request_timeout, None);
    }

    #[test]
    fn test_empty_and_invalid() {
        assert!(McpConfigFile::from_json("{}").unwrap().mcp_servers.is_empty());
        assert!(matches!(
            McpConfigFile::from_json("{not json"),
            Err(McpError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = load_mcp_config(file.path()).unwrap();
        assert_eq!(config.mcp_servers.len(), 4);

        let missing = load_mcp_config(Path::new("/nonexistent/.mcp.json"));
        assert!(matches!(missing, Err(McpError::Config(_))));
    }
}
