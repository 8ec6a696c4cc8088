//! Tool registry.
//!
//! Tools are listed in the order they were registered. The registry is filled
//! at startup and then shared read-only behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{McpError, Result};
use crate::protocol::ToolInfo;
use crate::tool::{Arguments, Tool, ToolDefinition, ToolError, ToolResult};

/// Registry of callable tools, keyed by name.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// Fails with [`McpError::DuplicateTool`] if the name is taken; the
    /// existing tool is left in place.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a tool from an Arc.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(McpError::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Register a tool, replacing any existing tool with the same name.
    ///
    /// A replaced tool keeps its position in the listing.
    pub fn register_override(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&pos) => {
                tracing::warn!(tool = %name, "replacing already registered tool");
                self.tools[pos] = tool;
            }
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&pos| Arc::clone(&self.tools[pos]))
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// All tool definitions, in registration order.
    pub fn definitions(&self) -> Vec<&ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// All tools rendered for `tools/list`.
    pub fn to_wire(&self) -> Vec<ToolInfo> {
        self.tools.iter().map(|t| t.definition().to_wire()).collect()
    }

    /// Invoke a tool by name.
    ///
    /// This is the in-process entry point; it reaches local and forwarded
    /// tools alike.
    pub async fn call(&self, name: &str, args: Arguments) -> ToolResult {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.call(args).await
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Tool (for testing)
// ─────────────────────────────────────────────────────────────────────────────

/// A mock tool for testing.
///
/// Returns a configurable response and records the arguments of every call.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct MockTool {
    definition: ToolDefinition,
    response: ToolResult,
    calls: parking_lot::Mutex<Vec<Arguments>>,
}

#[cfg(test)]
impl MockTool {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            definition: ToolDefinition::new(name, "A mock tool for testing"),
            response: Ok("mock response".to_string()),
            calls: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_description(mut self, description: impl Into<String>) -> Self {
        self.definition.description = description.into();
        self
    }

    pub(crate) fn with_response(mut self, response: ToolResult) -> Self {
        self.response = response;
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl Tool for MockTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn call(&self, args: Arguments) -> ToolResult {
        self.calls.lock().push(args);
        self.response.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_empty() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.names().is_empty());
    }

    #[test]
    fn test_registry_register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(MockTool::new("test_tool")).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("test_tool"));
        assert!(!registry.contains("other"));
        assert_eq!(registry.get("test_tool").unwrap().name(), "test_tool");
        assert!(registry.get("other").is_none());
    }

    #[test]
    fn test_registry_keeps_insertion_order() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(MockTool::new(name)).unwrap();
        }
        assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);
        let listed: Vec<_> = registry.to_wire().into_iter().map(|t| t.name).collect();
        assert_eq!(listed, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_register_rejects_duplicate() {
        let mut registry = ToolRegistry::new();
        registry
            .register(MockTool::new("status").with_description("local"))
            .unwrap();
        let err = registry
            .register(MockTool::new("status").with_description("remote"))
            .unwrap_err();
        assert!(matches!(err, McpError::DuplicateTool(ref n) if n == "status"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("status").unwrap().definition().description, "local");
    }

    #[test]
    fn test_register_override_keeps_position() {
        let mut registry = ToolRegistry::new();
        registry.register(MockTool::new("a")).unwrap();
        registry.register(MockTool::new("b")).unwrap();
        registry.register_override(Arc::new(MockTool::new("a").with_description("new")));
        registry.register_override(Arc::new(MockTool::new("c")));

        assert_eq!(registry.names(), vec!["a", "b", "c"]);
        assert_eq!(registry.get("a").unwrap().definition().description, "new");
    }

    #[test]
    fn test_definitions_round_trip_through_wire() {
        let mut registry = ToolRegistry::new();
        let def = ToolDefinition::new("t", "Test tool")
            .required_property("a", "string", "first")
            .property("b", "number", "second");
        registry
            .register(crate::tool::tool_fn(def.clone(), |_args| async {
                Ok(String::new())
            }))
            .unwrap();

        let wire = registry.to_wire();
        assert_eq!(wire.len(), 1);
        assert_eq!(ToolDefinition::from_wire(&wire[0]), def);
        assert_eq!(registry.definitions(), vec![&def]);
    }

    #[tokio::test]
    async fn test_registry_call() {
        let mut registry = ToolRegistry::new();
        registry
            .register(MockTool::new("ok").with_response(Ok("fine".to_string())))
            .unwrap();
        registry
            .register(MockTool::new("bad").with_response(Err(ToolError::failed("nope"))))
            .unwrap();

        let mut args = Arguments::new();
        args.insert("x".to_string(), json!(1));
        assert_eq!(registry.call("ok", args).await.unwrap(), "fine");
        assert_eq!(
            registry.call("bad", Arguments::new()).await.unwrap_err(),
            ToolError::failed("nope")
        );
        assert_eq!(
            registry.call("missing", Arguments::new()).await.unwrap_err(),
            ToolError::NotFound("missing".to_string())
        );
    }
}
