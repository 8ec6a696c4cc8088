//! Tool model: definitions, the [`Tool`] trait and argument access.
//!
//! A tool is a named, schema-described handler. Local tools and tools
//! forwarded to a child server implement the same trait, so the registry and
//! dispatcher never need to know where a call ends up.
//!
//! # Example
//!
//! ```rust,ignore
//! use bud_mcp::{ArgsExt, ToolDefinition, ToolError, tool_fn};
//!
//! let greet = tool_fn(
//!     ToolDefinition::new("greet", "Say hello").required_property("name", "string", "Who"),
//!     |args| async move {
//!         let name = args.required_str("name")?;
//!         Ok::<_, ToolError>(format!("hello {name}"))
//!     },
//! );
//! ```

use std::collections::BTreeMap;
use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::protocol::{InputSchema, ToolInfo};

/// Arguments of a tool call: parameter name to JSON value.
pub type Arguments = Map<String, Value>;

/// Result type for tool handlers.
pub type ToolResult = std::result::Result<String, ToolError>;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failure of a single tool call.
///
/// These never become JSON-RPC errors; the dispatcher reports them inside a
/// successful response with `isError: true`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    /// No tool with this name is registered.
    #[error("Unknown tool: {0}")]
    NotFound(String),

    /// A required argument is absent.
    #[error("missing required argument '{0}'")]
    MissingArgument(String),

    /// An argument is present with the wrong type.
    #[error("invalid type for '{name}': expected {expected}, got {actual}")]
    InvalidArgument {
        /// The argument name.
        name: String,
        /// The expected type.
        expected: &'static str,
        /// The type that was supplied.
        actual: &'static str,
    },

    /// The handler ran and failed.
    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    /// Create a handler failure.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument access
// ─────────────────────────────────────────────────────────────────────────────

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Typed access to call arguments.
///
/// Optional accessors treat an absent or `null` argument as `None`, but a
/// present argument of the wrong type is always an error.
pub trait ArgsExt {
    /// Get a required string argument.
    fn required_str(&self, name: &str) -> Result<&str, ToolError>;

    /// Get an optional string argument.
    fn optional_str(&self, name: &str) -> Result<Option<&str>, ToolError>;

    /// Get a required number argument.
    fn required_f64(&self, name: &str) -> Result<f64, ToolError>;

    /// Get an optional number argument.
    fn optional_f64(&self, name: &str) -> Result<Option<f64>, ToolError>;

    /// Get an optional boolean argument with a default.
    fn optional_bool(&self, name: &str, default: bool) -> Result<bool, ToolError>;

    /// Get an optional array argument.
    fn optional_array(&self, name: &str) -> Result<Option<&Vec<Value>>, ToolError>;
}

fn present<'a>(args: &'a Arguments, name: &str) -> Option<&'a Value> {
    args.get(name).filter(|v| !v.is_null())
}

fn mismatch(name: &str, expected: &'static str, actual: &Value) -> ToolError {
    ToolError::InvalidArgument {
        name: name.to_string(),
        expected,
        actual: type_name(actual),
    }
}

impl ArgsExt for Arguments {
    fn required_str(&self, name: &str) -> Result<&str, ToolError> {
        self.optional_str(name)?
            .ok_or_else(|| ToolError::MissingArgument(name.to_string()))
    }

    fn optional_str(&self, name: &str) -> Result<Option<&str>, ToolError> {
        match present(self, name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(mismatch(name, "string", other)),
        }
    }

    fn required_f64(&self, name: &str) -> Result<f64, ToolError> {
        self.optional_f64(name)?
            .ok_or_else(|| ToolError::MissingArgument(name.to_string()))
    }

    fn optional_f64(&self, name: &str) -> Result<Option<f64>, ToolError> {
        match present(self, name) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(other) => Err(mismatch(name, "number", other)),
        }
    }

    fn optional_bool(&self, name: &str, default: bool) -> Result<bool, ToolError> {
        match present(self, name) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(mismatch(name, "boolean", other)),
        }
    }

    fn optional_array(&self, name: &str) -> Result<Option<&Vec<Value>>, ToolError> {
        match present(self, name) {
            None => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(other) => Err(mismatch(name, "array", other)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Definitions
// ─────────────────────────────────────────────────────────────────────────────

/// Schema fragment for one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    /// JSON type tag ("string", "number", ...).
    #[serde(rename = "type", default)]
    pub type_tag: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

/// Name, description and flattened input schema of a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Parameter name to its schema fragment.
    pub properties: BTreeMap<String, PropertyDef>,
    /// Names of required parameters.
    pub required: Vec<String>,
}

impl ToolDefinition {
    /// Create a definition with no parameters.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Add an optional parameter.
    pub fn property(
        mut self,
        name: impl Into<String>,
        type_tag: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.properties.insert(
            name.into(),
            PropertyDef {
                type_tag: type_tag.into(),
                description: description.into(),
            },
        );
        self
    }

    /// Add a required parameter.
    pub fn required_property(
        mut self,
        name: impl Into<String>,
        type_tag: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.property(name, type_tag, description)
    }

    /// Render as the `tools/list` wire shape.
    pub fn to_wire(&self) -> ToolInfo {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, prop)| {
                (
                    name.clone(),
                    json!({"type": prop.type_tag, "description": prop.description}),
                )
            })
            .collect();

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !self.required.is_empty() {
            schema.insert("required".to_string(), json!(self.required));
        }

        ToolInfo {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            input_schema: Some(Value::Object(schema)),
        }
    }

    /// Build a definition from a child server's wire tool.
    ///
    /// Each property is flattened to its type tag and description; a
    /// property whose `type` is a list of tags keeps the first one. Anything
    /// else in the schema is dropped.
    pub fn from_wire(info: &ToolInfo) -> Self {
        let schema = info
            .input_schema
            .clone()
            .and_then(|raw| serde_json::from_value::<InputSchema>(raw).ok());

        let mut def = Self::new(
            info.name.clone(),
            info.description.clone().unwrap_or_default(),
        );

        if let Some(schema) = schema {
            for (name, raw) in schema.properties {
                let type_tag = match raw.get("type") {
                    Some(Value::String(tag)) => tag.clone(),
                    Some(Value::Array(tags)) => tags
                        .iter()
                        .find_map(|t| t.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    _ => String::new(),
                };
                let description = raw
                    .get("description")
                    .and_then(|d| d.as_str())
                    .unwrap_or_default()
                    .to_string();
                def.properties.insert(
                    name,
                    PropertyDef {
                        type_tag,
                        description,
                    },
                );
            }
            def.required = schema.required;
        }

        def
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The definition advertised in `tools/list`.
    fn definition(&self) -> &ToolDefinition;

    /// The unique name of this tool.
    fn name(&self) -> &str {
        &self.definition().name
    }

    /// Run the tool.
    async fn call(&self, args: Arguments) -> ToolResult;
}

/// A tool backed by an async closure.
pub struct FnTool<F> {
    definition: ToolDefinition,
    handler: F,
}

/// Wrap an async closure as a [`Tool`].
pub fn tool_fn<F, Fut>(definition: ToolDefinition, handler: F) -> FnTool<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = ToolResult> + Send,
{
    FnTool {
        definition,
        handler,
    }
}

#[async_trait]
impl<F, Fut> Tool for FnTool<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = ToolResult> + Send,
{
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn call(&self, args: Arguments) -> ToolResult {
        (self.handler)(args).await
    }
}

impl<F> std::fmt::Debug for FnTool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.definition.name)
            .finish()
    }
}
