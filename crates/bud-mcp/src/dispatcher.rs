//! JSON-RPC dispatcher over the tool registry.
//!
//! The dispatcher is transport-agnostic: it turns one classified message into
//! at most one response. It is `Send + Sync` so an HTTP binding can drive it
//! from many tasks at once.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::protocol::{
    CallToolParams, CallToolResult, ClientInfo, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    MCP_PROTOCOL_VERSION, RpcMessage, ServerCapabilities, ServerInfo, ToolsCapability,
};
use crate::registry::ToolRegistry;
use crate::tool::ToolError;

type MethodResult = std::result::Result<Value, JsonRpcError>;

fn rpc_error(code: i64, message: impl Into<String>) -> JsonRpcError {
    JsonRpcError {
        code,
        message: message.into(),
        data: None,
    }
}

/// The handshake acknowledgement never gets a response, with or without an id.
fn is_initialized(method: &str) -> bool {
    matches!(method, "initialized" | "notifications/initialized")
}

/// Handshake state of the upstream client.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No `initialize` seen yet.
    Uninitialized,
    /// `initialize` answered.
    Ready {
        /// What the client said about itself.
        client: ClientInfo,
    },
}

/// Serves `initialize`, `tools/list` and `tools/call`.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    server_info: ServerInfo,
    state: RwLock<SessionState>,
}

impl Dispatcher {
    /// Create a dispatcher over a finished registry.
    pub fn new(registry: Arc<ToolRegistry>, server_info: ServerInfo) -> Self {
        Self {
            registry,
            server_info,
            state: RwLock::new(SessionState::Uninitialized),
        }
    }

    /// The registry being served.
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// The identity reported in `initialize`.
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Current handshake state.
    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    /// Parse and handle one framed message.
    ///
    /// Returns the JSON error for text that is not JSON at all; the caller
    /// decides how to report it.
    pub async fn handle_line(&self, line: &str) -> serde_json::Result<Option<JsonRpcResponse>> {
        let message = RpcMessage::parse(line)?;
        Ok(self.handle_message(message).await)
    }

    /// Handle an already-decoded JSON value.
    pub async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        self.handle_message(RpcMessage::from_value(value)).await
    }

    /// Handle one classified message. Only requests produce a response.
    pub async fn handle_message(&self, message: RpcMessage) -> Option<JsonRpcResponse> {
        match message {
            RpcMessage::Request(request) if is_initialized(&request.method) => {
                debug!(id = %request.id, "initialized sent with an id");
                self.handle_notification(JsonRpcNotification::new(request.method, request.params));
                None
            }
            RpcMessage::Request(request) => Some(self.handle_request(request).await),
            RpcMessage::Notification(notification) => {
                self.handle_notification(notification);
                None
            }
            RpcMessage::Response(response) => {
                debug!(id = %response.id, "ignoring unsolicited response");
                None
            }
            RpcMessage::Invalid { id: Some(id) } => {
                warn!(id = %id, "message has an id but no method");
                Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::INVALID_REQUEST,
                    "Invalid Request",
                ))
            }
            RpcMessage::Invalid { id: None } => {
                warn!("ignoring message that is not a JSON-RPC object");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let JsonRpcRequest {
            id, method, params, ..
        } = request;

        let result = match method.as_str() {
            "initialize" => self.handle_initialize(params),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(params).await,
            _ => {
                warn!(method = %method, "unknown method");
                Err(rpc_error(
                    JsonRpcError::METHOD_NOT_FOUND,
                    format!("Method not found: {method}"),
                ))
            }
        };

        match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::failure(id, error),
        }
    }

    fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            method if is_initialized(method) => info!("client initialized"),
            other => debug!(method = %other, "ignoring notification"),
        }
    }

    fn handle_initialize(&self, params: Option<Value>) -> MethodResult {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_else(|| InitializeParams {
                client_info: ClientInfo::default(),
                ..InitializeParams::default()
            });

        info!(
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            protocol = %params.protocol_version,
            "initialize"
        );
        *self.state.write() = SessionState::Ready {
            client: params.client_info,
        };

        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
            },
            server_info: self.server_info.clone(),
        };
        serde_json::to_value(result)
            .map_err(|e| rpc_error(JsonRpcError::INTERNAL_ERROR, format!("Serialization error: {e}")))
    }

    fn handle_list_tools(&self) -> MethodResult {
        self.note_early("tools/list");
        let result = ListToolsResult {
            tools: self.registry.to_wire(),
        };
        serde_json::to_value(result)
            .map_err(|e| rpc_error(JsonRpcError::INTERNAL_ERROR, format!("Serialization error: {e}")))
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> MethodResult {
        self.note_early("tools/call");
        let params: CallToolParams = match params {
            Some(p) => serde_json::from_value(p).map_err(|e| {
                rpc_error(JsonRpcError::INVALID_PARAMS, format!("Invalid params: {e}"))
            })?,
            None => {
                return Err(rpc_error(
                    JsonRpcError::INVALID_PARAMS,
                    "Invalid params: missing params",
                ));
            }
        };

        debug!(tool = %params.name, "tool call");
        let result = match self.registry.call(&params.name, params.arguments).await {
            Ok(text) => CallToolResult::success(text),
            Err(e @ ToolError::NotFound(_)) => {
                warn!(tool = %params.name, "unknown tool");
                CallToolResult::error(e.to_string())
            }
            Err(e) => {
                warn!(tool = %params.name, error = %e, "tool call failed");
                CallToolResult::error(format!("Error: {e}"))
            }
        };

        serde_json::to_value(result)
            .map_err(|e| rpc_error(JsonRpcError::INTERNAL_ERROR, format!("Serialization error: {e}")))
    }

    fn note_early(&self, method: &str) {
        if *self.state.read() == SessionState::Uninitialized {
            debug!(method, "request before initialize");
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("server", &self.server_info.name)
            .field("tools", &self.registry.len())
            .finish()
    }
}
