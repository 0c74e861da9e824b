//! JSON-RPC request dispatch.
//!
//! [`McpHandler`] turns one decoded message into at most one response. Both
//! transports feed it, which keeps their behavior identical.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use gcal_mcp_protocol::{
    CallToolParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, MCP_PROTOCOL_VERSION, ServerInfo, decode_line,
};

use crate::tools::ToolRegistry;

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "gcal-mcp";

const INSTRUCTIONS: &str = "Google Calendar tools. Call get-current-date before working with \
relative dates, and list-calendars to discover calendar ids. Times without an offset are \
interpreted in the account timezone unless a timezone is given.";

/// Routes MCP requests to the tool registry.
#[derive(Clone)]
pub struct McpHandler {
    registry: Arc<ToolRegistry>,
    server_info: ServerInfo,
}

impl McpHandler {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            server_info: ServerInfo::new(SERVER_NAME, env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handles one raw frame.
    ///
    /// Malformed JSON yields a parse error with a null id.
    pub async fn handle_bytes(&self, bytes: &[u8]) -> Option<JsonRpcResponse> {
        match decode_line::<Value>(bytes) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => {
                debug!(error = %e, "unparseable message");
                Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(e.to_string()),
                ))
            }
        }
    }

    /// Handles one decoded JSON document.
    pub async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        if value.is_array() {
            return Some(JsonRpcResponse::error(
                None,
                JsonRpcError::invalid_request("batch requests are not supported"),
            ));
        }

        let id = value
            .get("id")
            .and_then(|id| serde_json::from_value(id.clone()).ok());
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(e.to_string()),
            )),
        }
    }

    /// Handles a request; notifications produce `None`.
    #[tracing::instrument(skip(self, request), fields(method = %request.method, id))]
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if let Some(ref id) = request.id {
            tracing::Span::current().record("id", tracing::field::display(id));
        }

        if !request.is_compatible() {
            return request.id.map(|id| {
                JsonRpcResponse::error(
                    Some(id),
                    JsonRpcError::invalid_request(format!(
                        "unsupported jsonrpc version '{}'",
                        request.jsonrpc
                    )),
                )
            });
        }

        if request.is_notification() {
            debug!("notification received");
            return None;
        }

        let start = Instant::now();
        let id = request.id.clone();
        let outcome = match request.method.as_str() {
            "initialize" => self.initialize(request.params.as_ref()),
            "ping" => Ok(json!({})),
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        let response = match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                warn!(code = error.code, error = %error.message, "request failed");
                JsonRpcResponse::error(id, error)
            }
        };
        debug!(duration_ms = start.elapsed().as_millis(), "request handled");
        Some(response)
    }

    fn initialize(&self, params: Option<&Value>) -> Result<Value, JsonRpcError> {
        let client = params
            .and_then(|p| p.get("clientInfo"))
            .and_then(|c| c.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let requested = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or(MCP_PROTOCOL_VERSION);
        info!(client, requested, "client initialized session");

        let result =
            InitializeResult::new(self.server_info.clone()).with_instructions(INSTRUCTIONS);
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal(e.to_string()))
    }

    fn list_tools(&self) -> Result<Value, JsonRpcError> {
        let result = ListToolsResult {
            tools: self.registry.definitions(),
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal(e.to_string()))
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("tools/call requires params"))
            .and_then(|p| {
                serde_json::from_value(p).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
            })?;

        let result = self
            .registry
            .call(&params.name, params.arguments_value())
            .await
            .ok_or_else(|| {
                JsonRpcError::invalid_params(format!("unknown tool '{}'", params.name))
            })?;
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal(e.to_string()))
    }
}
