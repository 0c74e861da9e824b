//! JSON-RPC 2.0 message types and framing for the MCP server.
//!
//! # Protocol Overview
//!
//! The Model Context Protocol is JSON-RPC 2.0. On the stdio transport each
//! message is a single line of JSON terminated by `\n`; on the SSE
//! transport each message is one HTTP body or one SSE event.
//!
//! A client first sends `initialize`, then the `notifications/initialized`
//! notification, and may then call `tools/list` and `tools/call`.
//!
//! # Example
//!
//! ```rust
//! use gcal_mcp_protocol::{JsonRpcRequest, JsonRpcResponse, RequestId, decode_line, encode_line};
//!
//! let request: JsonRpcRequest =
//!     decode_line(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
//! assert_eq!(request.id, Some(RequestId::Number(1)));
//!
//! let response = JsonRpcResponse::success(request.id, serde_json::json!({}));
//! let bytes = encode_line(&response).unwrap();
//! assert!(bytes.ends_with(b"\n"));
//! ```

mod error;
mod framing;
mod types;

pub use error::{ProtocolError, ProtocolResult};
pub use framing::{LineReader, LineWriter, decode_line, encode_line};
pub use types::{
    CallToolParams, CallToolResult, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, RequestId, ServerCapabilities, ServerInfo, ToolContent,
    ToolDefinition, ToolsCapability, error_codes,
};

/// JSON-RPC version string carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revision implemented by the server.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Maximum message size (4 MB).
pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;
