//! MCP server for Google Calendar.
//!
//! This crate exposes the calendar tools over the Model Context Protocol:
//! - A tool registry shared by every transport
//! - A JSON-RPC dispatcher ([`McpHandler`])
//! - A line-delimited stdio transport
//! - An HTTP + Server-Sent Events transport
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use gcal_mcp_providers::CalendarApi;
//! use gcal_mcp_server::{McpHandler, SignalHandler, ToolContext, ToolRegistry, serve_stdio};
//!
//! async fn run(api: Arc<dyn CalendarApi>) -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = ToolRegistry::with_calendar_tools(ToolContext::new(api));
//!     let handler = McpHandler::new(Arc::new(registry));
//!
//!     let signals = SignalHandler::new();
//!     signals.spawn_listener();
//!     serve_stdio(handler, signals.shutdown_handle()).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod handler;
mod signals;
mod sse;
mod stdio;
mod timezone;
pub mod tools;

pub use config::SseConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{McpHandler, SERVER_NAME};
pub use signals::{ShutdownHandle, SignalHandler};
pub use sse::{SessionRegistry, SseState, router, serve_sse};
pub use stdio::{serve_io, serve_stdio};
pub use timezone::TimezoneResolver;
pub use tools::{ToolContext, ToolError, ToolErrorKind, ToolHandler, ToolRegistry};
