//! Tool registry and the calendar tools.
//!
//! Every tool implements [`ToolHandler`]. The [`ToolRegistry`] owns the
//! shared dependencies and is the only thing the transports talk to, so
//! stdio and SSE expose exactly the same behavior.

mod calendars;
mod error;
mod events;
pub mod requests;
mod schema;
mod time;

#[cfg(test)]
pub(crate) mod fake;

use std::sync::Arc;
use std::time::Instant;

use gcal_mcp_protocol::{CallToolResult, ToolDefinition};
use gcal_mcp_providers::{BoxFuture, CalendarApi};
use serde_json::Value;
use tracing::{debug, warn};

use crate::timezone::TimezoneResolver;

pub use calendars::ListCalendars;
pub use error::{ProviderResultExt, ToolError, ToolErrorKind, ToolResult};
pub use events::{CheckAvailability, CreateEvent, DeleteEvent, GetEvents, UpdateEvent};
pub use time::{GetCurrentDate, GetTimezoneInfo};

/// Dependencies handed to every tool call.
#[derive(Clone)]
pub struct ToolContext {
    pub api: Arc<dyn CalendarApi>,
    pub timezone: Arc<TimezoneResolver>,
}

impl ToolContext {
    /// Creates a context that resolves the account timezone lazily.
    pub fn new(api: Arc<dyn CalendarApi>) -> Self {
        let timezone = Arc::new(TimezoneResolver::new(api.clone()));
        Self { api, timezone }
    }

    pub fn with_timezone(api: Arc<dyn CalendarApi>, timezone: TimezoneResolver) -> Self {
        Self {
            api,
            timezone: Arc::new(timezone),
        }
    }
}

/// A callable tool.
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema of the arguments.
    fn input_schema(&self) -> Value;

    /// Runs the tool. `args` is whatever the client sent, unvalidated.
    fn call<'a>(&'a self, ctx: &'a ToolContext, args: Value) -> BoxFuture<'a, ToolResult<Value>>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// The set of tools exposed by the server.
pub struct ToolRegistry {
    ctx: ToolContext,
    tools: Vec<Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            ctx,
            tools: Vec::new(),
        }
    }

    /// Creates a registry with all eight calendar tools.
    pub fn with_calendar_tools(ctx: ToolContext) -> Self {
        let mut registry = Self::new(ctx);
        registry.register(Arc::new(GetEvents));
        registry.register(Arc::new(ListCalendars));
        registry.register(Arc::new(GetTimezoneInfo));
        registry.register(Arc::new(GetCurrentDate));
        registry.register(Arc::new(CreateEvent));
        registry.register(Arc::new(UpdateEvent));
        registry.register(Arc::new(DeleteEvent));
        registry.register(Arc::new(CheckAvailability));
        registry
    }

    /// Adds a tool, replacing any tool of the same name.
    pub fn register(&mut self, tool: Arc<dyn ToolHandler>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name() == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Calls a tool by name. Returns `None` if no such tool exists.
    ///
    /// Failures are folded into the result with `isError` set.
    pub async fn call(&self, name: &str, args: Value) -> Option<CallToolResult> {
        let tool = self.tools.iter().find(|t| t.name() == name)?.clone();

        let start = Instant::now();
        let outcome = tool.call(&self.ctx, args).await;
        let duration_ms = start.elapsed().as_millis();

        Some(match outcome {
            Ok(value) => {
                debug!(tool = name, duration_ms, "tool call succeeded");
                CallToolResult::json(&value)
            }
            Err(e) => {
                warn!(
                    tool = name,
                    duration_ms,
                    kind = %e.kind(),
                    error = %e.message(),
                    "tool call failed"
                );
                e.to_call_result()
            }
        })
    }
}
