//! Transport commands: build the tool stack and serve it.

use std::sync::Arc;

use tracing::{info, warn};

use gcal_mcp_providers::CalendarApi;
use gcal_mcp_server::{
    McpHandler, SignalHandler, ToolContext, ToolRegistry, serve_sse, serve_stdio,
};

use crate::calendar::LazyGoogleCalendar;
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Which transport to run.
#[derive(Debug, Clone, PartialEq)]
pub enum Transport {
    Stdio,
    Sse {
        host: Option<String>,
        port: Option<u16>,
    },
}

/// Builds the MCP handler over the lazily connected Google backend.
pub fn build_handler(config: &ClientConfig) -> McpHandler {
    if !config.google.interactive_consent {
        info!("interactive consent disabled; tool calls need a stored token");
    }
    let api: Arc<dyn CalendarApi> = Arc::new(LazyGoogleCalendar::new(config.clone()));
    let registry = ToolRegistry::with_calendar_tools(ToolContext::new(api));
    info!(tools = registry.len(), "tool registry ready");
    McpHandler::new(Arc::new(registry))
}

/// Serves until the transport ends or SIGINT/SIGTERM arrives.
pub async fn run(transport: Transport, config: &ClientConfig) -> ClientResult<()> {
    let handler = build_handler(config);

    let signals = SignalHandler::new();
    signals.spawn_listener();
    let shutdown = signals.shutdown_handle();

    match transport {
        Transport::Stdio => {
            if !config.google.credentials_path().exists()
                && config.google.client_id.is_none()
            {
                warn!(
                    path = %config.google.credentials_path().display(),
                    "no OAuth client configured yet; calendar tools will fail until one is"
                );
            }
            serve_stdio(handler, shutdown).await?;
        }
        Transport::Sse { host, port } => {
            let mut settings = config.server.clone();
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            serve_sse(settings.to_sse_config(), handler, shutdown).await?;
        }
    }

    info!("server stopped");
    Ok(())
}
