//! stdio transport.
//!
//! One JSON-RPC message per line on stdin, one response per line on
//! stdout. Requests are handled strictly in order, so a single client never
//! has two calendar mutations in flight.

use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tracing::{info, warn};

use gcal_mcp_protocol::{JsonRpcError, JsonRpcResponse, LineReader, LineWriter};

use crate::error::ServerResult;
use crate::handler::McpHandler;
use crate::signals::ShutdownHandle;

/// Serves MCP over the process's stdin and stdout until EOF or shutdown.
pub async fn serve_stdio(handler: McpHandler, shutdown: ShutdownHandle) -> ServerResult<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        result = serve_io(&handler, stdin, stdout) => result,
        _ = shutdown.wait() => {
            info!("shutdown requested, closing stdio transport");
            Ok(())
        }
    }
}

/// Serves MCP over any line-oriented byte stream pair.
///
/// Returns `Ok(())` when the reader reaches EOF.
pub async fn serve_io<R, W>(handler: &McpHandler, reader: R, writer: W) -> ServerResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = LineReader::new(reader);
    let mut writer = LineWriter::new(writer);
    info!("stdio transport ready");

    loop {
        let response = match reader.next_line().await {
            Ok(Some(line)) => handler.handle_bytes(&line).await,
            Ok(None) => {
                info!("input closed, stopping stdio transport");
                return Ok(());
            }
            // the oversized line was consumed, so the stream is still in sync
            Err(e) if e.is_parse_error() => {
                warn!(error = %e, "rejected message");
                Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(e.to_string()),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(response) = response {
            writer.write_message(&response).await?;
        }
    }
}
