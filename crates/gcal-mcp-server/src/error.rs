//! Server error types.

use std::io;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that stop a transport.
///
/// Failures of individual tool calls never surface here; they are reported
/// to the client inside the tool result.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error on stdin/stdout or a socket.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Protocol error (framing, encoding, etc.).
    #[error("Protocol error: {0}")]
    Protocol(#[from] gcal_mcp_protocol::ProtocolError),

    /// The SSE listener could not bind its address.
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a bind error.
    pub fn bind(addr: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }
}
