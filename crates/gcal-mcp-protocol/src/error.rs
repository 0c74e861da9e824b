//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur during protocol operations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Message exceeds maximum allowed size.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Failed to (de)serialize a message.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The `jsonrpc` member is not "2.0".
    #[error("unsupported JSON-RPC version: {0}")]
    UnsupportedVersion(String),

    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Empty message received.
    #[error("empty message")]
    EmptyMessage,
}

impl ProtocolError {
    /// Returns true if the error comes from malformed input rather than IO.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::Serialization(_) | Self::EmptyMessage | Self::MessageTooLarge { .. }
        )
    }
}
