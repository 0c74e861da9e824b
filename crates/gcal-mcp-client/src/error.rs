//! Client error types.

use std::fmt;

use gcal_mcp_providers::{ProviderError, ProviderErrorCode};
use gcal_mcp_server::ServerError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that end a `gcal-mcp` invocation.
#[derive(Debug)]
pub enum ClientError {
    /// Configuration error.
    Config(String),
    /// Authentication failed or needs user action.
    Auth {
        message: String,
        remediation: Option<String>,
    },
    /// Calendar backend error.
    Provider(String),
    /// A transport failed.
    Server(ServerError),
    /// IO error.
    Io(std::io::Error),
}

impl ClientError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Follow-up the user should take, if any.
    pub fn remediation(&self) -> Option<&str> {
        match self {
            Self::Auth { remediation, .. } => remediation.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Auth { message, .. } => write!(f, "authentication failed: {}", message),
            Self::Provider(msg) => write!(f, "calendar error: {}", msg),
            Self::Server(err) => write!(f, "server error: {}", err),
            Self::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Server(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ServerError> for ClientError {
    fn from(err: ServerError) -> Self {
        Self::Server(err)
    }
}

impl From<ProviderError> for ClientError {
    fn from(err: ProviderError) -> Self {
        match err.code() {
            ProviderErrorCode::AuthenticationFailed | ProviderErrorCode::AuthorizationFailed => {
                Self::Auth {
                    message: err.message().to_string(),
                    remediation: err.remediation().map(str::to_string),
                }
            }
            ProviderErrorCode::ConfigurationError => match err.remediation() {
                Some(hint) => Self::Config(format!("{} ({})", err.message(), hint)),
                None => Self::Config(err.message().to_string()),
            },
            _ => Self::Provider(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_are_classified() {
        let err: ClientError = ProviderError::authentication("access denied")
            .with_remediation("run `gcal-mcp auth --force`")
            .into();
        assert!(matches!(err, ClientError::Auth { .. }));
        assert_eq!(err.remediation(), Some("run `gcal-mcp auth --force`"));

        let err: ClientError = ProviderError::configuration("missing client_id").into();
        assert_eq!(err.to_string(), "configuration error: missing client_id");

        let err: ClientError = ProviderError::server("backend unavailable").into();
        assert!(matches!(err, ClientError::Provider(_)));
    }
}
