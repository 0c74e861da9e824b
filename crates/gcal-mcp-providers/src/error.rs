//! Error types for calendar provider operations.
//!
//! This module defines the error types that can occur when talking to the
//! Google Calendar API or the OAuth token endpoint.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// The category of a provider error.
///
/// This enum provides a high-level classification of errors for use in
/// tool error mapping and retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Authentication failed or credentials are invalid/expired.
    AuthenticationFailed,
    /// Authorization failed - user lacks permission.
    AuthorizationFailed,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// Rate limit exceeded - too many requests.
    RateLimited,
    /// Server returned an error (5xx status codes).
    ServerError,
    /// Invalid response from the server - parse error, unexpected format.
    InvalidResponse,
    /// Resource not found (404) or gone (410).
    NotFound,
    /// Request was invalid (400) - bad parameters, malformed request.
    BadRequest,
    /// Configuration error - missing or invalid config.
    ConfigurationError,
    /// Internal provider error - unexpected state, bug.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns true if this error is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Returns a human-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reasons Google uses on 403 responses for quota exhaustion.
const RATE_LIMIT_REASONS: &[&str] = &["rateLimitExceeded", "userRateLimitExceeded"];

/// An error that occurred while interacting with the calendar backend.
#[derive(Debug, Error)]
pub struct ProviderError {
    /// The error code categorizing this error.
    code: ProviderErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// HTTP status that produced this error, if any.
    status: Option<u16>,
    /// What the user can do about it.
    remediation: Option<String>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            remediation: None,
            source: None,
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::BadRequest, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Classifies an unsuccessful Calendar API response.
    ///
    /// The body is Google's standard error document; its message and first
    /// reason are used when present. A 403 carrying a rate-limit reason is
    /// treated as transient rather than as a permission problem.
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<GoogleErrorBody>(body).ok();
        let reason = parsed
            .as_ref()
            .and_then(|b| b.error.errors.first())
            .and_then(|e| e.reason.clone());
        let detail = parsed
            .map(|b| b.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| truncate(body, 200));

        let code = match status {
            401 => ProviderErrorCode::AuthenticationFailed,
            403 if reason
                .as_deref()
                .is_some_and(|r| RATE_LIMIT_REASONS.contains(&r)) =>
            {
                ProviderErrorCode::RateLimited
            }
            403 => ProviderErrorCode::AuthorizationFailed,
            404 | 410 => ProviderErrorCode::NotFound,
            429 => ProviderErrorCode::RateLimited,
            400..=499 => ProviderErrorCode::BadRequest,
            500..=599 => ProviderErrorCode::ServerError,
            _ => ProviderErrorCode::InvalidResponse,
        };

        let message = match reason {
            Some(reason) => format!("API error ({status}, {reason}): {detail}"),
            None => format!("API error ({status}): {detail}"),
        };

        let mut error = Self::new(code, message);
        error.status = Some(status);
        error
    }

    /// Maps a transport-level reqwest failure.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timeout".to_string()
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            format!("request failed: {err}")
        };
        Self::network(message).with_source(err)
    }

    /// Sets a remediation hint for this error.
    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status, if the error came from a response.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the remediation hint, if set.
    pub fn remediation(&self) -> Option<&str> {
        self.remediation.as_deref()
    }

    /// Returns true if this error is transient and may be retried.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<GoogleErrorItem>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorItem {
    #[serde(default)]
    reason: Option<String>,
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
