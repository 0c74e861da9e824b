//! Tool error taxonomy.
//!
//! Every failure a tool can report is a [`ToolError`] with a machine-readable
//! [`ToolErrorKind`]. They travel back to the client inside a
//! `CallToolResult` with `isError` set, never as JSON-RPC errors.

use std::fmt;

use gcal_mcp_core::TimeError;
use gcal_mcp_protocol::CallToolResult;
use gcal_mcp_providers::{ProviderError, ProviderErrorCode, ProviderResult};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

/// Result type for tool handlers.
pub type ToolResult<T> = Result<T, ToolError>;

/// Classification of tool failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Missing, expired or revoked credentials, or insufficient permission.
    AuthError,
    /// Arguments that do not match the tool's schema.
    InvalidInput,
    /// A date-time or timezone that cannot be parsed.
    InvalidTimeFormat,
    /// A range whose start is not before its end.
    InvalidTimeRange,
    InvalidAttendeeEmail,
    CalendarNotFound,
    EventNotFound,
    /// Network failures, rate limits and 5xx responses that outlived retries.
    TransientApiError,
    /// Anything else, e.g. an unparseable API response.
    Internal,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthError => "auth_error",
            Self::InvalidInput => "invalid_input",
            Self::InvalidTimeFormat => "invalid_time_format",
            Self::InvalidTimeRange => "invalid_time_range",
            Self::InvalidAttendeeEmail => "invalid_attendee_email",
            Self::CalendarNotFound => "calendar_not_found",
            Self::EventNotFound => "event_not_found",
            Self::TransientApiError => "transient_api_error",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed tool call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ToolError {
    kind: ToolErrorKind,
    message: String,
    remediation: Option<String>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            remediation: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidInput, message)
    }

    pub fn invalid_attendee_email(email: &str) -> Self {
        Self::new(
            ToolErrorKind::InvalidAttendeeEmail,
            format!("'{email}' is not a valid email address"),
        )
    }

    pub fn calendar_not_found(calendar_id: &str) -> Self {
        Self::new(
            ToolErrorKind::CalendarNotFound,
            format!("calendar '{calendar_id}' was not found or is not accessible"),
        )
    }

    pub fn event_not_found(calendar_id: &str, event_id: &str) -> Self {
        Self::new(
            ToolErrorKind::EventNotFound,
            format!("event '{event_id}' was not found in calendar '{calendar_id}'"),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal, message)
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn kind(&self) -> ToolErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn remediation(&self) -> Option<&str> {
        self.remediation.as_deref()
    }

    /// The `{"error": {...}}` document sent to the client.
    pub fn to_json(&self) -> Value {
        let mut error = json!({
            "kind": self.kind,
            "message": self.message,
        });
        if let Some(ref remediation) = self.remediation {
            error["remediation"] = json!(remediation);
        }
        json!({ "error": error })
    }

    pub fn to_call_result(&self) -> CallToolResult {
        let mut result = CallToolResult::json(&self.to_json());
        result.is_error = true;
        result
    }

    /// Maps a backend failure; `not_found` builds the error for a 404/410.
    fn from_provider(err: ProviderError, not_found: impl FnOnce() -> ToolError) -> Self {
        let remediation = err.remediation().map(str::to_string);
        let mapped = match err.code() {
            ProviderErrorCode::NotFound => return not_found(),
            ProviderErrorCode::AuthenticationFailed | ProviderErrorCode::ConfigurationError => {
                Self::new(ToolErrorKind::AuthError, err.message())
            }
            ProviderErrorCode::AuthorizationFailed => {
                Self::new(ToolErrorKind::AuthError, err.message()).with_remediation(
                    "check that the account can access this calendar and that the token was granted the calendar scope",
                )
            }
            ProviderErrorCode::BadRequest => Self::invalid_input(err.message()),
            ProviderErrorCode::NetworkError
            | ProviderErrorCode::RateLimited
            | ProviderErrorCode::ServerError => {
                Self::new(ToolErrorKind::TransientApiError, err.message())
                    .with_remediation("the Calendar API is unavailable; try again shortly")
            }
            ProviderErrorCode::InvalidResponse | ProviderErrorCode::InternalError => {
                Self::internal(err.message())
            }
        };
        match remediation {
            Some(r) => mapped.with_remediation(r),
            None => mapped,
        }
    }
}

impl From<TimeError> for ToolError {
    fn from(err: TimeError) -> Self {
        let kind = match err {
            TimeError::InvalidFormat { .. } | TimeError::UnknownTimezone(_) => {
                ToolErrorKind::InvalidTimeFormat
            }
            TimeError::InvalidRange { .. } => ToolErrorKind::InvalidTimeRange,
        };
        Self::new(kind, err.to_string())
    }
}

/// Attaches the resource a provider call was about, so a 404 becomes the
/// right "not found" kind.
pub trait ProviderResultExt<T> {
    fn for_calendar(self, calendar_id: &str) -> ToolResult<T>;
    fn for_event(self, calendar_id: &str, event_id: &str) -> ToolResult<T>;
}

impl<T> ProviderResultExt<T> for ProviderResult<T> {
    fn for_calendar(self, calendar_id: &str) -> ToolResult<T> {
        self.map_err(|e| ToolError::from_provider(e, || ToolError::calendar_not_found(calendar_id)))
    }

    fn for_event(self, calendar_id: &str, event_id: &str) -> ToolResult<T> {
        self.map_err(|e| {
            ToolError::from_provider(e, || ToolError::event_not_found(calendar_id, event_id))
        })
    }
}
