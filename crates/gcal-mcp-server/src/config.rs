//! SSE transport configuration.

use crate::error::{ServerError, ServerResult};

/// Settings for the HTTP/SSE front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseConfig {
    /// Address to bind.
    pub host: String,

    /// Port to bind.
    pub port: u16,

    /// Maximum number of concurrently open SSE sessions.
    pub max_sessions: usize,

    /// Responses buffered per session before senders wait.
    pub session_buffer: usize,
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_sessions: 64,
            session_buffer: 32,
        }
    }
}

impl SseConfig {
    /// Creates a configuration bound to `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Builder: set max sessions.
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Returns `host:port`, bracketing IPv6 literals.
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.host.trim().is_empty() {
            return Err(ServerError::config("server host must not be empty"));
        }
        if self.max_sessions == 0 {
            return Err(ServerError::config("max_sessions must be at least 1"));
        }
        if self.session_buffer == 0 {
            return Err(ServerError::config("session_buffer must be at least 1"));
        }
        Ok(())
    }
}
