//! Tracing setup for gcal-mcp.
//!
//! All log output goes to stderr. On the stdio transport stdout carries the
//! JSON-RPC stream, so nothing else may ever be written there.
//!
//! # Usage
//!
//! ```ignore
//! use gcal_mcp_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::stdio())?;
//! ```

use std::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to set global subscriber
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// Failed to parse env filter directive
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),

    /// Unknown level or format name in configuration
    #[error("invalid logging setting '{0}'")]
    InvalidSetting(String),
}

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format (default)
    #[default]
    Compact,
    /// JSON lines, for log collectors
    Json,
}

impl FromStr for TracingOutputFormat {
    type Err = TracingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TracingError::InvalidSetting(other.to_string())),
        }
    }
}

/// Parses a level name such as `info` or `DEBUG`.
pub fn parse_level(s: &str) -> Result<Level, TracingError> {
    Level::from_str(s.trim()).map_err(|_| TracingError::InvalidSetting(s.to_string()))
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// The default log level when RUST_LOG is not set
    pub default_level: Level,
    /// Output format for log messages
    pub output_format: TracingOutputFormat,
    /// Whether to include file/line information in logs
    pub include_location: bool,
    /// Whether to include target (module path) in logs
    pub include_target: bool,
    /// Whether to include span events (enter/exit)
    pub include_span_events: bool,
    /// Whether to emit ANSI colour codes
    pub ansi: bool,
    /// Custom env filter directive (overrides default_level if set)
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_target: true,
            include_span_events: false,
            ansi: true,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Preset for the stdio transport: the MCP client usually captures
    /// stderr into a log file, so colours are off.
    #[must_use]
    pub fn stdio() -> Self {
        Self {
            ansi: false,
            ..Self::default()
        }
    }

    /// Preset for the SSE server, with request spans.
    #[must_use]
    pub fn server() -> Self {
        Self {
            include_span_events: true,
            ..Self::default()
        }
    }

    /// Set the default log level
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    /// Set the output format
    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set a custom env filter directive
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Include file and line numbers
    #[must_use]
    pub fn with_location(mut self, include: bool) -> Self {
        self.include_location = include;
        self
    }

    fn default_directive(&self) -> String {
        let level = self.default_level.to_string().to_ascii_lowercase();
        format!("gcal_mcp={level},gcal_mcp_core={level},gcal_mcp_providers={level},gcal_mcp_server={level},tower_http=warn")
    }
}

/// Initialize tracing with the given configuration.
///
/// This should be called once at the start of the application.
/// The `RUST_LOG` environment variable overrides the default level.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set or if
/// the env filter directive is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = if let Some(ref filter) = config.env_filter {
        EnvFilter::try_new(filter)?
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.default_directive()))
    };

    let span_events = if config.include_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(config.include_target)
        .with_span_events(span_events);

    let layer = match config.output_format {
        TracingOutputFormat::Pretty => base.pretty().boxed(),
        TracingOutputFormat::Compact => base.compact().boxed(),
        TracingOutputFormat::Json => base.json().boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(env_filter).with(layer);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
