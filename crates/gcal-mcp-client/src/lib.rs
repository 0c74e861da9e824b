//! The `gcal-mcp` command.
//!
//! Loads configuration, runs the consent flow on demand and starts one of
//! the MCP transports over the Google Calendar backend.

pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
