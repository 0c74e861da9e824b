//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// gcal-mcp - Google Calendar tools for MCP clients
#[derive(Debug, Parser)]
#[command(name = "gcal-mcp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "GCAL_MCP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (compact, pretty, json)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Google Cloud Console OAuth client JSON
    #[arg(long, env = "GCAL_MCP_CREDENTIALS_FILE", global = true)]
    pub credentials_file: Option<PathBuf>,

    /// Where the OAuth token is stored
    #[arg(long, env = "GCAL_MCP_TOKEN_FILE", global = true)]
    pub token_file: Option<PathBuf>,

    /// Never open the browser; fail tool calls until `gcal-mcp auth` has run
    #[arg(long, global = true)]
    pub headless: bool,

    /// Defaults to `stdio`
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve MCP over stdin/stdout
    Stdio,

    /// Serve MCP over HTTP with Server-Sent Events
    Sse {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Authorize calendar access in the browser and store the token
    Auth {
        /// Discard the stored token and authorize again
        #[arg(long, short)]
        force: bool,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump the effective configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
