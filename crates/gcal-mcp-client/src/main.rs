//! gcal-mcp entry point.

use std::process::ExitCode;

use clap::Parser;

use gcal_mcp_client::cli::{Cli, Command, ConfigAction};
use gcal_mcp_client::commands::auth::RememberedPaths;
use gcal_mcp_client::commands::serve::Transport;
use gcal_mcp_client::commands::{auth, config as config_cmd, serve};
use gcal_mcp_client::config::ClientConfig;
use gcal_mcp_client::error::ClientResult;
use gcal_mcp_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if let Some(hint) = e.remediation() {
                eprintln!("hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    config.apply_cli(&cli);

    let preset = match cli.command {
        Some(Command::Sse { .. }) => TracingConfig::server(),
        _ => TracingConfig::stdio(),
    };
    let tracing = config.logging.tracing_config(preset)?;
    if let Err(e) = init_tracing(tracing) {
        eprintln!("warning: logging disabled: {}", e);
    }

    match cli.command {
        None | Some(Command::Stdio) => serve::run(Transport::Stdio, &config).await,
        Some(Command::Sse { host, port }) => {
            serve::run(Transport::Sse { host, port }, &config).await
        }
        Some(Command::Auth { force }) => {
            let remember = RememberedPaths {
                credentials_file: cli.credentials_file.clone(),
                token_file: cli.token_file.clone(),
            };
            auth::run(force, &config, &config_path, remember).await
        }
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => config_cmd::dump(&config, &config_path),
            ConfigAction::Validate => config_cmd::validate(&config),
            ConfigAction::Path => config_cmd::path(&config_path),
        },
    }
}
