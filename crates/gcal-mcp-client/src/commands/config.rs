//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Renders the effective configuration, with the client secret hidden.
pub fn render(config: &ClientConfig) -> ClientResult<String> {
    let mut shown = config.clone();
    if shown.google.client_secret.is_some() {
        shown.google.client_secret = Some("<redacted>".to_string());
    }
    toml::to_string_pretty(&shown)
        .map_err(|e| ClientError::config(format!("failed to serialize config: {}", e)))
}

/// Dump the effective configuration to stdout.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    println!("# config.toml ({})", path.display());
    println!("{}", render(config)?);
    Ok(())
}

/// Validate the configuration, including that the OAuth client is readable.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.validate()?;

    match config.google.resolve_credentials() {
        Ok(credentials) => {
            credentials
                .validate()
                .map_err(|e| ClientError::config(format!("invalid Google credentials: {}", e)))?;
            println!("Google credentials are valid.");
        }
        Err(e) => println!("warning: {}", ClientError::from(e)),
    }

    let token_path = config.google.token_path();
    if token_path.exists() {
        println!("Token file: {}", token_path.display());
    } else {
        println!(
            "No token at {}; run `gcal-mcp auth` or let the first tool call ask for consent.",
            token_path.display()
        );
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_hides_secret() {
        let mut config = ClientConfig::default();
        config.google.client_id = Some("id.apps.googleusercontent.com".to_string());
        config.google.client_secret = Some("hunter2".to_string());

        let rendered = render(&config).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("[server]"));
    }

    #[test]
    fn rendered_config_parses_back() {
        let mut config = ClientConfig::default();
        config.server.port = 9123;
        config.logging.format = "json".to_string();

        let reparsed: ClientConfig = toml::from_str(&render(&config).unwrap()).unwrap();
        assert_eq!(reparsed, config);
    }
}
