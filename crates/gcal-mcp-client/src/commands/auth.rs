//! Authentication command.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::calendar::credential_provider;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Paths given on the command line that should be remembered in
/// `config.toml`, so later `stdio`/`sse` runs find them without flags.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RememberedPaths {
    pub credentials_file: Option<PathBuf>,
    pub token_file: Option<PathBuf>,
}

impl RememberedPaths {
    fn is_empty(&self) -> bool {
        self.credentials_file.is_none() && self.token_file.is_none()
    }
}

/// Runs the browser consent flow ahead of the first tool call.
///
/// Without `force`, an existing usable (or refreshable) token is kept.
pub async fn run(
    force: bool,
    config: &ClientConfig,
    config_path: &Path,
    remember: RememberedPaths,
) -> ClientResult<()> {
    let google = config.google.to_provider_config(&config.retry)?;
    let tokens = credential_provider(&google, true)?;

    println!("Authorizing Google Calendar access...");
    if force || !google.token_path.exists() {
        println!();
        println!("A browser window will open for you to grant access.");
        println!("If it doesn't, copy the URL printed below into a browser.");
        println!();
    }

    let token = tokens.authenticate(force).await?;
    info!(path = %tokens.token_path().display(), "authorization complete");

    println!("Authorized. Token stored in {}", tokens.token_path().display());
    if let Some(expires_at) = token.expires_at {
        println!("Access token valid until {}", expires_at.format("%Y-%m-%d %H:%M UTC"));
    }
    if token.refresh_token.is_none() {
        println!("No refresh token was issued; you will be asked again when the token expires.");
    }

    if !remember.is_empty() {
        match remember_paths(config_path, &remember) {
            Ok(()) => println!("Saved paths to {}", config_path.display()),
            Err(e) => {
                warn!(path = %config_path.display(), error = %e, "could not update config file")
            }
        }
    }

    Ok(())
}

/// Writes `[google]` path settings into `config.toml`, keeping the rest of
/// the file (comments included) as it was.
fn remember_paths(config_path: &Path, remember: &RememberedPaths) -> ClientResult<()> {
    let content = if config_path.exists() {
        std::fs::read_to_string(config_path)?
    } else {
        String::new()
    };

    let updated = update_document(&content, remember)?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, updated)?;
    Ok(())
}

fn update_document(content: &str, remember: &RememberedPaths) -> ClientResult<String> {
    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| ClientError::config(format!("cannot edit config file: {}", e)))?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let Some(google) = doc["google"].as_table_mut() else {
        return Err(ClientError::config("`google` in config file is not a table"));
    };

    if let Some(ref path) = remember.credentials_file {
        google["credentials_file"] = toml_edit::value(path.display().to_string());
    }
    if let Some(ref path) = remember.token_file {
        google["token_file"] = toml_edit::value(path.display().to_string());
    }

    Ok(doc.to_string())
}
