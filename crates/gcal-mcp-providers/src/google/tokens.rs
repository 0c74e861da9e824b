//! OAuth token storage.
//!
//! Tokens live in a JSON file written atomically with owner-only
//! permissions, plus an in-memory copy that readers consult first.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Access tokens are treated as expired this long before Google says so.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Information about an OAuth token set.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,

    /// When the access token expires (already reduced by a safety margin).
    pub expires_at: Option<DateTime<Utc>>,

    /// The OAuth scopes that were granted.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// When the tokens were last refreshed.
    pub last_refresh: DateTime<Utc>,
}

impl std::fmt::Debug for TokenInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenInfo")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

fn expiry_from(expires_in_secs: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in_secs
        .map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_MARGIN_SECS))
}

impl TokenInfo {
    /// Creates a new token info from OAuth response data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expiry_from(expires_in_secs),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            None => false,
        }
    }

    /// Returns true if the token has the required scopes.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Updates the access token after a refresh.
    ///
    /// Google may rotate the refresh token; a new one replaces the old.
    pub fn apply_refresh(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        refresh_token: Option<String>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expiry_from(expires_in_secs);
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.last_refresh = Utc::now();
    }
}

/// Persisted token storage with file-based backend.
#[derive(Debug)]
pub struct TokenStorage {
    /// Path to the token file.
    path: PathBuf,

    /// In-memory cache of the current tokens.
    tokens: RwLock<Option<TokenInfo>>,
}

impl TokenStorage {
    /// Creates a new token storage at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: RwLock::new(None),
        }
    }

    /// Loads tokens from disk into memory.
    ///
    /// Returns Ok(true) if tokens were loaded, Ok(false) if no tokens exist.
    pub fn load(&self) -> ProviderResult<bool> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no token file");
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to read token file: {}", e))
        })?;

        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!("failed to parse token file: {}", e))
                .with_remediation(format!(
                    "delete {} and run `gcal-mcp auth`",
                    self.path.display()
                ))
        })?;

        info!(path = %self.path.display(), "loaded tokens");
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
        Ok(true)
    }

    fn save(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!("failed to create token directory: {}", e))
            })?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| ProviderError::internal(format!("failed to serialize tokens: {}", e)))?;

        fs::write(&temp_path, &content).map_err(|e| {
            ProviderError::configuration(format!("failed to write token file: {}", e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600));
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to rename token file: {}", e))
        })?;

        debug!(path = %self.path.display(), "saved tokens");
        Ok(())
    }

    /// Returns a clone of the current tokens, if any.
    pub fn get(&self) -> Option<TokenInfo> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sets new tokens and saves them to disk.
    pub fn set(&self, tokens: TokenInfo) -> ProviderResult<()> {
        self.save(&tokens)?;
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
        Ok(())
    }

    /// Marks the in-memory access token as expired so the next request
    /// refreshes it. Used after the API rejected the token.
    pub fn invalidate(&self) {
        if let Some(ref mut tokens) = *self.tokens.write().unwrap_or_else(PoisonError::into_inner)
        {
            tokens.expires_at = Some(Utc::now() - Duration::seconds(1));
        }
    }

    /// Clears the stored tokens (both in memory and on disk).
    pub fn clear(&self) -> ProviderResult<()> {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::configuration(format!("failed to remove token file: {}", e))
            })?;
            info!(path = %self.path.display(), "cleared tokens");
        }
        Ok(())
    }

    /// Returns the token storage path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks if re-authentication is needed due to missing tokens or scopes.
    pub fn needs_reauth(&self, required_scopes: &[String]) -> bool {
        match self
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            None => true,
            Some(tokens) => !tokens.has_scopes(required_scopes),
        }
    }
}
