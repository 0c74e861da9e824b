//! Google Calendar access configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};
use crate::retry::RetryConfig;

/// Base URL for Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google OAuth endpoints.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// OAuth 2.0 client credentials for Google API access.
///
/// Users must provide their own OAuth client ID and secret, as Google
/// requires registered applications for API access.
#[derive(Clone)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Structure of Google's OAuth credentials JSON file.
///
/// Supports multiple formats:
/// 1. Google Cloud Console format with "installed" or "web" section
/// 2. Flat format with client_id and client_secret at root level (e.g., from gcloud)
#[derive(Debug, Deserialize)]
struct GoogleCredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads OAuth credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read credentials file {}: {}",
                path.display(),
                e
            ))
            .with_remediation(
                "download an OAuth client (Desktop app) JSON from Google Cloud Console \
                 and point [google].credentials_file at it",
            )
        })?;
        Self::from_json(&content)
    }

    /// Parses OAuth credentials from a Google credentials JSON string.
    ///
    /// Supports multiple formats:
    /// 1. Google Cloud Console format: `{"installed": {"client_id": "...", "client_secret": "..."}}`
    /// 2. Flat format: `{"client_id": "...", "client_secret": "..."}`
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: GoogleCredentialsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse credentials JSON: {}", e))
        })?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err(ProviderError::configuration(
            "credentials file must contain 'installed'/'web' section or 'client_id'/'client_secret' at root level",
        ))
    }

    /// Validates that the credentials appear to be correctly formatted.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration for Google Calendar access.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// OAuth credentials for API access.
    pub credentials: OAuthCredentials,

    /// Path to store OAuth tokens.
    ///
    /// Defaults to `<data_dir>/gcal-mcp/token.json`.
    pub token_path: PathBuf,

    /// OAuth scopes to request.
    pub scopes: Vec<String>,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string for API requests.
    pub user_agent: String,

    /// Port range for the loopback OAuth server.
    pub loopback_port_range: (u16, u16),

    /// Calendar API base URL, without trailing slash.
    pub api_base_url: String,

    /// OAuth authorization endpoint.
    pub auth_url: String,

    /// OAuth token endpoint.
    pub token_url: String,

    /// Retry policy for transient API failures.
    pub retry: RetryConfig,
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Read/write calendar access.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    /// Creates a new Google configuration with the given credentials.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            token_path: Self::default_token_path(),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("gcal-mcp/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (8080, 8090),
            api_base_url: CALENDAR_API_BASE.to_string(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            retry: RetryConfig::default(),
        }
    }

    /// Returns the default credentials file path.
    pub fn default_credentials_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gcal-mcp")
            .join("credentials.json")
    }

    /// Returns the default token storage path.
    pub fn default_token_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gcal-mcp")
            .join("token.json")
    }

    /// Sets the token storage path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the loopback port range for OAuth.
    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    /// Sets the OAuth scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Points the API client at another base URL.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Points token exchange and refresh at another endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ProviderResult<()> {
        self.credentials
            .validate()
            .map_err(|e| ProviderError::configuration(format!("invalid credentials: {}", e)))?;

        if self.scopes.is_empty() {
            return Err(ProviderError::configuration(
                "at least one OAuth scope is required",
            ));
        }

        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err(ProviderError::configuration("invalid loopback port range"));
        }

        Ok(())
    }
}
