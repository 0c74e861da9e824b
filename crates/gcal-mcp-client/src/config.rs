//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/gcal-mcp/config.toml` by default. Every section is optional:
//!
//! ```toml
//! [google]
//! credentials_file = "~/.config/gcal-mcp/credentials.json"
//! token_file = "~/.local/share/gcal-mcp/token.json"
//! interactive_consent = true
//!
//! [retry]
//! max_retries = 3
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8000
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use gcal_mcp_core::{TracingConfig, TracingOutputFormat, parse_level};
use gcal_mcp_providers::google::{GoogleConfig, OAuthCredentials};
use gcal_mcp_providers::{ProviderError, ProviderResult, RetryConfig};
use gcal_mcp_server::SseConfig;

use crate::cli::Cli;
use crate::error::{ClientError, ClientResult};

/// Configuration for the `gcal-mcp` binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Google OAuth and API settings.
    pub google: GoogleSettings,

    /// Retry policy for transient API failures.
    pub retry: RetrySettings,

    /// SSE transport settings.
    pub server: ServerSettings,

    /// Log output settings.
    pub logging: LoggingSettings,
}

/// `[google]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// Google Cloud Console OAuth client JSON.
    pub credentials_file: Option<PathBuf>,

    /// Inline OAuth client ID, used instead of `credentials_file`.
    pub client_id: Option<String>,

    /// Inline OAuth client secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Where the OAuth token is persisted.
    pub token_file: Option<PathBuf>,

    /// Open the browser consent flow when no usable token exists.
    pub interactive_consent: bool,

    /// Per-request timeout.
    pub timeout_secs: u64,

    pub loopback_port_start: u16,
    pub loopback_port_end: u16,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            credentials_file: None,
            client_id: None,
            client_secret: None,
            token_file: None,
            interactive_consent: true,
            timeout_secs: GoogleConfig::DEFAULT_TIMEOUT_SECS,
            loopback_port_start: 8080,
            loopback_port_end: 8090,
        }
    }
}

impl GoogleSettings {
    /// The credentials file in effect.
    pub fn credentials_path(&self) -> PathBuf {
        self.credentials_file
            .clone()
            .unwrap_or_else(GoogleConfig::default_credentials_path)
    }

    /// The token file in effect.
    pub fn token_path(&self) -> PathBuf {
        self.token_file
            .clone()
            .unwrap_or_else(GoogleConfig::default_token_path)
    }

    /// Inline `client_id`/`client_secret` win over the credentials file.
    pub fn resolve_credentials(&self) -> ProviderResult<OAuthCredentials> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => Ok(OAuthCredentials::new(id, secret)),
            (Some(_), None) | (None, Some(_)) => Err(ProviderError::configuration(
                "[google] client_id and client_secret must be set together",
            )),
            (None, None) => OAuthCredentials::from_file(self.credentials_path()),
        }
    }

    /// Builds the provider configuration.
    pub fn to_provider_config(&self, retry: &RetrySettings) -> ProviderResult<GoogleConfig> {
        let config = GoogleConfig::new(self.resolve_credentials()?)
            .with_token_path(self.token_path())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_loopback_port_range(self.loopback_port_start, self.loopback_port_end)
            .with_retry(retry.to_retry_config());
        config.validate()?;
        Ok(config)
    }
}

/// `[retry]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
            multiplier: 2.0,
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            backoff_multiplier: self.multiplier,
        }
    }
}

/// `[server]` section, used by the SSE transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_sessions: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let defaults = SseConfig::default();
        Self {
            host: defaults.host,
            port: defaults.port,
            max_sessions: defaults.max_sessions,
        }
    }
}

impl ServerSettings {
    pub fn to_sse_config(&self) -> SseConfig {
        SseConfig::new(&self.host, self.port).with_max_sessions(self.max_sessions)
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl LoggingSettings {
    /// Builds the tracing setup, starting from a transport preset.
    pub fn tracing_config(&self, preset: TracingConfig) -> ClientResult<TracingConfig> {
        let level = parse_level(&self.level)
            .map_err(|_| ClientError::config(format!("unknown log level '{}'", self.level)))?;
        let format: TracingOutputFormat = self
            .format
            .parse()
            .map_err(|_| ClientError::config(format!("unknown log format '{}'", self.format)))?;
        Ok(preset.with_level(level).with_format(format))
    }
}

impl ClientConfig {
    /// Loads configuration.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(path: Option<&Path>) -> ClientResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            ClientError::config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Applies command-line overrides.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(ref path) = cli.credentials_file {
            self.google.credentials_file = Some(path.clone());
        }
        if let Some(ref path) = cli.token_file {
            self.google.token_file = Some(path.clone());
        }
        if cli.headless {
            self.google.interactive_consent = false;
        }
        if let Some(ref level) = cli.log_level {
            self.logging.level = level.clone();
        }
        if cli.debug {
            self.logging.level = "debug".to_string();
        }
        if let Some(ref format) = cli.log_format {
            self.logging.format = format.clone();
        }
    }

    /// Checks everything that can be checked without network access.
    pub fn validate(&self) -> ClientResult<()> {
        self.logging.tracing_config(TracingConfig::default())?;
        self.server.to_sse_config().validate()?;

        if self.google.loopback_port_start > self.google.loopback_port_end {
            return Err(ClientError::config(
                "[google] loopback_port_start must not exceed loopback_port_end",
            ));
        }
        if self.google.timeout_secs == 0 {
            return Err(ClientError::config("[google] timeout_secs must be positive"));
        }
        if self.retry.multiplier < 1.0 {
            return Err(ClientError::config("[retry] multiplier must be at least 1.0"));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ClientError::config(
                "[retry] initial_backoff_ms must not exceed max_backoff_ms",
            ));
        }
        Ok(())
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gcal-mcp")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tracing::Level;

    #[test]
    fn empty_file_gives_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert!(config.google.interactive_consent);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.retry.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
[google]
interactive_consent = false
token_file = "/tmp/token.json"

[server]
port = 9100

[logging]
format = "json"
"#,
        )
        .unwrap();

        assert!(!config.google.interactive_consent);
        assert_eq!(config.google.token_path(), PathBuf::from("/tmp/token.json"));
        assert_eq!(config.google.timeout_secs, 30);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.to_sse_config().bind_addr(), "127.0.0.1:9100");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn load_missing_explicit_path_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let result = ClientConfig::load(Some(&tmp.path().join("nope.toml")));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn load_rejects_bad_toml() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = \"high\"\n").unwrap();
        assert!(ClientConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn cli_overrides_file() {
        let mut config = ClientConfig::default();
        let cli = Cli::parse_from([
            "gcal-mcp",
            "--debug",
            "--token-file",
            "/run/token.json",
            "--headless",
            "stdio",
        ]);
        config.apply_cli(&cli);

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.google.token_path(), PathBuf::from("/run/token.json"));
        assert!(!config.google.interactive_consent);
    }

    #[test]
    fn validate_catches_bad_values() {
        let mut config = ClientConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.server.max_sessions = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.google.loopback_port_start = 9000;
        config.google.loopback_port_end = 8000;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.retry.multiplier = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn tracing_config_from_logging() {
        let logging = LoggingSettings {
            level: "WARN".to_string(),
            format: "pretty".to_string(),
        };
        let tracing = logging.tracing_config(TracingConfig::stdio()).unwrap();
        assert_eq!(tracing.default_level, Level::WARN);
        assert_eq!(tracing.output_format, TracingOutputFormat::Pretty);
        assert!(!tracing.ansi);
    }

    mod credentials {
        use super::*;

        #[test]
        fn inline_credentials_win() {
            let settings = GoogleSettings {
                client_id: Some("inline.apps.googleusercontent.com".to_string()),
                client_secret: Some("inline-secret".to_string()),
                credentials_file: Some(PathBuf::from("/does/not/exist.json")),
                ..Default::default()
            };
            let creds = settings.resolve_credentials().unwrap();
            assert_eq!(creds.client_id, "inline.apps.googleusercontent.com");
        }

        #[test]
        fn half_inline_credentials_fail() {
            let settings = GoogleSettings {
                client_id: Some("inline.apps.googleusercontent.com".to_string()),
                ..Default::default()
            };
            assert!(settings.resolve_credentials().is_err());
        }

        #[test]
        fn credentials_file_is_read() {
            let tmp = tempfile::tempdir().unwrap();
            let path = tmp.path().join("credentials.json");
            std::fs::write(
                &path,
                r#"{"installed": {"client_id": "file.apps.googleusercontent.com", "client_secret": "s"}}"#,
            )
            .unwrap();

            let settings = GoogleSettings {
                credentials_file: Some(path),
                token_file: Some(tmp.path().join("token.json")),
                ..Default::default()
            };
            let config = settings.to_provider_config(&RetrySettings::default()).unwrap();
            assert_eq!(config.credentials.client_id, "file.apps.googleusercontent.com");
            assert_eq!(config.token_path, tmp.path().join("token.json"));
            assert_eq!(config.loopback_port_range, (8080, 8090));
            assert_eq!(config.retry.max_retries, 3);
        }

        #[test]
        fn missing_credentials_file_is_a_configuration_error() {
            let tmp = tempfile::tempdir().unwrap();
            let settings = GoogleSettings {
                credentials_file: Some(tmp.path().join("missing.json")),
                ..Default::default()
            };
            let err = settings
                .to_provider_config(&RetrySettings::default())
                .unwrap_err();
            assert_eq!(
                err.code(),
                gcal_mcp_providers::ProviderErrorCode::ConfigurationError
            );
        }
    }
}
