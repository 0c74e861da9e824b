//! OAuth 2.0 PKCE flow for Google APIs.
//!
//! Implements the Authorization Code flow with PKCE (Proof Key for Code
//! Exchange), using a loopback redirect for desktop applications.
//!
//! # Flow Overview
//!
//! 1. Generate a cryptographic code verifier and its SHA-256 challenge
//! 2. Start a local HTTP listener on the first free port of a range
//! 3. Open the user's browser to Google's consent page
//! 4. Google redirects back to the listener with the authorization code
//! 5. Exchange the code (with verifier) for access and refresh tokens

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::error::{ProviderError, ProviderResult};

use super::config::{GoogleConfig, OAuthCredentials};
use super::tokens::TokenInfo;

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// Timeout for waiting for the OAuth callback.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Outcome of a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: Option<i64>,
    /// Present only when Google rotated the refresh token.
    pub refresh_token: Option<String>,
}

/// OAuth client for Google APIs.
///
/// Handles the OAuth 2.0 PKCE flow for obtaining and refreshing tokens.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
    auth_url: String,
    token_url: String,
}

impl OAuthClient {
    /// Creates a new OAuth client from the Google configuration.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {e}")).with_source(e)
            })?;

        Ok(Self {
            credentials: config.credentials.clone(),
            http_client,
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
        })
    }

    /// Runs the interactive consent flow and returns the obtained tokens.
    ///
    /// Binds a loopback listener in `port_range`, opens the browser (the URL
    /// is also printed to stderr), waits up to five minutes for the
    /// redirect and exchanges the code.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
    ) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();

        let (listener, port) = Self::bind_loopback_server(port_range).await?;
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);

        let auth_url =
            pkce.build_auth_url(&self.auth_url, &self.credentials.client_id, &redirect_uri, scopes);

        info!("starting OAuth consent flow, opening browser");

        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
        }
        eprintln!(
            "\nIf your browser did not open, visit this URL to authorize gcal-mcp:\n\n{}\n",
            auth_url
        );

        let (code, received_state) = Self::wait_for_callback(listener, CALLBACK_TIMEOUT).await?;

        if received_state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch - possible CSRF attack",
            ));
        }

        info!("received authorization code, exchanging for tokens");

        self.exchange_code(&code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// A rejected refresh token (`invalid_grant`, revoked or expired) is an
    /// authentication error; transport failures are network errors so the
    /// caller may retry.
    pub async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<RefreshedToken> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let token_response = self.post_token_form(&params, "token refresh").await?;

        info!("refreshed access token");
        Ok(RefreshedToken {
            access_token: token_response.access_token,
            expires_in: token_response.expires_in,
            refresh_token: token_response.refresh_token,
        })
    }

    /// Exchanges an authorization code for tokens.
    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let token_response = self.post_token_form(&params, "token exchange").await?;
        if token_response.refresh_token.is_none() {
            warn!("token endpoint returned no refresh token; re-consent will be needed on expiry");
        }

        let granted = token_response
            .scope
            .map(|s| s.split_whitespace().map(String::from).collect())
            .unwrap_or_else(|| scopes.to_vec());

        info!("obtained OAuth tokens");
        Ok(TokenInfo::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
            granted,
        ))
    }

    async fn post_token_form(
        &self,
        params: &[(&str, &str)],
        operation: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if status.is_server_error() {
            return Err(ProviderError::server(format!(
                "{operation} failed ({status})"
            )));
        }

        if !status.is_success() {
            // body is an OAuth error document, never token material
            let reason = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| match e.error_description {
                    Some(desc) => format!("{}: {}", e.error, desc),
                    None => e.error,
                })
                .unwrap_or_else(|_| status.to_string());
            return Err(ProviderError::authentication(format!(
                "{operation} rejected ({reason})"
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
        })
    }

    /// Tries to bind a TCP listener on an available port in the given range.
    async fn bind_loopback_server(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
        for port in port_range.0..=port_range.1 {
            let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await else {
                continue;
            };
            // port 0 asks the OS for any free port
            let port = listener.local_addr().map(|a| a.port()).unwrap_or(port);
            debug!(port, "bound loopback server");
            return Ok((listener, port));
        }
        Err(ProviderError::configuration(format!(
            "no available port in range {}-{}",
            port_range.0, port_range.1
        )))
    }

    /// Waits up to `timeout` for the OAuth callback and extracts the
    /// authorization code. The listener is closed when this returns.
    async fn wait_for_callback(
        listener: TcpListener,
        timeout: Duration,
    ) -> ProviderResult<(String, String)> {
        match tokio::time::timeout(timeout, Self::accept_callback(&listener)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::authentication(
                "timed out waiting for the OAuth consent redirect",
            )
            .with_remediation("run `gcal-mcp auth` and complete the consent in the browser")),
        }
    }

    async fn accept_callback(listener: &TcpListener) -> ProviderResult<(String, String)> {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    if let Some(result) = Self::handle_callback(stream).await {
                        return result;
                    }
                }
                Err(e) => {
                    error!("failed to accept connection: {}", e);
                }
            }
        }
    }

    /// Handles an incoming HTTP request on the callback server.
    ///
    /// Returns `None` for requests that are not the redirect, such as a
    /// browser asking for `/favicon.ico`.
    async fn handle_callback(stream: TcpStream) -> Option<ProviderResult<(String, String)>> {
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();

        if reader.read_line(&mut request_line).await.is_err() {
            return None;
        }

        // GET /callback?code=...&state=... HTTP/1.1
        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() < 2 || parts[0] != "GET" {
            return None;
        }

        let path = parts[1];
        if !path.starts_with("/callback") {
            return None;
        }

        let (code, state, error) = parse_callback_query(path);

        let response = if error.is_some() || code.is_none() {
            "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
            <html><body><h1>Authorization Failed</h1>\
            <p>You can close this window.</p></body></html>"
        } else {
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
            <html><body><h1>gcal-mcp is authorized</h1>\
            <p>You can close this window.</p></body></html>"
        };

        let stream = reader.get_mut();
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.flush().await;

        if let Some(error) = error {
            return Some(Err(ProviderError::authentication(format!(
                "authorization denied: {}",
                error
            ))));
        }

        match (code, state) {
            (Some(c), Some(s)) => Some(Ok((c, s))),
            (Some(c), None) => Some(Ok((c, String::new()))),
            _ => Some(Err(ProviderError::authentication(
                "missing authorization code in callback",
            ))),
        }
    }
}

/// Extracts `code`, `state` and `error` from a callback request path.
fn parse_callback_query(path: &str) -> (Option<String>, Option<String>, Option<String>) {
    let query = path.split_once('?').map(|(_, q)| q).unwrap_or("");

    let mut code = None;
    let mut state = None;
    let mut error = None;

    for param in query.split('&') {
        if let Some((key, value)) = param.split_once('=') {
            let value = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_default();
            match key {
                "code" => code = Some(value),
                "state" => state = Some(value),
                "error" => error = Some(value),
                _ => {}
            }
        }
    }

    (code, state, error)
}

/// PKCE flow state and utilities.
///
/// Implements RFC 7636 (Proof Key for Code Exchange).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
    /// Random state for CSRF protection.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = Self::generate_verifier();
        let challenge = Self::compute_challenge(&verifier);
        let state = Self::generate_state();

        Self {
            verifier,
            challenge,
            state,
        }
    }

    /// Generates a cryptographically random code verifier.
    fn generate_verifier() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..CODE_VERIFIER_LENGTH)
            .map(|_| rng.random())
            .collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    /// Computes the SHA-256 challenge for a code verifier.
    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    /// Generates a random state string for CSRF protection.
    fn generate_state() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..16).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    /// Builds the Google OAuth authorization URL.
    ///
    /// `access_type=offline` with `prompt=consent` makes Google return a
    /// refresh token on every consent.
    pub fn build_auth_url(
        &self,
        auth_endpoint: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> String {
        let scope = scopes.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&state={}&\
            access_type=offline&prompt=consent",
            auth_endpoint,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(&self.challenge),
            urlencoding::encode(&self.state),
        )
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Response from Google's token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    /// Space separated granted scopes.
    #[serde(default)]
    scope: Option<String>,
}

/// Error document from Google's token endpoint.
#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}
