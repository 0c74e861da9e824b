//! The credential provider: hands out valid access tokens.
//!
//! Concurrent callers that find an expired token serialize on a single
//! async mutex, so one refresh (or one consent flow) happens and the rest
//! reuse its result.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::BoxFuture;
use crate::error::{ProviderErrorCode, ProviderResult};

use super::config::GoogleConfig;
use super::consent::ConsentObtainer;
use super::oauth::OAuthClient;
use super::tokens::{TokenInfo, TokenStorage};

/// Anything that can produce a bearer token for API calls.
pub trait AccessTokenSource: Send + Sync {
    /// Returns a currently valid access token.
    fn access_token(&self) -> BoxFuture<'_, ProviderResult<String>>;

    /// Forgets the current access token after the API rejected it.
    fn invalidate(&self);
}

/// Loads, refreshes and persists Google OAuth tokens.
pub struct CredentialProvider {
    oauth: OAuthClient,
    storage: TokenStorage,
    scopes: Vec<String>,
    consent: Arc<dyn ConsentObtainer>,
    refresh_guard: Mutex<()>,
}

impl std::fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("token_path", &self.storage.path())
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

impl CredentialProvider {
    /// Creates a provider and loads any stored token.
    ///
    /// An unreadable token file is logged and treated as absent; the next
    /// consent overwrites it.
    pub fn new(config: &GoogleConfig, consent: Arc<dyn ConsentObtainer>) -> ProviderResult<Self> {
        config.validate()?;

        let storage = TokenStorage::new(&config.token_path);
        if let Err(e) = storage.load() {
            warn!(
                path = %config.token_path.display(),
                error = %e,
                "ignoring unreadable token file"
            );
        }

        Ok(Self {
            oauth: OAuthClient::new(config)?,
            storage,
            scopes: config.scopes.clone(),
            consent,
            refresh_guard: Mutex::new(()),
        })
    }

    /// Returns the token file location.
    pub fn token_path(&self) -> &Path {
        self.storage.path()
    }

    fn usable_token(&self) -> Option<String> {
        self.storage
            .get()
            .filter(|t| !t.is_expired() && t.has_scopes(&self.scopes))
            .map(|t| t.access_token)
    }

    /// Returns a valid access token, refreshing or obtaining consent first
    /// if necessary.
    pub async fn access_token(&self) -> ProviderResult<String> {
        if let Some(token) = self.usable_token() {
            return Ok(token);
        }

        let _guard = self.refresh_guard.lock().await;

        // another caller may have refreshed while we waited
        if let Some(token) = self.usable_token() {
            return Ok(token);
        }

        match self.storage.get() {
            Some(tokens) if tokens.has_scopes(&self.scopes) && tokens.refresh_token.is_some() => {
                self.refresh(tokens).await
            }
            Some(_) => {
                info!("stored token cannot be refreshed for the required scopes");
                self.obtain_consent().await.map(|t| t.access_token)
            }
            None => self.obtain_consent().await.map(|t| t.access_token),
        }
    }

    /// Runs the consent flow unless a usable or refreshable token exists.
    ///
    /// With `force`, existing tokens are discarded first.
    pub async fn authenticate(&self, force: bool) -> ProviderResult<TokenInfo> {
        if force {
            self.storage.clear()?;
        } else {
            self.access_token().await?;
            if let Some(tokens) = self.storage.get() {
                return Ok(tokens);
            }
        }

        let _guard = self.refresh_guard.lock().await;
        self.obtain_consent().await
    }

    async fn refresh(&self, mut tokens: TokenInfo) -> ProviderResult<String> {
        let Some(refresh_token) = tokens.refresh_token.clone() else {
            return self.obtain_consent().await.map(|t| t.access_token);
        };

        debug!("refreshing expired access token");

        let refreshed = self.oauth.refresh_token(&refresh_token).await.map_err(|e| {
            if e.code() == ProviderErrorCode::AuthenticationFailed {
                e.with_remediation(format!(
                    "the refresh token was rejected; delete {} and run `gcal-mcp auth` to grant access again",
                    self.storage.path().display()
                ))
            } else {
                e
            }
        })?;

        tokens.apply_refresh(
            refreshed.access_token,
            refreshed.expires_in,
            refreshed.refresh_token,
        );
        let access_token = tokens.access_token.clone();
        self.storage.set(tokens)?;
        Ok(access_token)
    }

    async fn obtain_consent(&self) -> ProviderResult<TokenInfo> {
        let tokens = self.consent.obtain(&self.oauth, &self.scopes).await?;
        self.storage.set(tokens.clone())?;
        info!(path = %self.storage.path().display(), "stored new OAuth tokens");
        Ok(tokens)
    }
}

impl AccessTokenSource for CredentialProvider {
    fn access_token(&self) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(CredentialProvider::access_token(self))
    }

    fn invalidate(&self) {
        self.storage.invalidate();
    }
}
