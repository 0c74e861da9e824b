//! Strategies for obtaining user consent when no usable token exists.

use tracing::info;

use crate::api::BoxFuture;
use crate::error::{ProviderError, ProviderResult};

use super::oauth::OAuthClient;
use super::tokens::TokenInfo;

/// Obtains a fresh token set from the user.
///
/// Called by [`CredentialProvider`](super::CredentialProvider) when there is
/// no stored token, the stored token lacks the required scopes, or there is
/// no refresh token to fall back on.
pub trait ConsentObtainer: Send + Sync {
    fn obtain<'a>(
        &'a self,
        oauth: &'a OAuthClient,
        scopes: &'a [String],
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>>;
}

/// Interactive consent through the browser and a loopback redirect.
#[derive(Debug, Clone)]
pub struct BrowserConsent {
    port_range: (u16, u16),
}

impl BrowserConsent {
    pub fn new(port_range: (u16, u16)) -> Self {
        Self { port_range }
    }
}

impl ConsentObtainer for BrowserConsent {
    fn obtain<'a>(
        &'a self,
        oauth: &'a OAuthClient,
        scopes: &'a [String],
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        Box::pin(async move {
            info!("no usable token, asking for consent in the browser");
            oauth.authorize(scopes, self.port_range).await
        })
    }
}

/// Headless mode: consent is never attempted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConsent;

impl ConsentObtainer for NoConsent {
    fn obtain<'a>(
        &'a self,
        _oauth: &'a OAuthClient,
        _scopes: &'a [String],
    ) -> BoxFuture<'a, ProviderResult<TokenInfo>> {
        Box::pin(async {
            Err(ProviderError::authentication(
                "no valid Google token and interactive consent is disabled",
            )
            .with_remediation(
                "run `gcal-mcp auth` on a machine with a browser, then restart the server",
            ))
        })
    }
}
