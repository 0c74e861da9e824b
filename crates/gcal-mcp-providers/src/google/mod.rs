//! Google Calendar backend.
//!
//! - [`GoogleConfig`] / [`OAuthCredentials`]: client secrets, paths, endpoints
//! - [`OAuthClient`]: PKCE consent flow with a loopback redirect, token refresh
//! - [`TokenStorage`]: the on-disk token file (written atomically, mode 0600)
//! - [`CredentialProvider`]: hands out valid access tokens, refreshing at
//!   most once at a time
//! - [`GoogleCalendarClient`]: the [`CalendarApi`](crate::CalendarApi)
//!   implementation over Calendar API v3
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gcal_mcp_providers::google::{
//!     BrowserConsent, CredentialProvider, GoogleCalendarClient, GoogleConfig, OAuthCredentials,
//! };
//!
//! let credentials = OAuthCredentials::from_file(GoogleConfig::default_credentials_path())?;
//! let config = GoogleConfig::new(credentials);
//! let consent = Arc::new(BrowserConsent::new(config.loopback_port_range));
//! let tokens = Arc::new(CredentialProvider::new(&config, consent)?);
//! let client = GoogleCalendarClient::new(&config, tokens)?;
//!
//! let calendars = client.list_calendars().await?;
//! ```

mod client;
mod config;
mod consent;
mod credentials;
mod oauth;
mod tokens;

pub use client::GoogleCalendarClient;
pub use config::{
    CALENDAR_API_BASE, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, GoogleConfig, OAuthCredentials,
};
pub use consent::{BrowserConsent, ConsentObtainer, NoConsent};
pub use credentials::{AccessTokenSource, CredentialProvider};
pub use oauth::{OAuthClient, PkceFlow, RefreshedToken};
pub use tokens::{TokenInfo, TokenStorage};
