//! Google Calendar backend built on first use.
//!
//! The server starts even when no OAuth client is configured yet. The
//! credential provider and HTTP client are created by the first tool call,
//! and a failed attempt is retried by the next one, so fixing the
//! credentials file does not require a restart.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::info;

use gcal_mcp_core::{Calendar, Event, FreeBusyQuery, FreeBusyResponse};
use gcal_mcp_providers::google::{
    BrowserConsent, ConsentObtainer, CredentialProvider, GoogleCalendarClient, GoogleConfig,
    NoConsent,
};
use gcal_mcp_providers::{BoxFuture, CalendarApi, ListEventsParams, ProviderResult, WriteOptions};

use crate::config::ClientConfig;

pub struct LazyGoogleCalendar {
    config: ClientConfig,
    client: OnceCell<GoogleCalendarClient>,
}

impl LazyGoogleCalendar {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> ProviderResult<&GoogleCalendarClient> {
        self.client
            .get_or_try_init(|| async {
                let google = self
                    .config
                    .google
                    .to_provider_config(&self.config.retry)?;
                let tokens = credential_provider(&google, self.config.google.interactive_consent)?;
                info!(
                    token_path = %tokens.token_path().display(),
                    "Google Calendar client ready"
                );
                GoogleCalendarClient::new(&google, tokens)
            })
            .await
    }
}

/// Builds the credential provider with the consent strategy for this run.
pub fn credential_provider(
    config: &GoogleConfig,
    interactive: bool,
) -> ProviderResult<Arc<CredentialProvider>> {
    let consent: Arc<dyn ConsentObtainer> = if interactive {
        Arc::new(BrowserConsent::new(config.loopback_port_range))
    } else {
        Arc::new(NoConsent)
    };
    Ok(Arc::new(CredentialProvider::new(config, consent)?))
}

impl CalendarApi for LazyGoogleCalendar {
    fn list_events<'a>(
        &'a self,
        params: &'a ListEventsParams,
    ) -> BoxFuture<'a, ProviderResult<Vec<Event>>> {
        Box::pin(async move { self.client().await?.list_events(params).await })
    }

    fn get_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Event>> {
        Box::pin(async move { self.client().await?.get_event(calendar_id, event_id).await })
    }

    fn insert_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: &'a Event,
        options: &'a WriteOptions,
    ) -> BoxFuture<'a, ProviderResult<Event>> {
        Box::pin(async move {
            self.client()
                .await?
                .insert_event(calendar_id, event, options)
                .await
        })
    }

    fn patch_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
        patch: &'a Value,
        options: &'a WriteOptions,
    ) -> BoxFuture<'a, ProviderResult<Event>> {
        Box::pin(async move {
            self.client()
                .await?
                .patch_event(calendar_id, event_id, patch, options)
                .await
        })
    }

    fn delete_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
        options: &'a WriteOptions,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.client()
                .await?
                .delete_event(calendar_id, event_id, options)
                .await
        })
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<Calendar>>> {
        Box::pin(async move { self.client().await?.list_calendars().await })
    }

    fn query_free_busy<'a>(
        &'a self,
        query: &'a FreeBusyQuery,
    ) -> BoxFuture<'a, ProviderResult<FreeBusyResponse>> {
        Box::pin(async move { self.client().await?.query_free_busy(query).await })
    }

    fn get_timezone_setting(&self) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(async move { self.client().await?.get_timezone_setting().await })
    }
}
