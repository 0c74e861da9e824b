//! Google Calendar API v3 client.
//!
//! Every request is authorized through an [`AccessTokenSource`], wrapped in
//! the retry policy, and has its failures classified by
//! [`ProviderError::from_status`]. A 401 invalidates the cached token and
//! replays the request once with a fresh one.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use gcal_mcp_core::{Calendar, Event, FreeBusyQuery, FreeBusyResponse};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::api::{BoxFuture, CalendarApi, ListEventsParams, MAX_EVENTS_PER_PAGE, WriteOptions};
use crate::error::{ProviderError, ProviderResult};
use crate::retry::{RetryConfig, with_retry};

use super::config::GoogleConfig;
use super::credentials::AccessTokenSource;

/// HTTP implementation of [`CalendarApi`].
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    tokens: Arc<dyn AccessTokenSource>,
    base_url: String,
    retry: RetryConfig,
}

impl std::fmt::Debug for GoogleCalendarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCalendarClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<Event>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<Calendar>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SettingResponse {
    value: String,
}

fn api_time(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl GoogleCalendarClient {
    /// Creates a client using the API base URL, timeout and retry policy
    /// from `config`.
    pub fn new(config: &GoogleConfig, tokens: Arc<dyn AccessTokenSource>) -> ProviderResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {e}")).with_source(e)
            })?;

        Ok(Self {
            http,
            tokens,
            base_url: config.api_base_url.clone(),
            retry: config.retry.clone(),
        })
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id)
        )
    }

    /// Sends one request with a bearer token. On a 401 the token is
    /// invalidated and the request replayed once.
    async fn send_authorized<F>(&self, build: &F) -> ProviderResult<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder + Sync,
    {
        let mut replayed = false;
        loop {
            let token = self.tokens.access_token().await?;
            let response = build(&self.http)
                .bearer_auth(&token)
                .send()
                .await
                .map_err(ProviderError::from_reqwest)?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }
            if status == StatusCode::UNAUTHORIZED && !replayed {
                debug!("access token rejected, retrying with a fresh one");
                self.tokens.invalidate();
                replayed = true;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }
    }

    async fn request_json<T, F>(&self, operation: &str, build: F) -> ProviderResult<T>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder + Sync,
    {
        let build = &build;
        with_retry(&self.retry, operation, move || async move {
            let response = self.send_authorized(build).await?;
            let body = response.text().await.map_err(ProviderError::from_reqwest)?;
            serde_json::from_str(&body).map_err(|e| {
                ProviderError::invalid_response(format!(
                    "{operation}: failed to parse response: {e}"
                ))
                .with_source(e)
            })
        })
        .await
    }

    async fn request_empty<F>(&self, operation: &str, build: F) -> ProviderResult<()>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder + Sync,
    {
        let build = &build;
        with_retry(&self.retry, operation, move || async move {
            self.send_authorized(build).await.map(|_| ())
        })
        .await
    }

    /// Lists events, following `nextPageToken` until `max_results` events
    /// were collected or the listing is exhausted.
    pub async fn list_events(&self, params: &ListEventsParams) -> ProviderResult<Vec<Event>> {
        let url = self.events_url(&params.calendar_id);
        let mut events: Vec<Event> = Vec::new();
        let mut page_token: Option<String> = None;

        while (events.len() as u32) < params.max_results {
            let remaining = params.max_results - events.len() as u32;
            let mut query = vec![
                ("timeMin", api_time(params.time_min)),
                ("timeMax", api_time(params.time_max)),
                ("singleEvents", params.single_events.to_string()),
                ("maxResults", remaining.min(MAX_EVENTS_PER_PAGE).to_string()),
            ];
            if let Some(ref order_by) = params.order_by {
                query.push(("orderBy", order_by.clone()));
            }
            if let Some(ref token) = page_token {
                query.push(("pageToken", token.clone()));
            }

            let page: EventListResponse = self
                .request_json("list events", |http| http.get(&url).query(&query))
                .await?;

            events.extend(
                page.items
                    .into_iter()
                    .map(|e| e.with_calendar_id(params.calendar_id.clone())),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        events.truncate(params.max_results as usize);
        debug!(
            calendar = %params.calendar_id,
            count = events.len(),
            "listed events"
        );
        Ok(events)
    }

    pub async fn get_event(&self, calendar_id: &str, event_id: &str) -> ProviderResult<Event> {
        let url = self.event_url(calendar_id, event_id);
        let event: Event = self.request_json("get event", |http| http.get(&url)).await?;
        Ok(event.with_calendar_id(calendar_id))
    }

    pub async fn insert_event(
        &self,
        calendar_id: &str,
        event: &Event,
        options: &WriteOptions,
    ) -> ProviderResult<Event> {
        let url = self.events_url(calendar_id);
        let query = options.query_pairs();
        let created: Event = self
            .request_json("insert event", |http| {
                http.post(&url).query(&query).json(event)
            })
            .await?;
        Ok(created.with_calendar_id(calendar_id))
    }

    pub async fn patch_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        patch: &Value,
        options: &WriteOptions,
    ) -> ProviderResult<Event> {
        let url = self.event_url(calendar_id, event_id);
        let query = options.query_pairs();
        let updated: Event = self
            .request_json("patch event", |http| {
                http.patch(&url).query(&query).json(patch)
            })
            .await?;
        Ok(updated.with_calendar_id(calendar_id))
    }

    pub async fn delete_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        options: &WriteOptions,
    ) -> ProviderResult<()> {
        let url = self.event_url(calendar_id, event_id);
        let query = options.query_pairs();
        self.request_empty("delete event", |http| http.delete(&url).query(&query))
            .await
    }

    /// Lists every calendar in the user's calendar list.
    pub async fn list_calendars(&self) -> ProviderResult<Vec<Calendar>> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let query: Vec<(&str, String)> = page_token
                .iter()
                .map(|t| ("pageToken", t.clone()))
                .collect();
            let page: CalendarListResponse = self
                .request_json("list calendars", |http| http.get(&url).query(&query))
                .await?;
            calendars.extend(page.items);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(calendars)
    }

    pub async fn query_free_busy(&self, query: &FreeBusyQuery) -> ProviderResult<FreeBusyResponse> {
        let url = format!("{}/freeBusy", self.base_url);
        self.request_json("query free/busy", |http| http.post(&url).json(query))
            .await
    }

    /// Reads the account-level `timezone` setting.
    pub async fn get_timezone_setting(&self) -> ProviderResult<String> {
        let url = format!("{}/users/me/settings/timezone", self.base_url);
        let setting: SettingResponse = self
            .request_json("get timezone setting", |http| http.get(&url))
            .await?;
        Ok(setting.value)
    }
}

impl CalendarApi for GoogleCalendarClient {
    fn list_events<'a>(
        &'a self,
        params: &'a ListEventsParams,
    ) -> BoxFuture<'a, ProviderResult<Vec<Event>>> {
        Box::pin(GoogleCalendarClient::list_events(self, params))
    }

    fn get_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Event>> {
        Box::pin(GoogleCalendarClient::get_event(self, calendar_id, event_id))
    }

    fn insert_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: &'a Event,
        options: &'a WriteOptions,
    ) -> BoxFuture<'a, ProviderResult<Event>> {
        Box::pin(GoogleCalendarClient::insert_event(
            self,
            calendar_id,
            event,
            options,
        ))
    }

    fn patch_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
        patch: &'a Value,
        options: &'a WriteOptions,
    ) -> BoxFuture<'a, ProviderResult<Event>> {
        Box::pin(GoogleCalendarClient::patch_event(
            self,
            calendar_id,
            event_id,
            patch,
            options,
        ))
    }

    fn delete_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
        options: &'a WriteOptions,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(GoogleCalendarClient::delete_event(
            self,
            calendar_id,
            event_id,
            options,
        ))
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<Calendar>>> {
        Box::pin(GoogleCalendarClient::list_calendars(self))
    }

    fn query_free_busy<'a>(
        &'a self,
        query: &'a FreeBusyQuery,
    ) -> BoxFuture<'a, ProviderResult<FreeBusyResponse>> {
        Box::pin(GoogleCalendarClient::query_free_busy(self, query))
    }

    fn get_timezone_setting(&self) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(GoogleCalendarClient::get_timezone_setting(self))
    }
}
