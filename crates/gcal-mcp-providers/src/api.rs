//! The [`CalendarApi`] trait, the seam between tool handlers and Google.
//!
//! Handlers only ever talk to this trait, so they can be exercised against
//! an in-memory fake while the real implementation speaks HTTP.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use gcal_mcp_core::{Calendar, Event, FreeBusyQuery, FreeBusyResponse};
use serde_json::Value;

use crate::error::ProviderResult;

/// A boxed future that is Send.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Largest page size the events endpoint accepts.
pub const MAX_EVENTS_PER_PAGE: u32 = 2500;

/// Parameters for listing events of one calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEventsParams {
    pub calendar_id: String,
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
    /// Upper bound on the number of events returned across all pages.
    pub max_results: u32,
    /// Expand recurring events into instances.
    pub single_events: bool,
    /// `startTime` or `updated`.
    pub order_by: Option<String>,
}

impl ListEventsParams {
    /// Creates parameters with expanded recurrences ordered by start time.
    pub fn new(
        calendar_id: impl Into<String>,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            time_min,
            time_max,
            max_results: 250,
            single_events: true,
            order_by: Some("startTime".to_string()),
        }
    }

    /// Builder: set the result cap.
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    /// Builder: set recurrence expansion and ordering.
    pub fn with_ordering(mut self, single_events: bool, order_by: Option<String>) -> Self {
        self.single_events = single_events;
        self.order_by = order_by;
        self
    }
}

/// Query flags for insert/patch/delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// `all`, `externalOnly` or `none`.
    pub send_updates: Option<String>,
    /// Set to 1 when the body carries `conferenceData`.
    pub conference_data_version: Option<u8>,
    /// Required when the body carries `attachments`.
    pub supports_attachments: bool,
}

impl WriteOptions {
    pub fn with_send_updates(mut self, send_updates: impl Into<String>) -> Self {
        self.send_updates = Some(send_updates.into());
        self
    }

    /// Derives the flags an event body needs.
    pub fn for_event(event: &Event) -> Self {
        Self {
            send_updates: None,
            conference_data_version: event.conference_data.as_ref().map(|_| 1),
            supports_attachments: !event.attachments.is_empty(),
        }
    }

    /// Derives the flags a partial body needs.
    pub fn for_patch(patch: &Value) -> Self {
        Self {
            send_updates: None,
            conference_data_version: patch.get("conferenceData").map(|_| 1),
            supports_attachments: patch.get("attachments").is_some(),
        }
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(ref send_updates) = self.send_updates {
            pairs.push(("sendUpdates", send_updates.clone()));
        }
        if let Some(version) = self.conference_data_version {
            pairs.push(("conferenceDataVersion", version.to_string()));
        }
        if self.supports_attachments {
            pairs.push(("supportsAttachments", "true".to_string()));
        }
        pairs
    }
}

/// Operations the tools need from a calendar backend.
///
/// Errors carry a [`ProviderErrorCode`](crate::ProviderErrorCode); a
/// `NotFound` means the calendar or the event is missing depending on the
/// operation.
pub trait CalendarApi: Send + Sync {
    /// Lists events overlapping `[time_min, time_max)`, following pagination
    /// until `max_results` events were collected.
    fn list_events<'a>(&'a self, params: &'a ListEventsParams)
    -> BoxFuture<'a, ProviderResult<Vec<Event>>>;

    /// Fetches one event.
    fn get_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Event>>;

    /// Creates an event and returns it as stored.
    fn insert_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: &'a Event,
        options: &'a WriteOptions,
    ) -> BoxFuture<'a, ProviderResult<Event>>;

    /// Applies a partial update and returns the updated event.
    fn patch_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
        patch: &'a Value,
        options: &'a WriteOptions,
    ) -> BoxFuture<'a, ProviderResult<Event>>;

    /// Deletes an event.
    fn delete_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
        options: &'a WriteOptions,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    /// Lists the calendars in the user's calendar list.
    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<Calendar>>>;

    /// Runs a free/busy query.
    fn query_free_busy<'a>(
        &'a self,
        query: &'a FreeBusyQuery,
    ) -> BoxFuture<'a, ProviderResult<FreeBusyResponse>>;

    /// Returns the account's IANA timezone setting.
    fn get_timezone_setting(&self) -> BoxFuture<'_, ProviderResult<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use gcal_mcp_core::{Attachment, ConferenceData};
    use serde_json::json;

    #[test]
    fn write_options_for_plain_event() {
        let options = WriteOptions::for_event(&Event::default()).with_send_updates("none");
        assert_eq!(options.query_pairs(), vec![("sendUpdates", "none".to_string())]);
    }

    #[test]
    fn write_options_for_conference_and_attachments() {
        let event = Event {
            conference_data: Some(ConferenceData::default()),
            attachments: vec![Attachment {
                file_url: "https://drive.google.com/file/d/1".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let pairs = WriteOptions::for_event(&event).query_pairs();
        assert!(pairs.contains(&("conferenceDataVersion", "1".to_string())));
        assert!(pairs.contains(&("supportsAttachments", "true".to_string())));
    }

    #[test]
    fn write_options_for_patch() {
        let options = WriteOptions::for_patch(&json!({"summary": "x"}));
        assert!(options.query_pairs().is_empty());

        let options = WriteOptions::for_patch(&json!({"conferenceData": {}}));
        assert_eq!(options.conference_data_version, Some(1));
    }

    #[test]
    fn list_params_defaults() {
        let now = Utc::now();
        let params = ListEventsParams::new("primary", now, now).with_max_results(10);
        assert!(params.single_events);
        assert_eq!(params.order_by.as_deref(), Some("startTime"));
        assert_eq!(params.max_results, 10);
    }
}
