//! Calendar data transfer types.
//!
//! These mirror the Google Calendar v3 resource shapes closely enough to be
//! sent and received as-is. Fields this crate does not model are kept in
//! [`Event::extra`] so that an event survives a read/modify/write cycle.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::time::{TimeError, TimeRange, parse_datetime, parse_timezone};

/// A calendar event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// `confirmed`, `tentative` or `cancelled`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,

    /// RRULE, EXRULE, RDATE and EXDATE lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recurrence: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_event_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders: Option<Reminders>,

    /// `default`, `public`, `private` or `confidential`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,

    /// `opaque` (busy) or `transparent` (free).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparency: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conference_data: Option<ConferenceData>,

    /// Calendar the event was read from. Not part of the API resource.
    #[serde(skip)]
    pub calendar_id: Option<String>,

    /// Any fields not modelled above (organizer, creator, etag, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    /// Sets the calendar the event belongs to.
    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = Some(calendar_id.into());
        self
    }

    /// Returns true if the event has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }

    /// Returns true if the event is all-day (date rather than dateTime).
    pub fn is_all_day(&self) -> bool {
        self.start.as_ref().is_some_and(|s| s.date.is_some() && s.date_time.is_none())
    }

    /// Computes the interval the event occupies.
    ///
    /// All-day events span local midnight of the start date up to local
    /// midnight of the (exclusive) end date. Returns `None` for events
    /// without usable times.
    pub fn time_range(&self, default_tz: Tz) -> Option<TimeRange> {
        let start = self.start.as_ref()?.to_utc(default_tz).ok()?;
        let end = self.end.as_ref()?.to_utc(default_tz).ok()?;
        TimeRange::new(start, end).ok()
    }
}

/// The start or end of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    /// RFC3339 instant for timed events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,

    /// `YYYY-MM-DD` for all-day events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// IANA timezone the time is expressed in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    /// Creates a timed value from an instant, tagged with its timezone name.
    pub fn from_datetime<T>(dt: &DateTime<T>, time_zone: impl Into<String>) -> Self
    where
        T: TimeZone,
        T::Offset: std::fmt::Display,
    {
        Self {
            date_time: Some(crate::time::format_api_datetime(dt)),
            date: None,
            time_zone: Some(time_zone.into()),
        }
    }

    /// Creates an all-day value.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            date_time: None,
            date: Some(date.format("%Y-%m-%d").to_string()),
            time_zone: None,
        }
    }

    /// Resolves this value to a UTC instant.
    ///
    /// The value's own `timeZone` takes precedence over `default_tz` when the
    /// date-time carries no offset, and for all-day dates.
    pub fn to_utc(&self, default_tz: Tz) -> Result<DateTime<Utc>, TimeError> {
        let tz = self
            .time_zone
            .as_deref()
            .and_then(|name| parse_timezone(name).ok())
            .unwrap_or(default_tz);

        match (&self.date_time, &self.date) {
            (Some(dt), _) => Ok(parse_datetime(dt, tz)?.with_timezone(&Utc)),
            (None, Some(date)) => Ok(parse_datetime(date, tz)?.with_timezone(&Utc)),
            (None, None) => Err(TimeError::InvalidFormat {
                input: String::new(),
            }),
        }
    }
}

/// An event attendee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,

    /// `needsAction`, `declined`, `tentative` or `accepted`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_guests: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<bool>,

    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub is_self: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<bool>,
}

/// Reminder settings of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    #[serde(default)]
    pub use_default: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<ReminderOverride>,
}

/// A single reminder override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderOverride {
    /// `email` or `popup`.
    pub method: String,
    /// Minutes before the event start.
    pub minutes: u32,
}

/// A Google Drive file attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}

/// Conference (video call) data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_request: Option<CreateConferenceRequest>,

    /// Entry points, solution and conference ids as returned by the API.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request to generate a new conference for an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConferenceRequest {
    pub request_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conference_solution_key: Option<ConferenceSolutionKey>,
}

/// Conference solution selector, e.g. `hangoutsMeet`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceSolutionKey {
    #[serde(rename = "type")]
    pub kind: String,
}

/// An entry of the user's calendar list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    pub id: String,

    #[serde(default)]
    pub summary: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,

    /// `freeBusyReader`, `reader`, `writer` or `owner`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_role: Option<String>,

    #[serde(default)]
    pub primary: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

/// Body of a free/busy query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeBusyQuery {
    pub time_min: String,
    pub time_max: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_expansion_max: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_expansion_max: Option<u32>,

    pub items: Vec<FreeBusyItem>,
}

/// A calendar (or group) to include in a free/busy query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeBusyItem {
    pub id: String,
}

/// Free/busy query result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeBusyResponse {
    #[serde(default)]
    pub time_min: Option<String>,

    #[serde(default)]
    pub time_max: Option<String>,

    #[serde(default)]
    pub calendars: BTreeMap<String, FreeBusyCalendar>,
}

/// Busy periods of one calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeBusyCalendar {
    #[serde(default)]
    pub busy: Vec<BusyPeriod>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FreeBusyError>,
}

/// A single busy interval as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyPeriod {
    pub start: String,
    pub end: String,
}

/// Per-calendar error in a free/busy result, e.g. reason `notFound`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeBusyError {
    #[serde(default)]
    pub domain: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    #[test]
    fn parse_api_event_keeps_unknown_fields() {
        let json = r#"{
            "id": "evt1",
            "status": "confirmed",
            "summary": "Standup",
            "location": "Room 1",
            "start": {"dateTime": "2025-06-01T10:00:00-04:00", "timeZone": "America/New_York"},
            "end": {"dateTime": "2025-06-01T10:30:00-04:00", "timeZone": "America/New_York"},
            "attendees": [{"email": "a@example.com", "responseStatus": "accepted", "self": true}],
            "organizer": {"email": "boss@example.com"},
            "etag": "\"123\""
        }"#;

        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.summary.as_deref(), Some("Standup"));
        assert_eq!(event.attendees[0].is_self, Some(true));
        assert!(event.extra.contains_key("organizer"));
        assert!(event.extra.contains_key("etag"));

        let back = serde_json::to_value(&event).unwrap();
        assert_eq!(back["organizer"]["email"], "boss@example.com");
        assert_eq!(back["attendees"][0]["self"], true);
    }

    #[test]
    fn calendar_id_is_not_serialized() {
        let event = Event::default().with_calendar_id("primary");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn timed_event_range() {
        let event: Event = serde_json::from_value(serde_json::json!({
            "start": {"dateTime": "2025-06-01T10:00:00-04:00"},
            "end": {"dateTime": "2025-06-01T11:00:00-04:00"}
        }))
        .unwrap();

        let range = event.time_range(chrono_tz::UTC).unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2025, 6, 1, 15, 0, 0).unwrap());
        assert!(!event.is_all_day());
    }

    #[test]
    fn all_day_event_range_uses_event_timezone() {
        let event: Event = serde_json::from_value(serde_json::json!({
            "start": {"date": "2025-06-01", "timeZone": "Europe/Paris"},
            "end": {"date": "2025-06-02", "timeZone": "Europe/Paris"}
        }))
        .unwrap();

        assert!(event.is_all_day());
        let range = event.time_range(chrono_tz::UTC).unwrap();
        assert_eq!(range.start, Utc.with_ymd_and_hms(2025, 5, 31, 22, 0, 0).unwrap());
        assert_eq!(range.duration(), chrono::Duration::hours(24));
    }

    #[test]
    fn event_without_times_has_no_range() {
        assert!(Event::default().time_range(chrono_tz::UTC).is_none());
    }

    #[test]
    fn event_datetime_constructors() {
        let dt = Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap();
        let value = EventDateTime::from_datetime(&dt, "UTC");
        assert_eq!(value.date_time.as_deref(), Some("2025-06-01T14:00:00Z"));
        assert_eq!(value.time_zone.as_deref(), Some("UTC"));

        let date = EventDateTime::from_date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(serde_json::to_value(&date).unwrap(), serde_json::json!({"date": "2025-06-01"}));
    }

    #[test]
    fn parse_free_busy_response() {
        let json = r#"{
            "kind": "calendar#freeBusy",
            "timeMin": "2025-06-01T00:00:00.000Z",
            "timeMax": "2025-06-02T00:00:00.000Z",
            "calendars": {
                "a@example.com": {"busy": [{"start": "2025-06-01T14:00:00Z", "end": "2025-06-01T15:00:00Z"}]},
                "missing@example.com": {"errors": [{"domain": "global", "reason": "notFound"}], "busy": []}
            }
        }"#;

        let response: FreeBusyResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.calendars["a@example.com"].busy.len(), 1);
        assert_eq!(response.calendars["missing@example.com"].errors[0].reason, "notFound");
    }

    #[test]
    fn free_busy_query_serializes_camel_case() {
        let query = FreeBusyQuery {
            time_min: "2025-06-01T00:00:00Z".to_string(),
            time_max: "2025-06-02T00:00:00Z".to_string(),
            time_zone: Some("UTC".to_string()),
            group_expansion_max: None,
            calendar_expansion_max: Some(10),
            items: vec![FreeBusyItem {
                id: "primary".to_string(),
            }],
        };
        insta::assert_json_snapshot!(query, @r###"
        {
          "timeMin": "2025-06-01T00:00:00Z",
          "timeMax": "2025-06-02T00:00:00Z",
          "timeZone": "UTC",
          "calendarExpansionMax": 10,
          "items": [
            {
              "id": "primary"
            }
          ]
        }
        "###);
    }

    #[test]
    fn parse_calendar_list_entry() {
        let json = r##"{
            "id": "work@example.com",
            "summary": "Work",
            "timeZone": "Europe/Paris",
            "accessRole": "owner",
            "backgroundColor": "#9fe1e7"
        }"##;
        let calendar: Calendar = serde_json::from_str(json).unwrap();
        assert_eq!(calendar.access_role.as_deref(), Some("owner"));
        assert!(!calendar.primary);
    }
}
