//! Validated tool arguments.
//!
//! Each tool's arguments deserialize into a request struct and are checked
//! by its `from_args` constructor before the handler runs, so handlers only
//! ever see well-formed input. Wire names follow the Calendar API
//! (`calendarId`, `timeMin`, ...); snake_case spellings are accepted as
//! aliases.

use std::sync::LazyLock;

use gcal_mcp_core::{
    Attachment, Attendee, ConferenceData, Event, FreeBusyItem, ReminderOverride, Reminders, Tz,
    parse_timezone,
};
use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use super::error::{ToolError, ToolResult};

pub const DEFAULT_MAX_RESULTS: u32 = 250;
pub const MAX_RESULTS_LIMIT: u32 = 2500;
pub const MAX_ATTACHMENTS: usize = 25;
pub const MAX_REMINDER_OVERRIDES: usize = 5;
/// Four weeks.
pub const MAX_REMINDER_MINUTES: u32 = 40_320;
pub const MAX_FREE_BUSY_CALENDARS: usize = 50;
pub const MAX_GROUP_EXPANSION: u32 = 100;
pub const MAX_CALENDAR_EXPANSION: u32 = 50;

const RECURRENCE_PREFIXES: [&str; 4] = ["RRULE:", "EXRULE:", "RDATE:", "EXDATE:"];

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("Invalid email regex")
});

fn primary() -> String {
    "primary".to_string()
}

fn default_max_results() -> u32 {
    DEFAULT_MAX_RESULTS
}

fn default_true() -> bool {
    true
}

/// Deserializes tool arguments; absent arguments behave like `{}`.
pub(crate) fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> ToolResult<T> {
    let args = match args {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(args)
        .map_err(|e| ToolError::invalid_input(format!("invalid arguments for {tool}: {e}")))
}

fn require(field: &str, value: &str) -> ToolResult<()> {
    if value.trim().is_empty() {
        return Err(ToolError::invalid_input(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Returns true if `email` looks like a deliverable address.
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderBy {
    StartTime,
    Updated,
}

impl OrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartTime => "startTime",
            Self::Updated => "updated",
        }
    }
}

/// Who receives email about a change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SendUpdates {
    #[default]
    All,
    ExternalOnly,
    None,
}

impl SendUpdates {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::ExternalOnly => "externalOnly",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Default,
    Public,
    Private,
    Confidential,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Public => "public",
            Self::Private => "private",
            Self::Confidential => "confidential",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transparency {
    Opaque,
    Transparent,
}

impl Transparency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opaque => "opaque",
            Self::Transparent => "transparent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseStatus {
    NeedsAction,
    Declined,
    Tentative,
    Accepted,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NeedsAction => "needsAction",
            Self::Declined => "declined",
            Self::Tentative => "tentative",
            Self::Accepted => "accepted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMethod {
    Email,
    Popup,
}

impl ReminderMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Popup => "popup",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeInput {
    pub email: String,
    #[serde(default, alias = "display_name")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub optional: Option<bool>,
    #[serde(default, alias = "response_status")]
    pub response_status: Option<ResponseStatus>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, alias = "additional_guests")]
    pub additional_guests: Option<u32>,
}

impl AttendeeInput {
    fn validate(&self) -> ToolResult<()> {
        if !is_valid_email(self.email.trim()) {
            return Err(ToolError::invalid_attendee_email(&self.email));
        }
        Ok(())
    }

    pub fn to_attendee(&self) -> Attendee {
        Attendee {
            email: Some(self.email.trim().to_string()),
            display_name: self.display_name.clone(),
            optional: self.optional,
            response_status: self.response_status.map(|s| s.as_str().to_string()),
            comment: self.comment.clone(),
            additional_guests: self.additional_guests,
            ..Default::default()
        }
    }
}

/// A Google Drive attachment; either the URL or the file id is required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInput {
    #[serde(default, alias = "file_url")]
    pub file_url: Option<String>,
    #[serde(default, alias = "file_id")]
    pub file_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "mime_type")]
    pub mime_type: Option<String>,
}

impl AttachmentInput {
    fn validate(&self) -> ToolResult<()> {
        let has_url = self.file_url.as_deref().is_some_and(|u| !u.trim().is_empty());
        let has_id = self.file_id.as_deref().is_some_and(|i| !i.trim().is_empty());
        if !has_url && !has_id {
            return Err(ToolError::invalid_input(
                "each attachment needs a fileUrl or a fileId",
            ));
        }
        Ok(())
    }

    pub fn to_attachment(&self) -> Attachment {
        let file_url = match (&self.file_url, &self.file_id) {
            (Some(url), _) if !url.trim().is_empty() => url.trim().to_string(),
            (_, Some(id)) => format!("https://drive.google.com/open?id={}", id.trim()),
            _ => String::new(),
        };
        Attachment {
            file_url,
            title: self.title.clone(),
            mime_type: self.mime_type.clone(),
            file_id: self.file_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReminderOverrideInput {
    pub method: ReminderMethod,
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemindersInput {
    #[serde(default, alias = "use_default")]
    pub use_default: Option<bool>,
    #[serde(default)]
    pub overrides: Vec<ReminderOverrideInput>,
}

impl RemindersInput {
    fn validate(&self) -> ToolResult<()> {
        if self.overrides.len() > MAX_REMINDER_OVERRIDES {
            return Err(ToolError::invalid_input(format!(
                "at most {MAX_REMINDER_OVERRIDES} reminder overrides are allowed"
            )));
        }
        if let Some(r) = self.overrides.iter().find(|r| r.minutes > MAX_REMINDER_MINUTES) {
            return Err(ToolError::invalid_input(format!(
                "reminder minutes must be between 0 and {MAX_REMINDER_MINUTES}, got {}",
                r.minutes
            )));
        }
        if self.use_default == Some(true) && !self.overrides.is_empty() {
            return Err(ToolError::invalid_input(
                "reminder overrides cannot be combined with useDefault=true",
            ));
        }
        Ok(())
    }

    /// Overrides imply `useDefault=false` unless stated otherwise.
    pub fn to_reminders(&self) -> Reminders {
        Reminders {
            use_default: self.use_default.unwrap_or(self.overrides.is_empty()),
            overrides: self
                .overrides
                .iter()
                .map(|r| ReminderOverride {
                    method: r.method.as_str().to_string(),
                    minutes: r.minutes,
                })
                .collect(),
        }
    }
}

/// Event fields shared by create-event and update-event.
///
/// For creation `summary`, start and end are required; for updates every
/// field is optional and only the supplied ones are changed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFields {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "color_id")]
    pub color_id: Option<String>,
    #[serde(
        default,
        rename = "start_datetime",
        alias = "startDatetime",
        alias = "startDateTime"
    )]
    pub start: Option<String>,
    #[serde(
        default,
        rename = "end_datetime",
        alias = "endDatetime",
        alias = "endDateTime"
    )]
    pub end: Option<String>,
    /// IANA zone for naive start/end values.
    #[serde(default, rename = "timezone", alias = "timeZone", alias = "time_zone")]
    pub timezone: Option<String>,
    #[serde(default)]
    pub recurrence: Option<Vec<String>>,
    #[serde(default)]
    pub attendees: Option<Vec<AttendeeInput>>,
    #[serde(default)]
    pub attachments: Option<Vec<AttachmentInput>>,
    #[serde(default)]
    pub reminders: Option<RemindersInput>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub transparency: Option<Transparency>,
    #[serde(default, alias = "conference_data")]
    pub conference_data: Option<ConferenceData>,
}

impl EventFields {
    fn validate(&self) -> ToolResult<()> {
        if let Some(ref summary) = self.summary {
            require("summary", summary)?;
        }
        if let Some(ref color) = self.color_id {
            let valid = color.parse::<u8>().is_ok_and(|c| (1..=11).contains(&c));
            if !valid {
                return Err(ToolError::invalid_input(format!(
                    "colorId must be \"1\" through \"11\", got '{color}'"
                )));
            }
        }
        if let Some(ref start) = self.start {
            require("start_datetime", start)?;
        }
        if let Some(ref end) = self.end {
            require("end_datetime", end)?;
        }
        self.timezone()?;

        for rule in self.recurrence.iter().flatten() {
            if !RECURRENCE_PREFIXES.iter().any(|p| rule.starts_with(p)) {
                return Err(ToolError::invalid_input(format!(
                    "recurrence lines must start with RRULE:, EXRULE:, RDATE: or EXDATE:, got '{rule}'"
                )));
            }
        }
        for attendee in self.attendees.iter().flatten() {
            attendee.validate()?;
        }
        if let Some(ref attachments) = self.attachments {
            if attachments.len() > MAX_ATTACHMENTS {
                return Err(ToolError::invalid_input(format!(
                    "at most {MAX_ATTACHMENTS} attachments are allowed, got {}",
                    attachments.len()
                )));
            }
            for attachment in attachments {
                attachment.validate()?;
            }
        }
        if let Some(ref reminders) = self.reminders {
            reminders.validate()?;
        }
        if let Some(ref conference) = self.conference_data {
            let request_id = conference
                .create_request
                .as_ref()
                .map(|r| r.request_id.as_str())
                .unwrap_or_default();
            if request_id.trim().is_empty() {
                return Err(ToolError::invalid_input(
                    "conferenceData needs a createRequest with a requestId",
                ));
            }
        }
        Ok(())
    }

    /// The explicitly requested timezone, if any.
    pub fn timezone(&self) -> ToolResult<Option<Tz>> {
        Ok(self.timezone.as_deref().map(parse_timezone).transpose()?)
    }

    /// Returns true if start or end is being set.
    pub fn changes_time(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// API field names this request sets.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let fields = [
            ("summary", self.summary.is_some()),
            ("description", self.description.is_some()),
            ("location", self.location.is_some()),
            ("colorId", self.color_id.is_some()),
            ("start", self.start.is_some()),
            ("end", self.end.is_some()),
            ("recurrence", self.recurrence.is_some()),
            ("attendees", self.attendees.is_some()),
            ("attachments", self.attachments.is_some()),
            ("reminders", self.reminders.is_some()),
            ("visibility", self.visibility.is_some()),
            ("transparency", self.transparency.is_some()),
            ("conferenceData", self.conference_data.is_some()),
        ];
        fields
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
            .collect()
    }

    /// Copies every supplied field except start and end onto `event`.
    pub fn apply_to(&self, event: &mut Event) {
        if let Some(ref v) = self.summary {
            event.summary = Some(v.clone());
        }
        if let Some(ref v) = self.description {
            event.description = Some(v.clone());
        }
        if let Some(ref v) = self.location {
            event.location = Some(v.clone());
        }
        if let Some(ref v) = self.color_id {
            event.color_id = Some(v.clone());
        }
        if let Some(ref v) = self.recurrence {
            event.recurrence = v.clone();
        }
        if let Some(ref v) = self.attendees {
            event.attendees = v.iter().map(AttendeeInput::to_attendee).collect();
        }
        if let Some(ref v) = self.attachments {
            event.attachments = v.iter().map(AttachmentInput::to_attachment).collect();
        }
        if let Some(ref v) = self.reminders {
            event.reminders = Some(v.to_reminders());
        }
        if let Some(v) = self.visibility {
            event.visibility = Some(v.as_str().to_string());
        }
        if let Some(v) = self.transparency {
            event.transparency = Some(v.as_str().to_string());
        }
        if let Some(ref v) = self.conference_data {
            event.conference_data = Some(v.clone());
        }
    }

    /// Builds a partial body holding every supplied field except start and
    /// end. Lists set to `[]` are kept so they clear the stored value.
    pub fn patch_body(&self) -> ToolResult<Map<String, Value>> {
        let mut event = Event::default();
        self.apply_to(&mut event);

        let mut body = match serde_json::to_value(&event) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => return Err(ToolError::internal(format!("cannot encode event: {e}"))),
        };
        for (key, list) in [
            ("recurrence", self.recurrence.as_ref().map(Vec::len)),
            ("attendees", self.attendees.as_ref().map(Vec::len)),
            ("attachments", self.attachments.as_ref().map(Vec::len)),
        ] {
            if list == Some(0) {
                body.insert(key.to_string(), json!([]));
            }
        }
        Ok(body)
    }
}

/// Arguments of `get-events`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEventsRequest {
    #[serde(default = "primary", alias = "calendar_id")]
    pub calendar_id: String,
    #[serde(default, alias = "time_min")]
    pub time_min: Option<String>,
    #[serde(default, alias = "time_max")]
    pub time_max: Option<String>,
    #[serde(default = "default_max_results", alias = "max_results")]
    pub max_results: u32,
    #[serde(default = "default_true", alias = "single_events")]
    pub single_events: bool,
    #[serde(default, alias = "order_by")]
    pub order_by: Option<OrderBy>,
}

impl GetEventsRequest {
    pub fn from_args(args: Value) -> ToolResult<Self> {
        let request: Self = parse_args("get-events", args)?;
        require("calendarId", &request.calendar_id)?;
        if !(1..=MAX_RESULTS_LIMIT).contains(&request.max_results) {
            return Err(ToolError::invalid_input(format!(
                "maxResults must be between 1 and {MAX_RESULTS_LIMIT}, got {}",
                request.max_results
            )));
        }
        if request.order_by == Some(OrderBy::StartTime) && !request.single_events {
            return Err(ToolError::invalid_input(
                "orderBy=startTime requires singleEvents=true",
            ));
        }
        Ok(request)
    }

    /// The requested ordering; start time when recurrences are expanded.
    pub fn effective_order(&self) -> Option<OrderBy> {
        self.order_by
            .or_else(|| self.single_events.then_some(OrderBy::StartTime))
    }
}

/// Arguments of `get-current-date`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetCurrentDateRequest {
    #[serde(default, alias = "timeZone", alias = "time_zone")]
    pub timezone: Option<String>,
}

impl GetCurrentDateRequest {
    pub fn from_args(args: Value) -> ToolResult<Self> {
        let request: Self = parse_args("get-current-date", args)?;
        request.timezone()?;
        Ok(request)
    }

    pub fn timezone(&self) -> ToolResult<Option<Tz>> {
        Ok(self.timezone.as_deref().map(parse_timezone).transpose()?)
    }
}

/// Arguments of `create-event`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[serde(default = "primary", alias = "calendar_id")]
    pub calendar_id: String,
    #[serde(flatten)]
    pub fields: EventFields,
    #[serde(default, alias = "send_updates")]
    pub send_updates: Option<SendUpdates>,
}

impl CreateEventRequest {
    pub fn from_args(args: Value) -> ToolResult<Self> {
        let request: Self = parse_args("create-event", args)?;
        require("calendarId", &request.calendar_id)?;
        for (name, value) in [
            ("summary", &request.fields.summary),
            ("start_datetime", &request.fields.start),
            ("end_datetime", &request.fields.end),
        ] {
            if value.is_none() {
                return Err(ToolError::invalid_input(format!("{name} is required")));
            }
        }
        request.fields.validate()?;
        Ok(request)
    }

    pub fn summary(&self) -> &str {
        self.fields.summary.as_deref().unwrap_or_default()
    }

    pub fn start(&self) -> &str {
        self.fields.start.as_deref().unwrap_or_default()
    }

    pub fn end(&self) -> &str {
        self.fields.end.as_deref().unwrap_or_default()
    }
}

/// Arguments of `update-event`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[serde(default = "primary", alias = "calendar_id")]
    pub calendar_id: String,
    #[serde(alias = "event_id")]
    pub event_id: String,
    #[serde(flatten)]
    pub fields: EventFields,
    #[serde(default, alias = "send_updates")]
    pub send_updates: SendUpdates,
}

impl UpdateEventRequest {
    pub fn from_args(args: Value) -> ToolResult<Self> {
        let request: Self = parse_args("update-event", args)?;
        require("calendarId", &request.calendar_id)?;
        require("eventId", &request.event_id)?;
        request.fields.validate()?;
        if request.fields.changed_fields().is_empty() {
            return Err(ToolError::invalid_input(
                "no fields to update; specify at least one field such as summary or start_datetime",
            ));
        }
        Ok(request)
    }
}

/// Arguments of `delete-event`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEventRequest {
    #[serde(default = "primary", alias = "calendar_id")]
    pub calendar_id: String,
    #[serde(alias = "event_id")]
    pub event_id: String,
    #[serde(default, alias = "send_updates")]
    pub send_updates: Option<SendUpdates>,
    /// `false` is shorthand for `sendUpdates=none`.
    #[serde(default, alias = "notify_attendees")]
    pub notify_attendees: Option<bool>,
}

impl DeleteEventRequest {
    pub fn from_args(args: Value) -> ToolResult<Self> {
        let request: Self = parse_args("delete-event", args)?;
        require("calendarId", &request.calendar_id)?;
        require("eventId", &request.event_id)?;
        Ok(request)
    }

    /// `sendUpdates` wins over `notify_attendees` when both are given.
    pub fn send_updates(&self) -> SendUpdates {
        match (self.send_updates, self.notify_attendees) {
            (Some(s), _) => s,
            (None, Some(false)) => SendUpdates::None,
            (None, _) => SendUpdates::All,
        }
    }
}

/// Arguments of `check-availability`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAvailabilityRequest {
    #[serde(default)]
    pub items: Vec<FreeBusyItem>,
    /// Plain list of calendar ids, merged with `items`.
    #[serde(default, alias = "calendar_ids")]
    pub calendar_ids: Vec<String>,
    #[serde(alias = "time_min")]
    pub time_min: String,
    #[serde(alias = "time_max")]
    pub time_max: String,
    /// Zone for offset-less bounds; the account timezone when absent.
    #[serde(default, alias = "time_zone")]
    pub time_zone: Option<String>,
    #[serde(default, alias = "group_expansion_max")]
    pub group_expansion_max: Option<u32>,
    #[serde(default, alias = "calendar_expansion_max")]
    pub calendar_expansion_max: Option<u32>,
}

impl CheckAvailabilityRequest {
    pub fn from_args(args: Value) -> ToolResult<Self> {
        let request: Self = parse_args("check-availability", args)?;
        let ids = request.calendars();
        if ids.is_empty() {
            return Err(ToolError::invalid_input(
                "items must name at least one calendar",
            ));
        }
        if ids.len() > MAX_FREE_BUSY_CALENDARS {
            return Err(ToolError::invalid_input(format!(
                "at most {MAX_FREE_BUSY_CALENDARS} calendars can be queried at once"
            )));
        }
        if ids.iter().any(|id| id.is_empty()) {
            return Err(ToolError::invalid_input("calendar ids must not be empty"));
        }
        if request.group_expansion_max.is_some_and(|n| n > MAX_GROUP_EXPANSION) {
            return Err(ToolError::invalid_input(format!(
                "groupExpansionMax must be at most {MAX_GROUP_EXPANSION}"
            )));
        }
        if request
            .calendar_expansion_max
            .is_some_and(|n| n > MAX_CALENDAR_EXPANSION)
        {
            return Err(ToolError::invalid_input(format!(
                "calendarExpansionMax must be at most {MAX_CALENDAR_EXPANSION}"
            )));
        }
        request.timezone()?;
        Ok(request)
    }

    /// Requested calendar ids in order, without duplicates.
    pub fn calendars(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        let all = self
            .items
            .iter()
            .map(|i| i.id.trim())
            .chain(self.calendar_ids.iter().map(|s| s.trim()));
        for id in all {
            if !ids.iter().any(|known| known == id) {
                ids.push(id.to_string());
            }
        }
        ids
    }

    pub fn timezone(&self) -> ToolResult<Option<Tz>> {
        match self.time_zone {
            Some(ref name) => Ok(Some(parse_timezone(name)?)),
            None => Ok(None),
        }
    }
}
