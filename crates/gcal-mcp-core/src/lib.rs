//! Core types: time ranges, timezone helpers, calendar DTOs, conflict detection

pub mod conflict;
pub mod event;
pub mod time;
pub mod tracing;

pub use chrono_tz::Tz;
pub use conflict::{Conflict, conflict_warnings, find_conflicts};
pub use event::{
    Attachment, Attendee, BusyPeriod, Calendar, ConferenceData, ConferenceSolutionKey,
    CreateConferenceRequest, Event, EventDateTime, FreeBusyCalendar, FreeBusyError,
    FreeBusyItem, FreeBusyQuery, FreeBusyResponse, ReminderOverride, Reminders,
};
pub use time::{
    TimeError, TimeRange, format_api_datetime, now_in_timezone, parse_datetime, parse_timezone,
};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing, parse_level};
