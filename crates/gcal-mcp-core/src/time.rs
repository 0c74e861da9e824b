//! Time helpers for calendar requests.
//!
//! This module provides [`parse_datetime`] for normalizing the loosely
//! formatted date-time strings agents send, [`TimeRange`] for the half-open
//! intervals used by conflict detection and availability checks, and a few
//! small timezone utilities built on `chrono-tz`.

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, SecondsFormat, TimeZone,
    Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Naive date-time layouts accepted when the input carries no offset.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Errors produced while parsing or validating times.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The input is not a recognizable date or date-time.
    #[error(
        "invalid date-time '{input}': expected RFC3339, YYYY-MM-DDTHH:MM:SS or YYYY-MM-DD"
    )]
    InvalidFormat { input: String },

    /// The timezone name is not a known IANA zone.
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    /// The range start is not strictly before its end.
    #[error("invalid time range: start {start} must be before end {end}")]
    InvalidRange { start: String, end: String },
}

impl TimeError {
    fn invalid_format(input: &str) -> Self {
        Self::InvalidFormat {
            input: input.to_string(),
        }
    }
}

/// Parses an IANA timezone name such as `America/New_York`.
pub fn parse_timezone(name: &str) -> Result<Tz, TimeError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| TimeError::UnknownTimezone(name.to_string()))
}

/// Parses a date-time string, applying `default_tz` when it has no offset.
///
/// Accepted inputs:
/// - RFC3339 with an offset or `Z` (`2025-06-01T10:00:00-04:00`), kept as-is
/// - naive date-times (`2025-06-01T10:00:00`, optional fractional seconds,
///   `T` or space separator, seconds optional), localized to `default_tz`
/// - bare dates (`2025-06-01`), meaning local midnight in `default_tz`
///
/// Local times that fall in a DST gap are shifted forward by one hour;
/// ambiguous local times resolve to the earlier instant.
pub fn parse_datetime(input: &str, default_tz: Tz) -> Result<DateTime<FixedOffset>, TimeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TimeError::invalid_format(input));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt);
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return localize(naive, default_tz).ok_or_else(|| TimeError::invalid_format(input));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let midnight = date.and_time(chrono::NaiveTime::MIN);
        return localize(midnight, default_tz).ok_or_else(|| TimeError::invalid_format(input));
    }

    Err(TimeError::invalid_format(input))
}

fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<FixedOffset>> {
    let local = tz
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())?;
    Some(local.with_timezone(&local.offset().fix()))
}

/// Returns the current instant in the given timezone.
pub fn now_in_timezone(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

/// Formats an instant the way the Calendar API expects it (RFC3339, seconds).
pub fn format_api_datetime<T>(dt: &DateTime<T>) -> String
where
    T: TimeZone,
    T::Offset: std::fmt::Display,
{
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A half-open interval `[start, end)` in UTC.
///
/// Construction enforces `start < end`; an empty or inverted range is an
/// error rather than a panic since ranges usually come from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the range (inclusive).
    pub start: DateTime<Utc>,
    /// End of the range (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a new range, failing unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TimeError> {
        if start >= end {
            return Err(TimeError::InvalidRange {
                start: format_api_datetime(&start),
                end: format_api_datetime(&end),
            });
        }
        Ok(Self { start, end })
    }

    /// Creates a range from any pair of timezone-aware instants.
    pub fn from_instants<A: TimeZone, B: TimeZone>(
        start: &DateTime<A>,
        end: &DateTime<B>,
    ) -> Result<Self, TimeError> {
        Self::new(start.with_timezone(&Utc), end.with_timezone(&Utc))
    }

    /// Parses both bounds with [`parse_datetime`] and builds the range.
    pub fn parse(start: &str, end: &str, default_tz: Tz) -> Result<Self, TimeError> {
        let start = parse_datetime(start, default_tz)?;
        let end = parse_datetime(end, default_tz)?;
        Self::from_instants(&start, &end)
    }

    /// Creates a range from a start instant and a positive duration.
    pub fn from_duration(start: DateTime<Utc>, duration: Duration) -> Result<Self, TimeError> {
        Self::new(start, start + duration)
    }

    /// Returns the length of the range.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if an instant falls within `[start, end)`.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }

    /// Checks whether two ranges overlap.
    ///
    /// `[s1, e1)` and `[s2, e2)` overlap iff `s1 < e2 && s2 < e1`, so ranges
    /// that merely touch (one ends exactly when the other starts) do not.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}
