//! Overlap detection between a candidate slot and existing events.
//!
//! Conflicts are advisory: nothing here rejects or mutates events, callers
//! attach the result to an otherwise successful response.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::event::Event;
use crate::time::TimeRange;

/// A warning describing an existing event that overlaps a candidate slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

impl Conflict {
    fn new(event: &Event, range: TimeRange) -> Self {
        Self {
            event_id: event.id.clone(),
            summary: event
                .summary
                .clone()
                .unwrap_or_else(|| "(no title)".to_string()),
            start: range.start,
            end: range.end,
            calendar_id: event.calendar_id.clone(),
            html_link: event.html_link.clone(),
        }
    }
}

/// Returns every event in `existing` whose interval overlaps `candidate`.
///
/// Overlap is half-open (`s1 < e2 && s2 < e1`), so back-to-back events are
/// not conflicts. Cancelled events and events without a usable time range
/// are ignored. `default_tz` resolves all-day events and naive times.
pub fn find_conflicts(candidate: &TimeRange, existing: &[Event], default_tz: Tz) -> Vec<Event> {
    existing
        .iter()
        .filter(|event| !event.is_cancelled())
        .filter(|event| {
            event
                .time_range(default_tz)
                .is_some_and(|range| candidate.overlaps(&range))
        })
        .cloned()
        .collect()
}

/// Builds conflict warnings for `candidate`, skipping the event `exclude_id`.
///
/// Updating an event must not report the event as conflicting with itself.
pub fn conflict_warnings(
    candidate: &TimeRange,
    existing: &[Event],
    default_tz: Tz,
    exclude_id: Option<&str>,
) -> Vec<Conflict> {
    find_conflicts(candidate, existing, default_tz)
        .iter()
        .filter(|event| exclude_id.is_none() || event.id.as_deref() != exclude_id)
        .filter_map(|event| {
            event
                .time_range(default_tz)
                .map(|range| Conflict::new(event, range))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventDateTime;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, m, 0).unwrap()
    }

    fn event(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Event {
        Event {
            id: Some(id.to_string()),
            summary: Some(format!("event {id}")),
            start: Some(EventDateTime::from_datetime(&start, "UTC")),
            end: Some(EventDateTime::from_datetime(&end, "UTC")),
            ..Default::default()
        }
        .with_calendar_id("primary")
    }

    fn range(start: DateTime<Utc>, end: DateTime<Utc>) -> TimeRange {
        TimeRange::new(start, end).unwrap()
    }

    #[test]
    fn partial_overlap_is_reported() {
        let existing = vec![event("busy", utc(14, 30), utc(15, 30))];
        let conflicts = find_conflicts(&range(utc(14, 0), utc(15, 0)), &existing, chrono_tz::UTC);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id.as_deref(), Some("busy"));
    }

    #[test]
    fn adjacent_events_do_not_conflict() {
        let existing = vec![
            event("before", utc(13, 0), utc(14, 0)),
            event("after", utc(15, 0), utc(16, 0)),
        ];
        let conflicts = find_conflicts(&range(utc(14, 0), utc(15, 0)), &existing, chrono_tz::UTC);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn result_matches_overlap_rule_exhaustively() {
        let candidate = range(utc(10, 0), utc(12, 0));
        let points = [utc(9, 0), utc(10, 0), utc(11, 0), utc(12, 0), utc(13, 0)];

        for (i, &s) in points.iter().enumerate() {
            for &e in &points[i + 1..] {
                let existing = vec![event("x", s, e)];
                let expected = candidate.start < e && s < candidate.end;
                let found = !find_conflicts(&candidate, &existing, chrono_tz::UTC).is_empty();
                assert_eq!(found, expected, "existing [{s}, {e})");
            }
        }
    }

    #[test]
    fn cancelled_and_timeless_events_are_ignored() {
        let mut cancelled = event("gone", utc(14, 0), utc(15, 0));
        cancelled.status = Some("cancelled".to_string());
        let timeless = Event {
            id: Some("no-time".to_string()),
            ..Default::default()
        };

        let conflicts = find_conflicts(
            &range(utc(14, 0), utc(15, 0)),
            &[cancelled, timeless],
            chrono_tz::UTC,
        );
        assert!(conflicts.is_empty());
    }

    #[test]
    fn all_day_event_blocks_the_whole_local_day() {
        let all_day = Event {
            id: Some("holiday".to_string()),
            start: Some(EventDateTime {
                date: Some("2025-06-01".to_string()),
                ..Default::default()
            }),
            end: Some(EventDateTime {
                date: Some("2025-06-02".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let tz: Tz = "America/New_York".parse().unwrap();

        // 03:00 UTC on June 1 is still May 31 in New York
        let early = range(utc(3, 0), utc(3, 30));
        assert!(find_conflicts(&early, std::slice::from_ref(&all_day), tz).is_empty());

        let midday = range(utc(16, 0), utc(17, 0));
        assert_eq!(find_conflicts(&midday, &[all_day], tz).len(), 1);
    }

    #[test]
    fn warnings_exclude_the_updated_event() {
        let existing = vec![
            event("self", utc(14, 0), utc(15, 0)),
            event("other", utc(14, 30), utc(16, 0)),
        ];
        let warnings = conflict_warnings(
            &range(utc(14, 15), utc(15, 15)),
            &existing,
            chrono_tz::UTC,
            Some("self"),
        );

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].event_id.as_deref(), Some("other"));
        assert_eq!(warnings[0].summary, "event other");
        assert_eq!(warnings[0].calendar_id.as_deref(), Some("primary"));
        assert_eq!(warnings[0].start, utc(14, 30));
    }
}
