//! Event tools: listing, create/update/delete, and free/busy.

use chrono::{DateTime, Duration, Utc};
use gcal_mcp_core::{
    Conflict, Event, EventDateTime, FreeBusyItem, FreeBusyQuery, TimeRange, Tz, conflict_warnings,
    format_api_datetime, parse_datetime,
};
use gcal_mcp_providers::{
    BoxFuture, ListEventsParams, MAX_EVENTS_PER_PAGE, ProviderErrorCode, WriteOptions,
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use super::error::{ProviderResultExt, ToolError, ToolErrorKind, ToolResult};
use super::requests::{
    CheckAvailabilityRequest, CreateEventRequest, DeleteEventRequest, GetEventsRequest,
    UpdateEventRequest,
};
use super::{ToolContext, ToolHandler, schema};

/// Window used by get-events when no upper bound is given.
const DEFAULT_WINDOW_DAYS: i64 = 7;

fn to_json<T: Serialize>(value: &T) -> ToolResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ToolError::internal(format!("cannot encode result: {e}")))
}

/// Lists events of `calendar_id` overlapping `range` and turns them into
/// conflict warnings.
///
/// A missing calendar or a credential problem is reported; any other
/// failure only costs the warnings.
async fn detect_conflicts(
    ctx: &ToolContext,
    calendar_id: &str,
    range: &TimeRange,
    tz: Tz,
    exclude_id: Option<&str>,
) -> ToolResult<Vec<Conflict>> {
    let params = ListEventsParams::new(calendar_id, range.start, range.end)
        .with_max_results(MAX_EVENTS_PER_PAGE);

    match ctx.api.list_events(&params).await {
        Ok(events) => {
            let events: Vec<Event> = events
                .into_iter()
                .map(|e| e.with_calendar_id(calendar_id))
                .collect();
            let conflicts = conflict_warnings(range, &events, tz, exclude_id);
            debug!(
                calendar_id,
                checked = events.len(),
                conflicts = conflicts.len(),
                "conflict check"
            );
            Ok(conflicts)
        }
        Err(e)
            if matches!(
                e.code(),
                ProviderErrorCode::NotFound
                    | ProviderErrorCode::AuthenticationFailed
                    | ProviderErrorCode::AuthorizationFailed
                    | ProviderErrorCode::ConfigurationError
            ) =>
        {
            Err::<Vec<Conflict>, _>(e).for_calendar(calendar_id)
        }
        Err(e) => {
            warn!(calendar_id, error = %e, "conflict check skipped");
            Ok(Vec::new())
        }
    }
}

pub struct GetEvents;

impl ToolHandler for GetEvents {
    fn name(&self) -> &'static str {
        "get-events"
    }

    fn description(&self) -> &'static str {
        "List events of a calendar in a time window, ordered by start time. \
         Defaults to the primary calendar and the next 7 days."
    }

    fn input_schema(&self) -> Value {
        schema::get_events()
    }

    fn call<'a>(&'a self, ctx: &'a ToolContext, args: Value) -> BoxFuture<'a, ToolResult<Value>> {
        Box::pin(get_events(ctx, args))
    }
}

async fn get_events(ctx: &ToolContext, args: Value) -> ToolResult<Value> {
    let request = GetEventsRequest::from_args(args)?;
    let tz = ctx.timezone.resolve().await?;

    let time_min = match request.time_min {
        Some(ref input) => parse_datetime(input, tz)?.with_timezone(&Utc),
        None => Utc::now(),
    };
    let time_max = match request.time_max {
        Some(ref input) => parse_datetime(input, tz)?.with_timezone(&Utc),
        None => time_min + Duration::days(DEFAULT_WINDOW_DAYS),
    };
    let window = TimeRange::new(time_min, time_max)?;

    let params = ListEventsParams::new(&request.calendar_id, window.start, window.end)
        .with_max_results(request.max_results)
        .with_ordering(
            request.single_events,
            request.effective_order().map(|o| o.as_str().to_string()),
        );
    let events = ctx
        .api
        .list_events(&params)
        .await
        .for_calendar(&request.calendar_id)?;

    Ok(json!({
        "calendar_id": request.calendar_id,
        "time_min": format_api_datetime(&window.start),
        "time_max": format_api_datetime(&window.end),
        "count": events.len(),
        "events": events,
    }))
}

pub struct CreateEvent;

impl ToolHandler for CreateEvent {
    fn name(&self) -> &'static str {
        "create-event"
    }

    fn description(&self) -> &'static str {
        "Create an event. Overlapping events are reported as conflicts but do not block creation."
    }

    fn input_schema(&self) -> Value {
        schema::create_event()
    }

    fn call<'a>(&'a self, ctx: &'a ToolContext, args: Value) -> BoxFuture<'a, ToolResult<Value>> {
        Box::pin(create_event(ctx, args))
    }
}

async fn create_event(ctx: &ToolContext, args: Value) -> ToolResult<Value> {
    let request = CreateEventRequest::from_args(args)?;
    let calendar_id = request.calendar_id.as_str();
    let tz = ctx.timezone.resolve_or(request.fields.timezone()?).await?;

    let start = parse_datetime(request.start(), tz)?;
    let end = parse_datetime(request.end(), tz)?;
    let range = TimeRange::from_instants(&start, &end)?;

    let conflicts = detect_conflicts(ctx, calendar_id, &range, tz, None).await?;

    let mut event = Event {
        start: Some(EventDateTime::from_datetime(&start, tz.name())),
        end: Some(EventDateTime::from_datetime(&end, tz.name())),
        ..Default::default()
    };
    request.fields.apply_to(&mut event);

    let mut options = WriteOptions::for_event(&event);
    if let Some(send_updates) = request.send_updates {
        options = options.with_send_updates(send_updates.as_str());
    }

    let created = ctx
        .api
        .insert_event(calendar_id, &event, &options)
        .await
        .for_calendar(calendar_id)?;

    let event_id = created.id.clone().unwrap_or_default();
    info!(calendar_id, event_id = %event_id, conflicts = conflicts.len(), "event created");

    let message = if conflicts.is_empty() {
        format!("Event '{}' created", request.summary())
    } else {
        format!(
            "Event '{}' created; it overlaps {} existing event(s)",
            request.summary(),
            conflicts.len()
        )
    };

    Ok(json!({
        "success": true,
        "event_id": event_id,
        "event_link": created.html_link,
        "message": message,
        "has_conflicts": !conflicts.is_empty(),
        "conflicts": to_json(&conflicts)?,
        "event": to_json(&created)?,
    }))
}

pub struct UpdateEvent;

impl ToolHandler for UpdateEvent {
    fn name(&self) -> &'static str {
        "update-event"
    }

    fn description(&self) -> &'static str {
        "Change fields of an existing event. Fields that are not supplied keep their current values."
    }

    fn input_schema(&self) -> Value {
        schema::update_event()
    }

    fn call<'a>(&'a self, ctx: &'a ToolContext, args: Value) -> BoxFuture<'a, ToolResult<Value>> {
        Box::pin(update_event(ctx, args))
    }
}

/// One bound of an updated event: the effective instant, plus the value to
/// send when the bound was supplied.
fn merged_bound(
    supplied: Option<&str>,
    stored: Option<&EventDateTime>,
    tz: Tz,
    field: &str,
) -> ToolResult<(DateTime<Utc>, Option<EventDateTime>)> {
    match (supplied, stored) {
        (Some(input), _) => {
            let dt = parse_datetime(input, tz)?;
            Ok((
                dt.with_timezone(&Utc),
                Some(EventDateTime::from_datetime(&dt, tz.name())),
            ))
        }
        (None, Some(stored)) => Ok((stored.to_utc(tz)?, None)),
        (None, None) => Err(ToolError::invalid_input(format!(
            "the event has no stored {field} time; supply {field}_datetime as well"
        ))),
    }
}

async fn update_event(ctx: &ToolContext, args: Value) -> ToolResult<Value> {
    let request = UpdateEventRequest::from_args(args)?;
    let calendar_id = request.calendar_id.as_str();
    let event_id = request.event_id.as_str();

    let existing = ctx
        .api
        .get_event(calendar_id, event_id)
        .await
        .for_event(calendar_id, event_id)?;

    let mut patch = request.fields.patch_body()?;
    let mut conflicts = Vec::new();

    if request.fields.changes_time() {
        let tz = ctx.timezone.resolve_or(request.fields.timezone()?).await?;
        let (start, mut new_start) =
            merged_bound(request.fields.start.as_deref(), existing.start.as_ref(), tz, "start")?;
        let (end, mut new_end) =
            merged_bound(request.fields.end.as_deref(), existing.end.as_ref(), tz, "end")?;
        let range = TimeRange::new(start, end)?;

        // Both bounds must be timed once one is; the API rejects a date next
        // to a dateTime.
        if existing.is_all_day() && new_start.is_some() != new_end.is_some() {
            let timed = |at: DateTime<Utc>| {
                EventDateTime::from_datetime(&at.with_timezone(&tz), tz.name())
            };
            new_start.get_or_insert_with(|| timed(start));
            new_end.get_or_insert_with(|| timed(end));
        }

        if let Some(ref start) = new_start {
            patch.insert("start".to_string(), to_json(start)?);
        }
        if let Some(ref end) = new_end {
            patch.insert("end".to_string(), to_json(end)?);
        }
        conflicts = detect_conflicts(ctx, calendar_id, &range, tz, Some(event_id)).await?;
    }

    let patch = Value::Object(patch);
    let options = WriteOptions::for_patch(&patch).with_send_updates(request.send_updates.as_str());
    let updated = ctx
        .api
        .patch_event(calendar_id, event_id, &patch, &options)
        .await
        .for_event(calendar_id, event_id)?;

    let updated_fields = request.fields.changed_fields();
    info!(calendar_id, event_id, fields = ?updated_fields, "event updated");

    let title = updated
        .summary
        .as_deref()
        .or(existing.summary.as_deref())
        .unwrap_or(event_id);
    let message = if conflicts.is_empty() {
        format!("Event '{title}' updated")
    } else {
        format!(
            "Event '{title}' updated; it now overlaps {} existing event(s)",
            conflicts.len()
        )
    };

    Ok(json!({
        "success": true,
        "updated_fields": updated_fields,
        "event_link": updated.html_link,
        "message": message,
        "has_conflicts": !conflicts.is_empty(),
        "conflicts": to_json(&conflicts)?,
        "event": to_json(&updated)?,
    }))
}

pub struct DeleteEvent;

impl ToolHandler for DeleteEvent {
    fn name(&self) -> &'static str {
        "delete-event"
    }

    fn description(&self) -> &'static str {
        "Delete an event. Attendees are notified unless sendUpdates is none or notify_attendees is false."
    }

    fn input_schema(&self) -> Value {
        schema::delete_event()
    }

    fn call<'a>(&'a self, ctx: &'a ToolContext, args: Value) -> BoxFuture<'a, ToolResult<Value>> {
        Box::pin(delete_event(ctx, args))
    }
}

async fn delete_event(ctx: &ToolContext, args: Value) -> ToolResult<Value> {
    let request = DeleteEventRequest::from_args(args)?;
    let calendar_id = request.calendar_id.as_str();
    let event_id = request.event_id.as_str();
    let send_updates = request.send_updates();

    let options = WriteOptions::default().with_send_updates(send_updates.as_str());
    ctx.api
        .delete_event(calendar_id, event_id, &options)
        .await
        .for_event(calendar_id, event_id)?;

    info!(calendar_id, event_id, send_updates = send_updates.as_str(), "event deleted");

    Ok(json!({
        "success": true,
        "event_id": event_id,
        "message": format!("Event '{event_id}' deleted from calendar '{calendar_id}'"),
    }))
}

pub struct CheckAvailability;

impl ToolHandler for CheckAvailability {
    fn name(&self) -> &'static str {
        "check-availability"
    }

    fn description(&self) -> &'static str {
        "Report busy intervals of one or more calendars in a window and whether all of them are free."
    }

    fn input_schema(&self) -> Value {
        schema::check_availability()
    }

    fn call<'a>(&'a self, ctx: &'a ToolContext, args: Value) -> BoxFuture<'a, ToolResult<Value>> {
        Box::pin(check_availability(ctx, args))
    }
}

async fn check_availability(ctx: &ToolContext, args: Value) -> ToolResult<Value> {
    let request = CheckAvailabilityRequest::from_args(args)?;
    let tz = ctx.timezone.resolve_or(request.timezone()?).await?;
    let start = parse_datetime(&request.time_min, tz)?;
    let end = parse_datetime(&request.time_max, tz)?;
    let range = TimeRange::from_instants(&start, &end)?;
    let calendar_ids = request.calendars();

    let query = FreeBusyQuery {
        time_min: format_api_datetime(&range.start),
        time_max: format_api_datetime(&range.end),
        time_zone: Some(tz.name().to_string()),
        group_expansion_max: request.group_expansion_max,
        calendar_expansion_max: request.calendar_expansion_max,
        items: calendar_ids
            .iter()
            .map(|id| FreeBusyItem { id: id.clone() })
            .collect(),
    };
    let response = ctx
        .api
        .query_free_busy(&query)
        .await
        .for_calendar(&calendar_ids.join(", "))?;

    let mut calendars = Map::new();
    let mut errors = Map::new();
    let mut all_free = true;
    let mut not_found = Vec::new();

    for id in &calendar_ids {
        match response.calendars.get(id) {
            Some(entry) if !entry.errors.is_empty() => {
                all_free = false;
                if entry.errors.iter().any(|e| e.reason == "notFound") {
                    not_found.push(id.as_str());
                }
                let reasons: Vec<&str> = entry.errors.iter().map(|e| e.reason.as_str()).collect();
                errors.insert(id.clone(), json!(reasons));
            }
            Some(entry) => {
                let free = entry.busy.is_empty();
                all_free &= free;
                calendars.insert(id.clone(), json!({"busy": entry.busy, "free": free}));
            }
            None => {
                all_free = false;
                errors.insert(id.clone(), json!(["missingFromResponse"]));
            }
        }
    }

    if not_found.len() == calendar_ids.len() {
        return Err(match not_found.as_slice() {
            [single] => ToolError::calendar_not_found(single),
            many => ToolError::new(
                ToolErrorKind::CalendarNotFound,
                format!("none of the calendars were found: {}", many.join(", ")),
            ),
        }
        .with_remediation("use list-calendars to see the calendars this account can access"));
    }

    Ok(json!({
        "time_min": query.time_min,
        "time_max": query.time_max,
        "all_free": all_free,
        "calendars": calendars,
        "errors": errors,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;
    use crate::tools::fake::{FakeCalendar, call_tool, registry, registry_in, timed_event};
    use gcal_mcp_core::Attendee;
    use gcal_mcp_providers::ProviderError;

    fn stored(id: &str, summary: &str, start: &str, end: &str) -> Event {
        Event {
            id: Some(id.to_string()),
            ..timed_event(summary, start, end)
        }
    }

    fn busy_afternoon() -> Arc<FakeCalendar> {
        Arc::new(FakeCalendar::new().with_event(
            "primary",
            stored(
                "busy",
                "Standup",
                "2025-06-01T14:30:00Z",
                "2025-06-01T15:30:00Z",
            ),
        ))
    }

    mod get_events {
        use super::*;

        #[tokio::test]
        async fn lists_window() {
            let fake = busy_afternoon();
            let registry = registry(fake.clone());

            let (is_error, body) = call_tool(
                &registry,
                "get-events",
                json!({"timeMin": "2025-06-01", "timeMax": "2025-06-02", "maxResults": 10}),
            )
            .await;

            assert!(!is_error, "{body}");
            assert_eq!(body["count"], 1);
            assert_eq!(body["events"][0]["id"], "busy");
            assert_eq!(body["time_min"], "2025-06-01T00:00:00Z");

            let params = fake.last_list().unwrap();
            assert_eq!(params.max_results, 10);
            assert_eq!(params.order_by.as_deref(), Some("startTime"));
        }

        #[tokio::test]
        async fn default_window_is_a_week() {
            let fake = Arc::new(FakeCalendar::new());
            let registry = registry(fake.clone());

            let (is_error, _) = call_tool(&registry, "get-events", json!({})).await;
            assert!(!is_error);

            let params = fake.last_list().unwrap();
            assert_eq!(params.time_max - params.time_min, Duration::days(7));
        }

        #[tokio::test]
        async fn unknown_calendar() {
            let registry = registry(Arc::new(FakeCalendar::new()));
            let (is_error, body) =
                call_tool(&registry, "get-events", json!({"calendarId": "nope@example.com"})).await;
            assert!(is_error);
            assert_eq!(body["error"]["kind"], "calendar_not_found");
        }

        #[tokio::test]
        async fn bad_time() {
            let registry = registry(Arc::new(FakeCalendar::new()));
            let (is_error, body) =
                call_tool(&registry, "get-events", json!({"timeMin": "next tuesday"})).await;
            assert!(is_error);
            assert_eq!(body["error"]["kind"], "invalid_time_format");
        }
    }

    mod create_event {
        use super::*;

        fn args(start: &str, end: &str) -> Value {
            json!({
                "summary": "Design review",
                "start_datetime": start,
                "end_datetime": end,
            })
        }

        #[tokio::test]
        async fn overlapping_event_is_reported() {
            let fake = busy_afternoon();
            let registry = registry(fake.clone());

            let (is_error, body) = call_tool(
                &registry,
                "create-event",
                args("2025-06-01T14:00:00", "2025-06-01T15:00:00"),
            )
            .await;

            assert!(!is_error, "{body}");
            assert_eq!(body["success"], true);
            assert_eq!(body["has_conflicts"], true);
            assert_eq!(body["conflicts"].as_array().unwrap().len(), 1);
            assert_eq!(body["conflicts"][0]["event_id"], "busy");
            assert_eq!(body["conflicts"][0]["calendar_id"], "primary");
            assert_eq!(fake.events("primary").len(), 2);
        }

        #[tokio::test]
        async fn adjacent_event_is_not_a_conflict() {
            let registry = registry(busy_afternoon());
            let (_, body) = call_tool(
                &registry,
                "create-event",
                args("2025-06-01T13:30:00Z", "2025-06-01T14:30:00Z"),
            )
            .await;
            assert_eq!(body["has_conflicts"], false);
            assert_eq!(body["conflicts"], json!([]));
        }

        #[tokio::test]
        async fn naive_times_use_requested_zone() {
            let fake = Arc::new(FakeCalendar::new());
            let registry = registry(fake.clone());

            let mut request = args("2025-06-01T10:00:00", "2025-06-01T11:00:00");
            request["timezone"] = json!("America/New_York");
            let (is_error, body) = call_tool(&registry, "create-event", request).await;
            assert!(!is_error, "{body}");

            let start = &body["event"]["start"];
            assert_eq!(start["dateTime"], "2025-06-01T10:00:00-04:00");
            assert_eq!(start["timeZone"], "America/New_York");
        }

        #[tokio::test]
        async fn inverted_range_is_rejected_before_any_write() {
            let fake = Arc::new(FakeCalendar::new());
            let registry = registry(fake.clone());

            let (is_error, body) = call_tool(
                &registry,
                "create-event",
                args("2025-06-01T15:00:00Z", "2025-06-01T14:00:00Z"),
            )
            .await;
            assert!(is_error);
            assert_eq!(body["error"]["kind"], "invalid_time_range");
            assert!(fake.events("primary").is_empty());
            assert!(fake.last_list().is_none());
        }

        #[tokio::test]
        async fn bad_attendee_is_rejected() {
            let fake = Arc::new(FakeCalendar::new());
            let registry = registry(fake.clone());

            let mut request = args("2025-06-01T14:00:00Z", "2025-06-01T15:00:00Z");
            request["attendees"] = json!([{"email": "bob at example"}]);
            let (is_error, body) = call_tool(&registry, "create-event", request).await;
            assert!(is_error);
            assert_eq!(body["error"]["kind"], "invalid_attendee_email");
            assert!(fake.events("primary").is_empty());
        }

        #[tokio::test]
        async fn unknown_calendar() {
            let registry = registry(Arc::new(FakeCalendar::new()));
            let mut request = args("2025-06-01T14:00:00Z", "2025-06-01T15:00:00Z");
            request["calendarId"] = json!("missing@example.com");
            let (is_error, body) = call_tool(&registry, "create-event", request).await;
            assert!(is_error);
            assert_eq!(body["error"]["kind"], "calendar_not_found");
        }

        #[tokio::test]
        async fn write_flags_follow_body() {
            let fake = Arc::new(FakeCalendar::new());
            let registry = registry(fake.clone());

            let mut request = args("2025-06-01T14:00:00Z", "2025-06-01T15:00:00Z");
            request["conferenceData"] = json!({"createRequest": {"requestId": "r1"}});
            request["attachments"] = json!([{"fileUrl": "https://drive.google.com/file/d/1"}]);
            request["sendUpdates"] = json!("none");
            let (is_error, body) = call_tool(&registry, "create-event", request).await;
            assert!(!is_error, "{body}");

            let options = fake.last_options().unwrap();
            assert_eq!(options.send_updates.as_deref(), Some("none"));
            assert_eq!(options.conference_data_version, Some(1));
            assert!(options.supports_attachments);
        }

        #[tokio::test]
        async fn transient_conflict_lookup_does_not_block() {
            let fake = Arc::new(FakeCalendar::new());
            fake.fail_next(ProviderError::server("503"));
            let registry = registry(fake.clone());

            let (is_error, body) = call_tool(
                &registry,
                "create-event",
                args("2025-06-01T14:00:00Z", "2025-06-01T15:00:00Z"),
            )
            .await;
            assert!(!is_error, "{body}");
            assert_eq!(body["has_conflicts"], false);
            assert_eq!(fake.events("primary").len(), 1);
        }

        #[tokio::test]
        async fn missing_credentials_are_an_auth_error() {
            let fake = Arc::new(FakeCalendar::new());
            fake.fail_next(
                ProviderError::authentication("no stored token")
                    .with_remediation("run `gcal-mcp auth`"),
            );
            let registry = registry(fake.clone());

            let (is_error, body) = call_tool(
                &registry,
                "create-event",
                args("2025-06-01T14:00:00Z", "2025-06-01T15:00:00Z"),
            )
            .await;
            assert!(is_error);
            assert_eq!(body["error"]["kind"], "auth_error");
            assert_eq!(body["error"]["remediation"], "run `gcal-mcp auth`");
        }
    }

    mod update_event {
        use super::*;

        fn rich_event() -> Event {
            Event {
                location: Some("Room 4".to_string()),
                attendees: vec![Attendee {
                    email: Some("alice@example.com".to_string()),
                    ..Default::default()
                }],
                ..stored(
                    "e1",
                    "Planning",
                    "2025-06-01T09:00:00Z",
                    "2025-06-01T10:00:00Z",
                )
            }
        }

        #[tokio::test]
        async fn summary_only_keeps_other_fields() {
            let fake = Arc::new(FakeCalendar::new().with_event("primary", rich_event()));
            let registry = registry(fake.clone());

            let (is_error, body) = call_tool(
                &registry,
                "update-event",
                json!({"eventId": "e1", "summary": "New Title"}),
            )
            .await;
            assert!(!is_error, "{body}");
            assert_eq!(body["updated_fields"], json!(["summary"]));

            let event = fake.event("primary", "e1").unwrap();
            assert_eq!(event.summary.as_deref(), Some("New Title"));
            assert_eq!(event.location.as_deref(), Some("Room 4"));
            assert_eq!(event.attendees.len(), 1);
            assert_eq!(event.start, rich_event().start);
            assert_eq!(event.end, rich_event().end);

            // no time change, so no conflict lookup
            assert!(fake.last_list().is_none());
            assert_eq!(fake.last_patch().unwrap(), json!({"summary": "New Title"}));
            assert_eq!(fake.last_options().unwrap().send_updates.as_deref(), Some("all"));
        }

        #[tokio::test]
        async fn moving_an_event_checks_conflicts_but_not_against_itself() {
            let fake = Arc::new(
                FakeCalendar::new()
                    .with_event("primary", rich_event())
                    .with_event(
                        "primary",
                        stored("lunch", "Lunch", "2025-06-01T12:00:00Z", "2025-06-01T13:00:00Z"),
                    ),
            );
            let registry = registry(fake.clone());

            let (is_error, body) = call_tool(
                &registry,
                "update-event",
                json!({
                    "eventId": "e1",
                    "start_datetime": "2025-06-01T09:30:00Z",
                    "end_datetime": "2025-06-01T12:30:00Z"
                }),
            )
            .await;
            assert!(!is_error, "{body}");
            let ids: Vec<&str> = body["conflicts"]
                .as_array()
                .unwrap()
                .iter()
                .map(|c| c["event_id"].as_str().unwrap())
                .collect();
            assert_eq!(ids, vec!["lunch"]);
            assert_eq!(body["event"]["start"]["dateTime"], "2025-06-01T09:30:00Z");
        }

        #[tokio::test]
        async fn merged_range_must_stay_ordered() {
            let fake = Arc::new(FakeCalendar::new().with_event("primary", rich_event()));
            let registry = registry(fake.clone());

            // new end before the stored start
            let (is_error, body) = call_tool(
                &registry,
                "update-event",
                json!({"eventId": "e1", "end_datetime": "2025-06-01T08:00:00Z"}),
            )
            .await;
            assert!(is_error);
            assert_eq!(body["error"]["kind"], "invalid_time_range");
            assert!(fake.last_patch().is_none());
        }

        #[tokio::test]
        async fn moving_one_bound_of_all_day_event_times_the_other() {
            let all_day = Event {
                id: Some("trip".to_string()),
                summary: Some("Offsite".to_string()),
                start: Some(EventDateTime::from_date(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap())),
                end: Some(EventDateTime::from_date(NaiveDate::from_ymd_opt(2025, 6, 3).unwrap())),
                ..Default::default()
            };
            let fake = Arc::new(FakeCalendar::new().with_event("primary", all_day));
            let registry = registry(fake.clone());

            let (is_error, body) = call_tool(
                &registry,
                "update-event",
                json!({"eventId": "trip", "start_datetime": "2025-06-02T09:00:00Z"}),
            )
            .await;
            assert!(!is_error, "{body}");

            let patch = fake.last_patch().unwrap();
            assert_eq!(patch["start"]["dateTime"], "2025-06-02T09:00:00Z");
            assert_eq!(patch["end"]["dateTime"], "2025-06-03T00:00:00Z");
            assert_eq!(patch["end"]["timeZone"], "UTC");
            assert!(patch["end"].get("date").is_none());

            let event = fake.event("primary", "trip").unwrap();
            assert!(!event.is_all_day());
        }

        #[tokio::test]
        async fn moving_one_bound_of_timed_event_sends_only_that_bound() {
            let fake = Arc::new(FakeCalendar::new().with_event("primary", rich_event()));
            let registry = registry(fake.clone());

            let (is_error, body) = call_tool(
                &registry,
                "update-event",
                json!({"eventId": "e1", "end_datetime": "2025-06-01T11:00:00Z"}),
            )
            .await;
            assert!(!is_error, "{body}");

            let patch = fake.last_patch().unwrap();
            assert!(patch.get("start").is_none());
            assert_eq!(patch["end"]["dateTime"], "2025-06-01T11:00:00Z");
        }

        #[tokio::test]
        async fn missing_event() {
            let registry = registry(Arc::new(FakeCalendar::new()));
            let (is_error, body) = call_tool(
                &registry,
                "update-event",
                json!({"eventId": "ghost", "summary": "x"}),
            )
            .await;
            assert!(is_error);
            assert_eq!(body["error"]["kind"], "event_not_found");
        }
    }

    mod delete_event {
        use super::*;

        #[tokio::test]
        async fn deletes_and_honors_notification_flag() {
            let fake = busy_afternoon();
            let registry = registry(fake.clone());

            let (is_error, body) = call_tool(
                &registry,
                "delete-event",
                json!({"eventId": "busy", "notify_attendees": false}),
            )
            .await;
            assert!(!is_error, "{body}");
            assert_eq!(body["success"], true);
            assert!(fake.events("primary").is_empty());
            assert_eq!(fake.last_options().unwrap().send_updates.as_deref(), Some("none"));
        }

        #[tokio::test]
        async fn missing_event_leaves_others_alone() {
            let fake = busy_afternoon();
            let registry = registry(fake.clone());

            let (is_error, body) =
                call_tool(&registry, "delete-event", json!({"eventId": "ghost"})).await;
            assert!(is_error);
            assert_eq!(body["error"]["kind"], "event_not_found");
            assert_eq!(fake.events("primary").len(), 1);
        }
    }

    mod check_availability {
        use super::*;

        fn window(items: Value) -> Value {
            json!({
                "items": items,
                "timeMin": "2025-06-01T09:00:00Z",
                "timeMax": "2025-06-01T17:00:00Z"
            })
        }

        #[tokio::test]
        async fn one_busy_one_free() {
            let fake = Arc::new(
                FakeCalendar::new()
                    .with_calendar("b@example.com", "B")
                    .with_event(
                        "primary",
                        stored("busy", "Standup", "2025-06-01T14:30:00Z", "2025-06-01T15:30:00Z"),
                    ),
            );
            let registry = registry(fake);

            let (is_error, body) = call_tool(
                &registry,
                "check-availability",
                window(json!([{"id": "primary"}, {"id": "b@example.com"}])),
            )
            .await;
            assert!(!is_error, "{body}");
            assert_eq!(body["all_free"], false);
            assert_eq!(body["calendars"]["primary"]["free"], false);
            assert_eq!(
                body["calendars"]["primary"]["busy"],
                json!([{"start": "2025-06-01T14:30:00Z", "end": "2025-06-01T15:30:00Z"}])
            );
            assert_eq!(body["calendars"]["b@example.com"]["free"], true);
            assert_eq!(body["calendars"]["b@example.com"]["busy"], json!([]));
        }

        #[tokio::test]
        async fn all_free() {
            let registry = registry(Arc::new(FakeCalendar::new()));
            let (_, body) = call_tool(
                &registry,
                "check-availability",
                window(json!([{"id": "primary"}])),
            )
            .await;
            assert_eq!(body["all_free"], true);
            assert_eq!(body["errors"], json!({}));
        }

        #[tokio::test]
        async fn partly_unknown_calendars_are_reported() {
            let registry = registry(Arc::new(FakeCalendar::new()));
            let (is_error, body) = call_tool(
                &registry,
                "check-availability",
                window(json!([{"id": "primary"}, {"id": "ghost@example.com"}])),
            )
            .await;
            assert!(!is_error);
            assert_eq!(body["all_free"], false);
            assert_eq!(body["errors"]["ghost@example.com"], json!(["notFound"]));
        }

        #[tokio::test]
        async fn only_unknown_calendars() {
            let registry = registry(Arc::new(FakeCalendar::new()));
            let (is_error, body) = call_tool(
                &registry,
                "check-availability",
                window(json!([{"id": "ghost@example.com"}])),
            )
            .await;
            assert!(is_error);
            assert_eq!(body["error"]["kind"], "calendar_not_found");
        }
    }

    /// Offset-less inputs read in the account timezone when no zone is given.
    mod account_timezone {
        use super::*;
        use crate::tools::{ToolContext, ToolRegistry};

        const NEW_YORK: Tz = Tz::America__New_York;

        #[tokio::test]
        async fn get_events() {
            let fake = Arc::new(FakeCalendar::new());
            let registry = registry_in(fake.clone(), NEW_YORK);

            let (is_error, body) = call_tool(
                &registry,
                "get-events",
                json!({"timeMin": "2025-06-01T09:00:00", "timeMax": "2025-06-01T17:00:00"}),
            )
            .await;
            assert!(!is_error, "{body}");
            assert_eq!(body["time_min"], "2025-06-01T13:00:00Z");

            let params = fake.last_list().unwrap();
            assert_eq!(format_api_datetime(&params.time_max), "2025-06-01T21:00:00Z");
        }

        #[tokio::test]
        async fn create_event() {
            let fake = Arc::new(FakeCalendar::new());
            let registry = registry_in(fake.clone(), NEW_YORK);

            let (is_error, body) = call_tool(
                &registry,
                "create-event",
                json!({
                    "summary": "Sync",
                    "start_datetime": "2025-06-01T10:00:00",
                    "end_datetime": "2025-06-01T11:00:00"
                }),
            )
            .await;
            assert!(!is_error, "{body}");

            let stored = &fake.events("primary")[0];
            let start = stored.start.as_ref().unwrap();
            assert_eq!(start.date_time.as_deref(), Some("2025-06-01T10:00:00-04:00"));
            assert_eq!(start.time_zone.as_deref(), Some("America/New_York"));
        }

        #[tokio::test]
        async fn update_event() {
            let fake = Arc::new(FakeCalendar::new().with_event(
                "primary",
                stored("e1", "Planning", "2025-06-01T13:00:00Z", "2025-06-01T14:00:00Z"),
            ));
            let registry = registry_in(fake.clone(), NEW_YORK);

            let (is_error, body) = call_tool(
                &registry,
                "update-event",
                json!({"eventId": "e1", "end_datetime": "2025-06-01T11:00:00"}),
            )
            .await;
            assert!(!is_error, "{body}");

            let patch = fake.last_patch().unwrap();
            assert_eq!(patch["end"]["dateTime"], "2025-06-01T11:00:00-04:00");
            assert_eq!(patch["end"]["timeZone"], "America/New_York");

            let event = fake.event("primary", "e1").unwrap();
            let range = event.time_range(Tz::UTC).unwrap();
            assert_eq!(format_api_datetime(&range.end), "2025-06-01T15:00:00Z");
        }

        #[tokio::test]
        async fn check_availability() {
            let fake = Arc::new(FakeCalendar::new());
            let registry = registry_in(fake.clone(), NEW_YORK);

            let (is_error, body) = call_tool(
                &registry,
                "check-availability",
                json!({
                    "calendarIds": ["primary"],
                    "timeMin": "2025-06-01T09:00:00",
                    "timeMax": "2025-06-01T17:00:00"
                }),
            )
            .await;
            assert!(!is_error, "{body}");
            assert_eq!(body["time_min"], "2025-06-01T13:00:00Z");
            assert_eq!(body["time_max"], "2025-06-01T21:00:00Z");

            let query = fake.last_free_busy().unwrap();
            assert_eq!(query.time_zone.as_deref(), Some("America/New_York"));
        }

        #[tokio::test]
        async fn explicit_zone_still_wins_for_check_availability() {
            let fake = Arc::new(FakeCalendar::new());
            let registry = registry_in(fake.clone(), NEW_YORK);

            let (is_error, body) = call_tool(
                &registry,
                "check-availability",
                json!({
                    "calendarIds": ["primary"],
                    "timeMin": "2025-06-01T09:00:00",
                    "timeMax": "2025-06-01T17:00:00",
                    "timeZone": "Europe/Paris"
                }),
            )
            .await;
            assert!(!is_error, "{body}");
            assert_eq!(body["time_min"], "2025-06-01T07:00:00Z");
            assert_eq!(
                fake.last_free_busy().unwrap().time_zone.as_deref(),
                Some("Europe/Paris")
            );
        }

        #[tokio::test]
        async fn looked_up_zone_matches_between_listing_and_free_busy() {
            let fake = Arc::new(FakeCalendar::new().with_timezone("America/New_York"));
            let registry = ToolRegistry::with_calendar_tools(ToolContext::new(fake.clone()));
            let window = json!({
                "calendarIds": ["primary"],
                "timeMin": "2025-06-01T09:00:00",
                "timeMax": "2025-06-01T17:00:00"
            });

            let (_, events) = call_tool(&registry, "get-events", window.clone()).await;
            let (is_error, availability) =
                call_tool(&registry, "check-availability", window).await;
            assert!(!is_error, "{availability}");

            assert_eq!(events["time_min"], "2025-06-01T13:00:00Z");
            assert_eq!(availability["time_min"], events["time_min"]);
            assert_eq!(availability["time_max"], events["time_max"]);
        }
    }
}
