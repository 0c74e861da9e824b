//! In-memory [`CalendarApi`] used by handler and transport tests.

use std::collections::BTreeMap;
use std::future::ready;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use gcal_mcp_core::{
    BusyPeriod, Calendar, Event, EventDateTime, FreeBusyCalendar, FreeBusyError, FreeBusyQuery,
    FreeBusyResponse, TimeRange, Tz, format_api_datetime,
};
use gcal_mcp_providers::{
    BoxFuture, CalendarApi, ListEventsParams, ProviderError, ProviderResult, WriteOptions,
};
use serde_json::Value;

use super::{ToolContext, ToolRegistry};
use crate::timezone::TimezoneResolver;

/// A registry over `fake` whose account timezone is UTC.
pub fn registry(fake: Arc<FakeCalendar>) -> ToolRegistry {
    registry_in(fake, Tz::UTC)
}

/// A registry over `fake` whose account timezone is `tz`.
pub fn registry_in(fake: Arc<FakeCalendar>, tz: Tz) -> ToolRegistry {
    let timezone = TimezoneResolver::fixed(fake.clone(), tz);
    ToolRegistry::with_calendar_tools(ToolContext::with_timezone(fake, timezone))
}

/// Calls a tool and decodes its JSON body. Returns `(is_error, body)`.
pub async fn call_tool(registry: &ToolRegistry, name: &str, args: Value) -> (bool, Value) {
    let result = registry.call(name, args).await.expect("tool is registered");
    let body = serde_json::from_str(result.content[0].as_text()).expect("tool output is JSON");
    (result.is_error, body)
}

/// Builds a timed event in UTC.
pub fn timed_event(summary: &str, start: &str, end: &str) -> Event {
    Event {
        summary: Some(summary.to_string()),
        start: Some(EventDateTime {
            date_time: Some(start.to_string()),
            date: None,
            time_zone: Some("UTC".to_string()),
        }),
        end: Some(EventDateTime {
            date_time: Some(end.to_string()),
            date: None,
            time_zone: Some("UTC".to_string()),
        }),
        ..Default::default()
    }
}

#[derive(Default)]
struct FakeState {
    calendars: BTreeMap<String, Calendar>,
    events: BTreeMap<String, Vec<Event>>,
    timezone: String,
    timezone_lookups: usize,
    next_id: usize,
    failures: Vec<ProviderError>,
    last_options: Option<WriteOptions>,
    last_patch: Option<Value>,
    last_list: Option<ListEventsParams>,
    last_free_busy: Option<FreeBusyQuery>,
}

pub struct FakeCalendar {
    state: Mutex<FakeState>,
}

impl FakeCalendar {
    /// A fake with only the primary calendar, in UTC.
    pub fn new() -> Self {
        let fake = Self {
            state: Mutex::new(FakeState {
                timezone: "UTC".to_string(),
                ..Default::default()
            }),
        };
        fake.with_calendar("primary", "me@example.com")
    }

    pub fn with_timezone(self, name: &str) -> Self {
        self.state.lock().unwrap().timezone = name.to_string();
        self
    }

    pub fn with_calendar(self, id: &str, summary: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.calendars.insert(
                id.to_string(),
                Calendar {
                    id: id.to_string(),
                    summary: summary.to_string(),
                    time_zone: Some("UTC".to_string()),
                    access_role: Some("owner".to_string()),
                    primary: id == "primary",
                    ..Default::default()
                },
            );
            state.events.entry(id.to_string()).or_default();
        }
        self
    }

    /// Stores `event` as-is; it must carry an id.
    pub fn with_event(self, calendar_id: &str, event: Event) -> Self {
        self.state
            .lock()
            .unwrap()
            .events
            .entry(calendar_id.to_string())
            .or_default()
            .push(event);
        self
    }

    /// Makes the next API call fail with `err`.
    pub fn fail_next(&self, err: ProviderError) {
        self.state.lock().unwrap().failures.push(err);
    }

    pub fn events(&self, calendar_id: &str) -> Vec<Event> {
        self.state
            .lock()
            .unwrap()
            .events
            .get(calendar_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn event(&self, calendar_id: &str, event_id: &str) -> Option<Event> {
        self.events(calendar_id)
            .into_iter()
            .find(|e| e.id.as_deref() == Some(event_id))
    }

    pub fn timezone_lookups(&self) -> usize {
        self.state.lock().unwrap().timezone_lookups
    }

    pub fn last_options(&self) -> Option<WriteOptions> {
        self.state.lock().unwrap().last_options.clone()
    }

    pub fn last_patch(&self) -> Option<Value> {
        self.state.lock().unwrap().last_patch.clone()
    }

    pub fn last_list(&self) -> Option<ListEventsParams> {
        self.state.lock().unwrap().last_list.clone()
    }

    pub fn last_free_busy(&self) -> Option<FreeBusyQuery> {
        self.state.lock().unwrap().last_free_busy.clone()
    }

    fn take_failure(state: &mut FakeState) -> ProviderResult<()> {
        if state.failures.is_empty() {
            Ok(())
        } else {
            Err(state.failures.remove(0))
        }
    }

    fn calendar_events<'s>(
        state: &'s mut FakeState,
        calendar_id: &str,
    ) -> ProviderResult<&'s mut Vec<Event>> {
        state
            .events
            .get_mut(calendar_id)
            .ok_or_else(|| ProviderError::not_found(format!("calendar {calendar_id}")))
    }

    fn do_list(&self, params: &ListEventsParams) -> ProviderResult<Vec<Event>> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state)?;
        state.last_list = Some(params.clone());

        let window = TimeRange::new(params.time_min, params.time_max)
            .map_err(|e| ProviderError::bad_request(e.to_string()))?;
        let calendar_id = params.calendar_id.clone();
        let mut events: Vec<Event> = Self::calendar_events(&mut state, &calendar_id)?
            .iter()
            .filter(|e| !e.is_cancelled())
            .filter(|e| e.time_range(Tz::UTC).is_some_and(|r| r.overlaps(&window)))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.time_range(Tz::UTC).map(|r| r.start));
        events.truncate(params.max_results as usize);
        Ok(events)
    }

    fn do_get(&self, calendar_id: &str, event_id: &str) -> ProviderResult<Event> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state)?;
        Self::calendar_events(&mut state, calendar_id)?
            .iter()
            .find(|e| e.id.as_deref() == Some(event_id))
            .cloned()
            .ok_or_else(|| ProviderError::not_found(format!("event {event_id}")))
    }

    fn do_insert(
        &self,
        calendar_id: &str,
        event: &Event,
        options: &WriteOptions,
    ) -> ProviderResult<Event> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state)?;
        state.next_id += 1;
        let id = format!("evt-{}", state.next_id);
        state.last_options = Some(options.clone());

        let mut stored = event.clone();
        stored.html_link = Some(format!("https://calendar.google.com/event?eid={id}"));
        stored.status = Some("confirmed".to_string());
        stored.id = Some(id);
        Self::calendar_events(&mut state, calendar_id)?.push(stored.clone());
        Ok(stored)
    }

    fn do_patch(
        &self,
        calendar_id: &str,
        event_id: &str,
        patch: &Value,
        options: &WriteOptions,
    ) -> ProviderResult<Event> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state)?;
        state.last_patch = Some(patch.clone());
        state.last_options = Some(options.clone());

        let events = Self::calendar_events(&mut state, calendar_id)?;
        let existing = events
            .iter_mut()
            .find(|e| e.id.as_deref() == Some(event_id))
            .ok_or_else(|| ProviderError::not_found(format!("event {event_id}")))?;

        let mut merged = serde_json::to_value(&*existing)
            .map_err(|e| ProviderError::internal(e.to_string()))?;
        if let (Some(target), Some(fields)) = (merged.as_object_mut(), patch.as_object()) {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }
        let calendar = existing.calendar_id.clone();
        let mut updated: Event = serde_json::from_value(merged)
            .map_err(|e| ProviderError::bad_request(e.to_string()))?;
        updated.calendar_id = calendar;
        *existing = updated.clone();
        Ok(updated)
    }

    fn do_delete(
        &self,
        calendar_id: &str,
        event_id: &str,
        options: &WriteOptions,
    ) -> ProviderResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state)?;
        state.last_options = Some(options.clone());

        let events = Self::calendar_events(&mut state, calendar_id)?;
        let before = events.len();
        events.retain(|e| e.id.as_deref() != Some(event_id));
        if events.len() == before {
            return Err(ProviderError::not_found(format!("event {event_id}")));
        }
        Ok(())
    }

    fn do_free_busy(&self, query: &FreeBusyQuery) -> ProviderResult<FreeBusyResponse> {
        let mut state = self.state.lock().unwrap();
        Self::take_failure(&mut state)?;
        state.last_free_busy = Some(query.clone());

        let parse = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| ProviderError::bad_request(e.to_string()))
        };
        let window = TimeRange::new(parse(&query.time_min)?, parse(&query.time_max)?)
            .map_err(|e| ProviderError::bad_request(e.to_string()))?;

        let mut calendars = BTreeMap::new();
        for item in &query.items {
            let entry = match state.events.get(&item.id) {
                Some(events) => FreeBusyCalendar {
                    busy: events
                        .iter()
                        .filter(|e| !e.is_cancelled())
                        .filter(|e| e.transparency.as_deref() != Some("transparent"))
                        .filter_map(|e| e.time_range(Tz::UTC))
                        .filter(|r| r.overlaps(&window))
                        .map(|r| BusyPeriod {
                            start: format_api_datetime(&r.start.max(window.start)),
                            end: format_api_datetime(&r.end.min(window.end)),
                        })
                        .collect(),
                    errors: Vec::new(),
                },
                None => FreeBusyCalendar {
                    busy: Vec::new(),
                    errors: vec![FreeBusyError {
                        domain: "global".to_string(),
                        reason: "notFound".to_string(),
                    }],
                },
            };
            calendars.insert(item.id.clone(), entry);
        }

        Ok(FreeBusyResponse {
            time_min: Some(query.time_min.clone()),
            time_max: Some(query.time_max.clone()),
            calendars,
        })
    }
}

impl CalendarApi for FakeCalendar {
    fn list_events<'a>(
        &'a self,
        params: &'a ListEventsParams,
    ) -> BoxFuture<'a, ProviderResult<Vec<Event>>> {
        Box::pin(ready(self.do_list(params)))
    }

    fn get_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Event>> {
        Box::pin(ready(self.do_get(calendar_id, event_id)))
    }

    fn insert_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: &'a Event,
        options: &'a WriteOptions,
    ) -> BoxFuture<'a, ProviderResult<Event>> {
        Box::pin(ready(self.do_insert(calendar_id, event, options)))
    }

    fn patch_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
        patch: &'a Value,
        options: &'a WriteOptions,
    ) -> BoxFuture<'a, ProviderResult<Event>> {
        Box::pin(ready(self.do_patch(calendar_id, event_id, patch, options)))
    }

    fn delete_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
        options: &'a WriteOptions,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(ready(self.do_delete(calendar_id, event_id, options)))
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<Calendar>>> {
        let result = {
            let mut state = self.state.lock().unwrap();
            Self::take_failure(&mut state).map(|()| state.calendars.values().cloned().collect())
        };
        Box::pin(ready(result))
    }

    fn query_free_busy<'a>(
        &'a self,
        query: &'a FreeBusyQuery,
    ) -> BoxFuture<'a, ProviderResult<FreeBusyResponse>> {
        Box::pin(ready(self.do_free_busy(query)))
    }

    fn get_timezone_setting(&self) -> BoxFuture<'_, ProviderResult<String>> {
        let result = {
            let mut state = self.state.lock().unwrap();
            state.timezone_lookups += 1;
            Self::take_failure(&mut state).map(|()| state.timezone.clone())
        };
        Box::pin(ready(result))
    }
}
