use gcal_mcp_core::Calendar;
use gcal_mcp_providers::BoxFuture;
use serde_json::{Value, json};

use super::error::{ProviderResultExt, ToolResult};
use super::{ToolContext, ToolHandler, schema};

pub struct ListCalendars;

impl ToolHandler for ListCalendars {
    fn name(&self) -> &'static str {
        "list-calendars"
    }

    fn description(&self) -> &'static str {
        "List the calendars this account can see, with their ids, timezones and access roles."
    }

    fn input_schema(&self) -> Value {
        schema::empty()
    }

    fn call<'a>(&'a self, ctx: &'a ToolContext, _args: Value) -> BoxFuture<'a, ToolResult<Value>> {
        Box::pin(async move {
            let calendars = ctx.api.list_calendars().await.for_calendar("calendarList")?;
            let summaries: Vec<Value> = calendars.iter().map(summarize).collect();
            Ok(json!({
                "count": summaries.len(),
                "calendars": summaries,
            }))
        })
    }
}

fn summarize(calendar: &Calendar) -> Value {
    json!({
        "id": calendar.id,
        "summary": calendar.summary,
        "description": calendar.description,
        "timezone": calendar.time_zone,
        "access_role": calendar.access_role,
        "primary": calendar.primary,
        "background_color": calendar.background_color,
    })
}
