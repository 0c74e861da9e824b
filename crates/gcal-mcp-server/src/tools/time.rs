//! Clock tools.
//!
//! Agents often have a stale idea of the current date; these tools give
//! them the real one in the account's timezone.

use chrono::{DateTime, Utc};
use gcal_mcp_core::{Tz, format_api_datetime};
use gcal_mcp_providers::BoxFuture;
use serde_json::{Value, json};

use super::error::ToolResult;
use super::requests::GetCurrentDateRequest;
use super::{ToolContext, ToolHandler, schema};

pub struct GetTimezoneInfo;

impl ToolHandler for GetTimezoneInfo {
    fn name(&self) -> &'static str {
        "get-timezone-info"
    }

    fn description(&self) -> &'static str {
        "Show the account's default timezone with the current UTC and local time."
    }

    fn input_schema(&self) -> Value {
        schema::empty()
    }

    fn call<'a>(&'a self, ctx: &'a ToolContext, _args: Value) -> BoxFuture<'a, ToolResult<Value>> {
        Box::pin(async move {
            let tz = ctx.timezone.resolve().await?;
            Ok(timezone_info(tz, Utc::now()))
        })
    }
}

fn timezone_info(tz: Tz, now: DateTime<Utc>) -> Value {
    let local = now.with_timezone(&tz);
    json!({
        "timezone": tz.name(),
        "current_utc_time": format_api_datetime(&now),
        "current_local_time": format_api_datetime(&local),
        "utc_offset": local.format("%z").to_string(),
        "timezone_name": local.format("%Z").to_string(),
    })
}

pub struct GetCurrentDate;

impl ToolHandler for GetCurrentDate {
    fn name(&self) -> &'static str {
        "get-current-date"
    }

    fn description(&self) -> &'static str {
        "Get today's date and the current time. Call this before scheduling relative to \"today\" or \"next week\"."
    }

    fn input_schema(&self) -> Value {
        schema::get_current_date()
    }

    fn call<'a>(&'a self, ctx: &'a ToolContext, args: Value) -> BoxFuture<'a, ToolResult<Value>> {
        Box::pin(async move {
            let request = GetCurrentDateRequest::from_args(args)?;
            let tz = ctx.timezone.resolve_or(request.timezone()?).await?;
            Ok(current_date(tz, Utc::now()))
        })
    }
}

fn current_date(tz: Tz, now: DateTime<Utc>) -> Value {
    let local = now.with_timezone(&tz);
    json!({
        "current_date": local.format("%Y-%m-%d").to_string(),
        "current_time": local.format("%H:%M:%S").to_string(),
        "current_datetime": local.format("%Y-%m-%d %H:%M:%S").to_string(),
        "current_datetime_iso": format_api_datetime(&local),
        "timezone": tz.name(),
        "day_of_week": local.format("%A").to_string(),
        "formatted_date": local.format("%B %d, %Y").to_string(),
        "utc_datetime": format_api_datetime(&now),
        "timestamp": now.timestamp(),
    })
}
