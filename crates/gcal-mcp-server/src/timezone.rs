//! Account timezone resolution.

use std::sync::{Arc, OnceLock};

use gcal_mcp_core::{Tz, parse_timezone};
use gcal_mcp_providers::{CalendarApi, ProviderErrorCode};
use tracing::{debug, warn};

use crate::tools::{ProviderResultExt, ToolResult};

/// Resolves the account's default timezone once and remembers it.
///
/// The value comes from the account settings. Only a successful lookup is
/// cached; a transient failure falls back to UTC for the current call and
/// the next call tries again.
pub struct TimezoneResolver {
    api: Arc<dyn CalendarApi>,
    cached: OnceLock<Tz>,
}

impl TimezoneResolver {
    pub fn new(api: Arc<dyn CalendarApi>) -> Self {
        Self {
            api,
            cached: OnceLock::new(),
        }
    }

    /// A resolver that never asks the API.
    pub fn fixed(api: Arc<dyn CalendarApi>, tz: Tz) -> Self {
        let cached = OnceLock::new();
        let _ = cached.set(tz);
        Self { api, cached }
    }

    /// Returns the account timezone.
    ///
    /// Authentication failures are reported, since every other call would
    /// fail the same way.
    pub async fn resolve(&self) -> ToolResult<Tz> {
        if let Some(tz) = self.cached.get() {
            return Ok(*tz);
        }

        match self.api.get_timezone_setting().await {
            Ok(name) => {
                let tz = match parse_timezone(&name) {
                    Ok(tz) => tz,
                    Err(_) => {
                        warn!(timezone = %name, "account timezone is not an IANA zone, using UTC");
                        Tz::UTC
                    }
                };
                debug!(timezone = %tz, "resolved account timezone");
                Ok(*self.cached.get_or_init(|| tz))
            }
            Err(e)
                if matches!(
                    e.code(),
                    ProviderErrorCode::AuthenticationFailed | ProviderErrorCode::ConfigurationError
                ) =>
            {
                Err::<Tz, _>(e).for_calendar("primary")
            }
            Err(e) => {
                warn!(error = %e, "cannot read account timezone, using UTC");
                Ok(Tz::UTC)
            }
        }
    }

    /// Uses `requested` when given, the account timezone otherwise.
    pub async fn resolve_or(&self, requested: Option<Tz>) -> ToolResult<Tz> {
        match requested {
            Some(tz) => Ok(tz),
            None => self.resolve().await,
        }
    }
}
