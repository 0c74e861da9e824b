//! Calendar backend access for the MCP tools.
//!
//! - [`CalendarApi`]: the trait tool handlers call
//! - [`google`]: the Google Calendar v3 implementation and its OAuth plumbing
//! - [`ProviderError`]: classified backend failures
//! - [`with_retry`]: exponential backoff for transient failures
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  tool handlers   │
//! └────────┬─────────┘
//!          │ CalendarApi
//!          ▼
//! ┌──────────────────────┐      ┌──────────────────────┐
//! │ GoogleCalendarClient │─────▶│  CredentialProvider  │
//! └────────┬─────────────┘      └──────────┬───────────┘
//!          │ with_retry                    │ refresh / consent
//!          ▼                               ▼
//! ┌──────────────────┐          ┌──────────────────────┐
//! │ Calendar API v3  │          │  OAuth token endpoint │
//! └──────────────────┘          └──────────────────────┘
//! ```

pub mod api;
pub mod error;
pub mod google;
pub mod retry;

pub use api::{BoxFuture, CalendarApi, ListEventsParams, MAX_EVENTS_PER_PAGE, WriteOptions};
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use retry::{RetryConfig, with_retry};
