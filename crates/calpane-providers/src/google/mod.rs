//! Google Calendar source.
//!
//! [`GoogleCalendarClient`] talks to the Calendar API v3 with a bearer
//! access token supplied by the caller:
//!
//! - `GET /calendars/{id}/events` with `timeMin`/`timeMax` and
//!   `singleEvents=true`, following `nextPageToken`
//! - `GET /users/me/calendarList` for source discovery
//! - `DELETE /calendars/{id}/events/{eventId}`
//!
//! # Example
//!
//! ```ignore
//! use calpane_providers::google::{GoogleCalendarClient, GoogleConfig};
//!
//! let client = GoogleCalendarClient::new(GoogleConfig::new(token))?;
//! let calendars = client.list_calendars().await?;
//! ```

mod client;
mod config;

pub use client::GoogleCalendarClient;
pub use config::GoogleConfig;
