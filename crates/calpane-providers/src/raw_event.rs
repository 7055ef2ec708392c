//! Raw event records as returned by a remote source.
//!
//! Remote calendar APIs hand back loosely-shaped JSON objects: every field
//! may be missing, times come either as a date or as an RFC 3339 datetime,
//! and the id is not guaranteed to be present on malformed entries.
//! [`RawEvent`] mirrors that shape faithfully (everything optional) so that
//! deserialization never fails on a single bad record; the typed
//! [`EventRecord`](calpane_core::EventRecord) is only produced by
//! [`normalize_event`](crate::normalize::normalize_event).

use serde::{Deserialize, Serialize};

/// Start or end of a raw event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEventTime {
    /// All-day date, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// RFC 3339 datetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// IANA timezone the event was created in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl RawEventTime {
    /// Creates a datetime-valued time.
    pub fn date_time(value: impl Into<String>) -> Self {
        Self {
            date_time: Some(value.into()),
            ..Self::default()
        }
    }

    /// Creates an all-day time.
    pub fn date(value: impl Into<String>) -> Self {
        Self {
            date: Some(value.into()),
            ..Self::default()
        }
    }
}

/// One event object as received from the remote API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Event identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Title.
    #[serde(default)]
    pub summary: Option<String>,
    /// Description (may contain HTML).
    #[serde(default)]
    pub description: Option<String>,
    /// Location text.
    #[serde(default)]
    pub location: Option<String>,
    /// Start time.
    #[serde(default)]
    pub start: Option<RawEventTime>,
    /// End time.
    #[serde(default)]
    pub end: Option<RawEventTime>,
    /// Link to the event in the provider UI.
    #[serde(default)]
    pub html_link: Option<String>,
    /// `confirmed`, `tentative` or `cancelled`.
    #[serde(default)]
    pub status: Option<String>,
    /// Provider palette index for per-event colors.
    #[serde(default)]
    pub color_id: Option<String>,
    /// Series id when this is an instance of a recurring event.
    #[serde(default)]
    pub recurring_event_id: Option<String>,
    /// Entity tag of this revision.
    #[serde(default)]
    pub etag: Option<String>,
}

impl RawEvent {
    /// Creates a timed raw event.
    pub fn timed(
        id: impl Into<String>,
        summary: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            summary: Some(summary.into()),
            start: Some(RawEventTime::date_time(start)),
            end: Some(RawEventTime::date_time(end)),
            ..Self::default()
        }
    }

    /// Creates an all-day raw event.
    pub fn all_day(
        id: impl Into<String>,
        summary: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            summary: Some(summary.into()),
            start: Some(RawEventTime::date(start)),
            end: Some(RawEventTime::date(end)),
            ..Self::default()
        }
    }

    /// Returns the effective title, falling back to "(No title)" if empty.
    pub fn effective_title(&self) -> &str {
        self.summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("(No title)")
    }

    /// Returns true if the event is cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.eq_ignore_ascii_case("cancelled"))
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set the status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Builder method to set the palette color.
    pub fn with_color_id(mut self, color_id: impl Into<String>) -> Self {
        self.color_id = Some(color_id.into());
        self
    }
}
