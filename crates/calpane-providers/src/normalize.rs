//! RawEvent to EventRecord conversion.
//!
//! This is the only place loosely-shaped server data becomes a typed
//! [`EventRecord`]. A record that lacks an id or has unusable times is
//! rejected with a [`NormalizeError`] instead of being carried forward with
//! holes in it.

use calpane_core::{EventRecord, EventStyle, EventTime};
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use tracing::{trace, warn};

use crate::raw_event::{RawEvent, RawEventTime};
use crate::source::CalendarInfo;

/// Why a raw record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// The record has no id.
    #[error("event without id")]
    MissingId,
    /// The record is cancelled and must not be displayed.
    #[error("event {id} is cancelled")]
    Cancelled { id: String },
    /// Start or end is absent or carries neither date nor datetime.
    #[error("event {id} has no {field} time")]
    MissingTime { id: String, field: &'static str },
    /// Start or end did not parse.
    #[error("event {id} has an invalid {field} time {value:?}")]
    InvalidTime {
        id: String,
        field: &'static str,
        value: String,
    },
    /// The end lies before the start.
    #[error("event {id} ends before it starts")]
    EndBeforeStart { id: String },
}

/// Per-calendar styling applied to every record of that calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceStyle {
    /// Calendar background color.
    pub background_color: Option<String>,
    /// Calendar text color.
    pub text_color: Option<String>,
    /// Whether events may be edited from the view.
    pub editable: bool,
}

impl SourceStyle {
    /// Derives the style of a calendar from its list entry.
    pub fn from_calendar(info: &CalendarInfo) -> Self {
        Self {
            background_color: info.background_color.clone(),
            text_color: info.foreground_color.clone(),
            editable: info.is_writable(),
        }
    }
}

/// Result of normalizing one fetch worth of raw records.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    /// Records that passed validation, in server order.
    pub records: Vec<EventRecord>,
    /// Records dropped because they are cancelled.
    pub cancelled: usize,
    /// Records rejected as malformed.
    pub rejected: Vec<NormalizeError>,
}

/// Converts one raw record into an [`EventRecord`].
pub fn normalize_event(
    raw: &RawEvent,
    calendar_id: &str,
    style: &SourceStyle,
) -> Result<EventRecord, NormalizeError> {
    let id = raw
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(NormalizeError::MissingId)?;

    if raw.is_cancelled() {
        return Err(NormalizeError::Cancelled { id: id.to_string() });
    }

    let start = convert_time(id, "start", raw.start.as_ref())?;
    let end = convert_time(id, "end", raw.end.as_ref())?;
    if end < start {
        return Err(NormalizeError::EndBeforeStart { id: id.to_string() });
    }

    let mut class_names = Vec::new();
    if raw.recurring_event_id.is_some() {
        class_names.push("recurring".to_string());
    }
    if raw
        .status
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("tentative"))
    {
        class_names.push("tentative".to_string());
    }

    let background_color = raw
        .color_id
        .as_deref()
        .and_then(palette_color)
        .map(String::from)
        .or_else(|| style.background_color.clone());

    let mut record = EventRecord::new(id, raw.effective_title(), start, end, calendar_id)
        .with_style(EventStyle {
            background_color,
            text_color: style.text_color.clone(),
            class_names,
            editable: style.editable,
        });

    if let Some(ref description) = raw.description {
        record = record.with_description(description);
    }
    if let Some(ref location) = raw.location {
        record = record.with_location(location);
    }
    if let Some(ref link) = raw.html_link {
        record = record.with_html_link(link);
    }

    Ok(record)
}

/// Converts a batch of raw records, splitting out rejects.
pub fn normalize_events(raws: &[RawEvent], calendar_id: &str, style: &SourceStyle) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    for raw in raws {
        match normalize_event(raw, calendar_id, style) {
            Ok(record) => batch.records.push(record),
            Err(NormalizeError::Cancelled { id }) => {
                trace!(calendar = %calendar_id, event = %id, "dropping cancelled event");
                batch.cancelled += 1;
            }
            Err(e) => {
                warn!(calendar = %calendar_id, error = %e, "rejecting malformed event");
                batch.rejected.push(e);
            }
        }
    }
    batch
}

fn convert_time(
    id: &str,
    field: &'static str,
    raw: Option<&RawEventTime>,
) -> Result<EventTime, NormalizeError> {
    let missing = || NormalizeError::MissingTime {
        id: id.to_string(),
        field,
    };
    let invalid = |value: &str| NormalizeError::InvalidTime {
        id: id.to_string(),
        field,
        value: value.to_string(),
    };

    let raw = raw.ok_or_else(missing)?;
    match (raw.date_time.as_deref(), raw.date.as_deref()) {
        (Some(dt), _) => DateTime::parse_from_rfc3339(dt)
            .map(|parsed| EventTime::from_utc(parsed.with_timezone(&Utc)))
            .map_err(|_| invalid(dt)),
        (None, Some(date)) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(EventTime::from_date)
            .map_err(|_| invalid(date)),
        (None, None) => Err(missing()),
    }
}

/// Maps a provider palette index to its event color.
fn palette_color(color_id: &str) -> Option<&'static str> {
    let color = match color_id {
        "1" => "#a4bdfc",
        "2" => "#7ae7bf",
        "3" => "#dbadff",
        "4" => "#ff887c",
        "5" => "#fbd75b",
        "6" => "#ffb878",
        "7" => "#46d6db",
        "8" => "#e1e1e1",
        "9" => "#5484ed",
        "10" => "#51b749",
        "11" => "#dc2127",
        _ => return None,
    };
    Some(color)
}
