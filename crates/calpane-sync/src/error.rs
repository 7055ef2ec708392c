//! Sync error types.

use calpane_core::TimeWindowError;
use calpane_providers::ProviderError;
use thiserror::Error;

/// Result type for view operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors returned by [`CalendarView`](crate::view::CalendarView) operations.
///
/// Fetches driven by the coordinator never surface here; they degrade to a
/// notice and stay eligible for retry.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote source rejected the call.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// No source with this id is loaded.
    #[error("unknown calendar: {id}")]
    UnknownCalendar { id: String },

    /// The event is not cached for that source.
    #[error("event {event_id} not found in calendar {calendar_id}")]
    UnknownEvent {
        calendar_id: String,
        event_id: String,
    },

    /// The calendar does not allow edits.
    #[error("calendar {id} is read-only")]
    ReadOnly { id: String },

    /// A window could not be built.
    #[error(transparent)]
    Window(#[from] TimeWindowError),
}

impl SyncError {
    /// Creates an unknown calendar error.
    pub fn unknown_calendar(id: impl Into<String>) -> Self {
        Self::UnknownCalendar { id: id.into() }
    }

    /// Creates an unknown event error.
    pub fn unknown_event(calendar_id: impl Into<String>, event_id: impl Into<String>) -> Self {
        Self::UnknownEvent {
            calendar_id: calendar_id.into(),
            event_id: event_id.into(),
        }
    }

    /// Creates a read-only error.
    pub fn read_only(id: impl Into<String>) -> Self {
        Self::ReadOnly { id: id.into() }
    }

    /// Message suitable for a notice banner.
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(e) => e.message().to_string(),
            other => other.to_string(),
        }
    }
}
