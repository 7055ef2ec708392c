//! The remote event source abstraction.
//!
//! [`EventSourceClient`] is the seam between the synchronization layer and
//! whatever serves calendar data. The coordinator only ever calls
//! [`EventSourceClient::fetch_events`] for one calendar and one window at a
//! time; listing calendars and deleting events are used by the view glue.

use std::future::Future;
use std::pin::Pin;

use calpane_core::TimeWindow;

use crate::error::{ProviderError, ProviderResult};
use crate::raw_event::RawEvent;

/// Information about a calendar the user is subscribed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarInfo {
    /// Unique identifier for the calendar.
    pub id: String,
    /// Human-readable name of the calendar.
    pub name: String,
    /// Whether this is the primary calendar.
    pub is_primary: bool,
    /// Whether the user has the calendar switched on for display.
    pub selected: bool,
    /// Access role (`owner`, `writer`, `reader`, `freeBusyReader`).
    pub access_role: Option<String>,
    /// Background color for UI display.
    pub background_color: Option<String>,
    /// Foreground color for UI display.
    pub foreground_color: Option<String>,
}

impl CalendarInfo {
    /// Creates a new, selected CalendarInfo with the given ID and name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_primary: false,
            selected: true,
            access_role: None,
            background_color: None,
            foreground_color: None,
        }
    }

    /// Builder method to mark as primary.
    pub fn with_primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    /// Builder method to set the display flag.
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Builder method to set the access role.
    pub fn with_access_role(mut self, role: impl Into<String>) -> Self {
        self.access_role = Some(role.into());
        self
    }

    /// Builder method to set display colors.
    pub fn with_colors(mut self, background: impl Into<String>, foreground: impl Into<String>) -> Self {
        self.background_color = Some(background.into());
        self.foreground_color = Some(foreground.into());
        self
    }

    /// Returns true if the user may modify events of this calendar.
    pub fn is_writable(&self) -> bool {
        matches!(self.access_role.as_deref(), Some("owner") | Some("writer"))
    }
}

/// One fetch request: the events of one calendar over one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// Calendar to read.
    pub calendar_id: String,
    /// Interval to read, bounds inclusive.
    pub window: TimeWindow,
}

impl EventQuery {
    /// Creates a query.
    pub fn new(calendar_id: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            window,
        }
    }
}

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A remote calendar backend.
///
/// Implementations must be `Send + Sync`; the coordinator holds them behind
/// an `Arc` and awaits one call at a time.
pub trait EventSourceClient: Send + Sync {
    /// Returns the name of this source (e.g. `"google"`).
    fn name(&self) -> &str;

    /// Fetches the raw events of one calendar within a window.
    ///
    /// Implementations handle pagination internally and return every page.
    fn fetch_events(&self, query: EventQuery) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>>;

    /// Lists the calendars the user is subscribed to.
    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>>;

    /// Deletes one event.
    ///
    /// The default implementation reports an unsupported operation.
    fn delete_event(
        &self,
        _calendar_id: &str,
        _event_id: &str,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        let error = ProviderError::unsupported("deleting events is not supported by this source")
            .with_provider(self.name());
        Box::pin(async move { Err(error) })
    }
}

/// A source that fails every call with the same error.
///
/// Stands in for a backend that could not be configured, so a view can still
/// be built and surface the failure through its notices.
#[derive(Debug)]
pub struct ErrorSource {
    name: String,
    error: ProviderError,
}

impl ErrorSource {
    /// Creates a new failing source.
    pub fn new(name: impl Into<String>, error: ProviderError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }

    fn error(&self) -> ProviderError {
        self.error.detached().with_provider(&self.name)
    }
}

impl EventSourceClient for ErrorSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_events(&self, _query: EventQuery) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>> {
        let error = self.error();
        Box::pin(async move { Err(error) })
    }
}
