//! Event records as consumed by a render surface.
//!
//! An [`EventRecord`] is the normalized shape every remote event is turned
//! into before it is merged into a calendar source. Records carry the
//! styling hints the surface needs to draw them; they are otherwise opaque to
//! the synchronization layer, which only looks at [`EventRecord::id`].

use serde::{Deserialize, Serialize};

use crate::time::{EventTime, TimeWindow};

/// A normalized calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Identifier of the event within its calendar.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Start of the event.
    pub start: EventTime,
    /// End of the event.
    pub end: EventTime,
    /// Whether the event spans whole days.
    pub all_day: bool,
    /// The calendar the event was fetched from.
    pub calendar_id: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Location text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Link to the event in the provider's own UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    /// Styling hints for the render surface.
    #[serde(default)]
    pub style: EventStyle,
}

/// Styling hints attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStyle {
    /// Background color (CSS color string).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Text color (CSS color string).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    /// Extra CSS class names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub class_names: Vec<String>,
    /// Whether the surface may offer editing for this event.
    #[serde(default)]
    pub editable: bool,
}

impl EventRecord {
    /// Creates a record with the required fields.
    ///
    /// `all_day` is derived from `start`.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: EventTime,
        end: EventTime,
        calendar_id: impl Into<String>,
    ) -> Self {
        let all_day = start.is_all_day();
        Self {
            id: id.into(),
            title: title.into(),
            start,
            end,
            all_day,
            calendar_id: calendar_id.into(),
            description: None,
            location: None,
            html_link: None,
            style: EventStyle::default(),
        }
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

    /// Builder method to set the provider link.
    pub fn with_html_link(mut self, link: impl Into<String>) -> Self {
        self.html_link = Some(link.into());
        self
    }

    /// Builder method to set styling hints.
    pub fn with_style(mut self, style: EventStyle) -> Self {
        self.style = style;
        self
    }

    /// Returns true if the event overlaps the given window.
    pub fn overlaps(&self, window: &TimeWindow) -> bool {
        window.overlaps_event(&self.start, &self.end)
    }
}
