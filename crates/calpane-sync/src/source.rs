//! Per-calendar event range cache.
//!
//! A [`CalendarSource`] remembers which exact windows were already fetched
//! and holds the merged events of every fetch. It performs no I/O; the
//! [`FetchCoordinator`](crate::coordinator::FetchCoordinator) decides when
//! to fill it.

use std::collections::HashSet;

use calpane_core::{EventRecord, TimeWindow};
use calpane_providers::{CalendarInfo, SourceStyle};
use tracing::trace;

use crate::range::RangeKey;

/// One subscribed calendar and its cached events.
#[derive(Debug, Clone)]
pub struct CalendarSource {
    id: String,
    name: String,
    selected: bool,
    style: SourceStyle,
    events: Vec<EventRecord>,
    fetched: HashSet<RangeKey>,
}

impl CalendarSource {
    /// Creates an empty, selected source.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            selected: true,
            style: SourceStyle::default(),
            events: Vec::new(),
            fetched: HashSet::new(),
        }
    }

    /// Creates a source from a calendar list entry.
    pub fn from_calendar(info: &CalendarInfo) -> Self {
        Self::new(&info.id, &info.name)
            .with_selected(info.selected)
            .with_style(SourceStyle::from_calendar(info))
    }

    /// Builder: set the display flag.
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Builder: set the styling applied to normalized records.
    pub fn with_style(mut self, style: SourceStyle) -> Self {
        self.style = style;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn style(&self) -> &SourceStyle {
        &self.style
    }

    /// Whether events of this source are fetched and rendered.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Toggles the display flag. Cached events and ranges are kept.
    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    /// Merged, deduplicated events in first-seen order.
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Events overlapping `window`.
    pub fn events_in<'a>(&'a self, window: &'a TimeWindow) -> impl Iterator<Item = &'a EventRecord> + 'a {
        self.events.iter().filter(move |e| e.overlaps(window))
    }

    /// Number of windows recorded as fetched.
    pub fn fetched_count(&self) -> usize {
        self.fetched.len()
    }

    /// Returns true if exactly this window was fetched before.
    pub fn has_fetched(&self, window: &TimeWindow) -> bool {
        self.fetched.contains(&RangeKey::new(window))
    }

    /// Marks the window as fetched. Returns false if it already was.
    pub fn record_fetch(&mut self, window: &TimeWindow) -> bool {
        let key = RangeKey::new(window);
        let inserted = self.fetched.insert(key);
        trace!(
            source = %self.id,
            range = %key,
            fingerprint = key.legacy_fingerprint(),
            inserted,
            "recorded fetched range"
        );
        inserted
    }

    /// Appends `records` and drops every record whose id was already seen.
    ///
    /// The first occurrence of an id wins, both against cached events and
    /// within `records`. Returns the number of records actually added.
    pub fn merge_events(&mut self, records: impl IntoIterator<Item = EventRecord>) -> usize {
        let before = self.events.len();
        self.events.extend(records);

        let mut seen = HashSet::with_capacity(self.events.len());
        self.events.retain(|event| seen.insert(event.id.clone()));

        self.events.len().saturating_sub(before)
    }

    /// Removes one event by id.
    pub fn remove_event(&mut self, event_id: &str) -> Option<EventRecord> {
        let index = self.events.iter().position(|e| e.id == event_id)?;
        Some(self.events.remove(index))
    }

    /// Forgets every fetched range so the next run refetches.
    ///
    /// Cached events stay visible until new data is merged.
    pub fn invalidate(&mut self) {
        self.fetched.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calpane_core::EventTime;
    use chrono::{TimeZone, Utc};

    fn window(day: u32) -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 2, day, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 2, day + 1, 0, 0, 0).unwrap(),
        )
    }

    fn record(id: &str, title: &str, hour: u32) -> EventRecord {
        EventRecord::new(
            id,
            title,
            EventTime::from_utc(Utc.with_ymd_and_hms(2025, 2, 5, hour, 0, 0).unwrap()),
            EventTime::from_utc(Utc.with_ymd_and_hms(2025, 2, 5, hour + 1, 0, 0).unwrap()),
            "work",
        )
    }

    #[test]
    fn fetched_only_after_record() {
        let mut source = CalendarSource::new("work", "Work");
        let w = window(5);

        assert!(!source.has_fetched(&w));
        assert!(source.record_fetch(&w));
        assert!(source.has_fetched(&w));
        assert!(!source.record_fetch(&w));
        assert_eq!(source.fetched_count(), 1);
        assert!(!source.has_fetched(&window(6)));
    }

    #[test]
    fn merge_keeps_first_occurrence() {
        let mut source = CalendarSource::new("work", "Work");
        let added = source.merge_events(vec![
            record("1", "x", 9),
            record("1", "y", 10),
            record("2", "z", 11),
        ]);

        assert_eq!(added, 2);
        let got: Vec<_> = source
            .events()
            .iter()
            .map(|e| (e.id.as_str(), e.title.as_str()))
            .collect();
        assert_eq!(got, vec![("1", "x"), ("2", "z")]);
    }

    #[test]
    fn merge_against_cached_events() {
        let mut source = CalendarSource::new("work", "Work");
        source.merge_events(vec![record("1", "old", 9)]);
        let added = source.merge_events(vec![record("3", "new", 12), record("1", "newer", 9)]);

        assert_eq!(added, 1);
        let ids: Vec<_> = source.events().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(source.events()[0].title, "old");
    }

    #[test]
    fn remove_and_invalidate() {
        let mut source = CalendarSource::new("work", "Work");
        source.merge_events(vec![record("1", "a", 9), record("2", "b", 10)]);
        source.record_fetch(&window(5));

        let removed = source.remove_event("1").unwrap();
        assert_eq!(removed.title, "a");
        assert!(source.remove_event("1").is_none());
        assert_eq!(source.events().len(), 1);

        source.invalidate();
        assert!(!source.has_fetched(&window(5)));
        assert_eq!(source.events().len(), 1);
    }

    #[test]
    fn events_in_filters_by_window() {
        let mut source = CalendarSource::new("work", "Work");
        source.merge_events(vec![record("1", "a", 9)]);

        assert_eq!(source.events_in(&window(5)).count(), 1);
        assert_eq!(source.events_in(&window(7)).count(), 0);
    }

    #[test]
    fn from_calendar_copies_flags_and_style() {
        let info = CalendarInfo::new("team", "Team")
            .with_selected(false)
            .with_access_role("reader")
            .with_colors("#7bd148", "#1d1d1d");
        let source = CalendarSource::from_calendar(&info);

        assert_eq!(source.id(), "team");
        assert_eq!(source.name(), "Team");
        assert!(!source.is_selected());
        assert!(!source.style().editable);
        assert_eq!(source.style().background_color.as_deref(), Some("#7bd148"));
    }
}
