//! Calendar view glue.
//!
//! [`CalendarView`] ties the pieces together the way a calendar screen uses
//! them: load the calendar list into sources, show a window (fetching what is
//! missing), toggle sources on and off, and delete events.

use std::sync::Arc;

use calpane_core::{EventRecord, TimeWindow};
use calpane_providers::EventSourceClient;
use chrono::NaiveDate;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::config::{CoordinatorConfig, NoticeConfig};
use crate::coordinator::{FetchCoordinator, RunReport};
use crate::error::{SyncError, SyncResult};
use crate::notice::{Notice, NoticeBus, Severity};
use crate::render::RenderSurface;
use crate::source::CalendarSource;

/// A calendar screen: sources, their coordinator and the surface drawing them.
#[derive(Debug)]
pub struct CalendarView<S> {
    coordinator: FetchCoordinator,
    sources: Vec<CalendarSource>,
    surface: S,
    window: Option<TimeWindow>,
}

impl<S: RenderSurface> CalendarView<S> {
    /// Creates a view with no sources.
    pub fn new(
        client: Arc<dyn EventSourceClient>,
        surface: S,
        config: CoordinatorConfig,
        notice_config: NoticeConfig,
    ) -> Self {
        let notices = NoticeBus::new(notice_config);
        Self {
            coordinator: FetchCoordinator::new(client, notices, config),
            sources: Vec::new(),
            surface,
            window: None,
        }
    }

    /// Builder: start with the given sources instead of loading the list.
    pub fn with_sources(mut self, sources: Vec<CalendarSource>) -> Self {
        self.sources = sources;
        self
    }

    pub fn sources(&self) -> &[CalendarSource] {
        &self.sources
    }

    pub fn source(&self, id: &str) -> Option<&CalendarSource> {
        self.sources.iter().find(|s| s.id() == id)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn coordinator(&self) -> &FetchCoordinator {
        &self.coordinator
    }

    /// Window last passed to [`show`](Self::show).
    pub fn window(&self) -> Option<&TimeWindow> {
        self.window.as_ref()
    }

    pub fn notices(&self) -> &NoticeBus {
        self.coordinator.notices()
    }

    /// Subscribes to the status banner of this view.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notices().subscribe()
    }

    /// Loads the calendar list and rebuilds the sources from it.
    ///
    /// A calendar that was already loaded keeps its cache and its selection;
    /// calendars no longer listed are dropped. Returns the number of sources.
    #[instrument(skip(self))]
    pub async fn load_calendars(&mut self) -> SyncResult<usize> {
        let client = Arc::clone(self.coordinator.client());
        let calendars = match client.list_calendars().await {
            Ok(calendars) => calendars,
            Err(e) => {
                self.notify_error(e.message());
                return Err(e.into());
            }
        };

        let mut previous = std::mem::take(&mut self.sources);
        self.sources = calendars
            .iter()
            .map(|info| match previous.iter().position(|s| s.id() == info.id) {
                Some(index) => previous.swap_remove(index),
                None => CalendarSource::from_calendar(info),
            })
            .collect();

        info!(count = self.sources.len(), "loaded calendars");
        Ok(self.sources.len())
    }

    /// Keeps only the sources for which `keep` returns true.
    pub fn retain_sources<F>(&mut self, keep: F)
    where
        F: FnMut(&CalendarSource) -> bool,
    {
        self.sources.retain(keep);
    }

    /// Shows `window`, fetching it for every selected source that lacks it.
    ///
    /// The surface is told about each loaded source as it arrives and
    /// redrawn once at the end.
    pub async fn show(&mut self, window: TimeWindow) -> RunReport {
        self.window = Some(window);
        self.refresh().await
    }

    /// Reruns the coordinator for the current window, if any.
    pub async fn refresh(&mut self) -> RunReport {
        let Some(window) = self.window else {
            return RunReport::default();
        };

        let surface = &mut self.surface;
        let mut completed = false;
        let report = self
            .coordinator
            .run(
                &mut self.sources,
                &window,
                |source| surface.source_loaded(source),
                || completed = true,
            )
            .await;

        if completed {
            self.surface.refetch_events(&self.sources);
        }
        report
    }

    /// Turns a source on or off.
    ///
    /// Turning a source on fetches the current window for it if needed.
    pub async fn set_selected(&mut self, calendar_id: &str, selected: bool) -> SyncResult<RunReport> {
        let source = self
            .sources
            .iter_mut()
            .find(|s| s.id() == calendar_id)
            .ok_or_else(|| SyncError::unknown_calendar(calendar_id))?;

        if source.is_selected() == selected {
            return Ok(RunReport::default());
        }
        source.set_selected(selected);
        debug!(source = %calendar_id, selected, "toggled source");

        if selected {
            Ok(self.refresh().await)
        } else {
            self.surface.refetch_events(&self.sources);
            Ok(RunReport::default())
        }
    }

    /// Navigates the surface to `date`.
    pub fn goto_date(&mut self, date: NaiveDate) {
        self.surface.goto_date(date);
    }

    /// Events of every selected source overlapping the current window.
    pub fn visible_events(&self) -> Vec<&EventRecord> {
        let Some(ref window) = self.window else {
            return Vec::new();
        };
        self.sources
            .iter()
            .filter(|s| s.is_selected())
            .flat_map(|s| s.events_in(window))
            .collect()
    }

    /// Deletes an event remotely and drops it from the cache.
    ///
    /// The source's fetched ranges are invalidated so the next
    /// [`refresh`](Self::refresh) reloads it.
    #[instrument(skip(self))]
    pub async fn delete_event(&mut self, calendar_id: &str, event_id: &str) -> SyncResult<EventRecord> {
        let source = self
            .sources
            .iter()
            .find(|s| s.id() == calendar_id)
            .ok_or_else(|| SyncError::unknown_calendar(calendar_id))?;
        if !source.style().editable {
            return Err(SyncError::read_only(calendar_id));
        }
        let title = source
            .events()
            .iter()
            .find(|e| e.id == event_id)
            .map(|e| e.title.clone())
            .ok_or_else(|| SyncError::unknown_event(calendar_id, event_id))?;

        let notices = self.notices().clone();
        notices.start(Severity::Info, format!("Deleting {}...", title));

        let client = Arc::clone(self.coordinator.client());
        if let Err(e) = client.delete_event(calendar_id, event_id).await {
            warn!(source = %calendar_id, event = %event_id, error = %e, "delete failed");
            self.notify_error(e.message());
            return Err(e.into());
        }

        let source = self
            .sources
            .iter_mut()
            .find(|s| s.id() == calendar_id)
            .ok_or_else(|| SyncError::unknown_calendar(calendar_id))?;
        let removed = source
            .remove_event(event_id)
            .ok_or_else(|| SyncError::unknown_event(calendar_id, event_id))?;
        source.invalidate();

        notices.start(Severity::Success, format!("Deleted {}", title));
        notices.stop_after(self.coordinator.config().notice_clear_delay);
        self.surface.refetch_events(&self.sources);

        info!(source = %calendar_id, event = %event_id, "event deleted");
        Ok(removed)
    }

    fn notify_error(&self, message: &str) {
        let notices = self.notices();
        notices.start(Severity::Error, message);
        notices.stop_after(self.coordinator.config().notice_clear_delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calpane_providers::{
        BoxFuture, CalendarInfo, EventQuery, ProviderError, ProviderResult, RawEvent,
    };
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCalendar {
        calendars: Vec<CalendarInfo>,
        events: Vec<RawEvent>,
        fail_delete: bool,
        deleted: Mutex<Vec<(String, String)>>,
    }

    impl EventSourceClient for FakeCalendar {
        fn name(&self) -> &str {
            "fake"
        }

        fn fetch_events(&self, _query: EventQuery) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
            let events = self.events.clone();
            Box::pin(async move { Ok(events) })
        }

        fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>> {
            let calendars = self.calendars.clone();
            Box::pin(async move { Ok(calendars) })
        }

        fn delete_event(&self, calendar_id: &str, event_id: &str) -> BoxFuture<'_, ProviderResult<()>> {
            let result = if self.fail_delete {
                Err(ProviderError::authorization("Forbidden"))
            } else {
                self.deleted
                    .lock()
                    .unwrap()
                    .push((calendar_id.to_string(), event_id.to_string()));
                Ok(())
            };
            Box::pin(async move { result })
        }
    }

    #[derive(Default)]
    struct CountingSurface {
        refetches: usize,
        loaded: Vec<String>,
        dates: Vec<NaiveDate>,
    }

    impl RenderSurface for CountingSurface {
        fn refetch_events(&mut self, _sources: &[CalendarSource]) {
            self.refetches += 1;
        }

        fn goto_date(&mut self, date: NaiveDate) {
            self.dates.push(date);
        }

        fn source_loaded(&mut self, source: &CalendarSource) {
            self.loaded.push(source.id().to_string());
        }
    }

    fn week() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 2, 3, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 2, 10, 0, 0, 0).unwrap(),
        )
    }

    fn fake() -> FakeCalendar {
        FakeCalendar {
            calendars: vec![
                CalendarInfo::new("work", "Work").with_access_role("owner"),
                CalendarInfo::new("holidays", "Holidays")
                    .with_selected(false)
                    .with_access_role("reader"),
            ],
            events: vec![RawEvent::timed(
                "evt1",
                "Planning",
                "2025-02-05T10:00:00Z",
                "2025-02-05T11:00:00Z",
            )],
            ..FakeCalendar::default()
        }
    }

    fn view(client: FakeCalendar) -> CalendarView<CountingSurface> {
        CalendarView::new(
            Arc::new(client),
            CountingSurface::default(),
            CoordinatorConfig::default(),
            NoticeConfig::default(),
        )
    }

    #[tokio::test]
    async fn load_then_show() {
        let mut view = view(fake());
        assert_eq!(view.load_calendars().await.unwrap(), 2);

        let report = view.show(week()).await;
        assert_eq!(report.fetched, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(view.surface().loaded, vec!["work"]);
        assert_eq!(view.surface().refetches, 1);
        assert_eq!(view.visible_events().len(), 1);

        let report = view.refresh().await;
        assert!(report.is_noop());
        assert_eq!(view.surface().refetches, 2);
    }

    #[tokio::test]
    async fn reload_keeps_cache() {
        let mut view = view(fake());
        view.load_calendars().await.unwrap();
        view.show(week()).await;

        view.load_calendars().await.unwrap();
        assert!(view.source("work").unwrap().has_fetched(&week()));
        assert_eq!(view.source("work").unwrap().events().len(), 1);
    }

    #[tokio::test]
    async fn selecting_a_source_fetches_it() {
        let mut view = view(fake());
        view.load_calendars().await.unwrap();
        view.show(week()).await;

        let report = view.set_selected("holidays", true).await.unwrap();
        assert_eq!(report.fetched, 1);
        assert!(view.source("holidays").unwrap().has_fetched(&week()));

        let report = view.set_selected("holidays", false).await.unwrap();
        assert!(report.is_noop());
        assert!(matches!(
            view.set_selected("nope", true).await,
            Err(SyncError::UnknownCalendar { .. })
        ));
    }

    #[tokio::test]
    async fn delete_removes_and_invalidates() {
        let mut view = view(fake());
        view.load_calendars().await.unwrap();
        view.show(week()).await;
        let mut rx = view.subscribe();

        let removed = view.delete_event("work", "evt1").await.unwrap();
        assert_eq!(removed.title, "Planning");

        let work = view.source("work").unwrap();
        assert!(work.events().is_empty());
        assert!(!work.has_fetched(&week()));
        assert!(matches!(
            rx.recv().await.unwrap(),
            Notice::Start {
                severity: Severity::Info,
                ..
            }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            Notice::Start {
                severity: Severity::Success,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn delete_failure_keeps_event() {
        let mut view = view(FakeCalendar {
            fail_delete: true,
            ..fake()
        });
        view.load_calendars().await.unwrap();
        view.show(week()).await;
        let mut rx = view.subscribe();

        let err = view.delete_event("work", "evt1").await.unwrap_err();
        assert!(matches!(err, SyncError::Provider(_)));
        assert_eq!(view.source("work").unwrap().events().len(), 1);

        rx.recv().await.unwrap();
        let notice = rx.recv().await.unwrap();
        assert!(notice.is_error());
    }

    #[tokio::test]
    async fn delete_rejects_read_only_and_unknown() {
        let mut view = view(fake());
        view.load_calendars().await.unwrap();

        assert!(matches!(
            view.delete_event("holidays", "x").await,
            Err(SyncError::ReadOnly { .. })
        ));
        assert!(matches!(
            view.delete_event("work", "missing").await,
            Err(SyncError::UnknownEvent { .. })
        ));
    }

    #[test]
    fn goto_date_reaches_surface() {
        let mut view = view(fake());
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        view.goto_date(date);
        assert_eq!(view.surface().dates, vec![date]);
    }
}
