//! Commands that drive a calendar view.

use std::sync::Arc;
use std::time::Duration;

use calpane_core::{EventRecord, TimeWindow};
use calpane_providers::EventSourceClient;
use calpane_sync::{CalendarView, NoticeConfig};
use chrono::{Local, NaiveDate, TimeZone, Weekday};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cli::Period;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::notifier::{self, NoticeForwarder};
use crate::surface::{OutputFormat, TerminalSurface};

/// Options of the `show` command.
#[derive(Debug, Clone)]
pub struct ShowOptions {
    pub date: NaiveDate,
    pub period: Period,
    pub calendars: Vec<String>,
    pub format: OutputFormat,
}

/// Parses a `YYYY-MM-DD` argument, defaulting to today.
pub fn parse_date(value: Option<&str>) -> ClientResult<NaiveDate> {
    match value {
        None => Ok(Local::now().date_naive()),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| ClientError::usage(format!("invalid date {:?}: {}", s, e))),
    }
}

/// Window of `period` around `date` in `tz`.
pub fn window_for<Tz: TimeZone>(
    date: NaiveDate,
    period: Period,
    week_start: Weekday,
    tz: &Tz,
) -> ClientResult<TimeWindow> {
    let window = match period {
        Period::Day => TimeWindow::for_days(date, date, tz),
        Period::Week => TimeWindow::for_week(date, week_start, tz),
        Period::Month => TimeWindow::for_month_grid(date, week_start, tz),
    };
    window.map_err(|e| ClientError::usage(e.to_string()))
}

#[cfg(feature = "google")]
fn build_client(config: &ClientConfig) -> ClientResult<Arc<dyn EventSourceClient>> {
    use calpane_providers::google::GoogleCalendarClient;

    let google = config.google.as_ref().ok_or_else(|| {
        ClientError::config(format!(
            "no [google] section in {}",
            ClientConfig::default_path().display()
        ))
    })?;
    let provider_config = google
        .to_provider_config()
        .map_err(ClientError::Config)?
        .with_timeout(Duration::from_secs(config.sync.fetch_timeout_secs.max(1)));
    Ok(Arc::new(GoogleCalendarClient::new(provider_config)?))
}

#[cfg(not(feature = "google"))]
fn build_client(_config: &ClientConfig) -> ClientResult<Arc<dyn EventSourceClient>> {
    use calpane_providers::{ErrorSource, ProviderError};

    Ok(Arc::new(ErrorSource::new(
        "none",
        ProviderError::unsupported("calpane was built without a calendar backend"),
    )))
}

/// How long a command waits for pending notices before exiting.
const NOTICE_GRACE: Duration = Duration::from_millis(500);

/// Drops the view so the forwarder sees the channel close, then waits for it.
async fn close_view(view: CalendarView<TerminalSurface>, forwarder: JoinHandle<usize>) {
    drop(view);
    notifier::drain(forwarder, NOTICE_GRACE).await;
}

/// Builds a view with its calendars loaded and filtered by configuration.
async fn open_view(
    config: &ClientConfig,
    format: OutputFormat,
    only: &[String],
) -> ClientResult<(CalendarView<TerminalSurface>, JoinHandle<usize>)> {
    let client = build_client(config)?;
    let mut view = CalendarView::new(
        client,
        TerminalSurface::new(format),
        config.sync.coordinator_config(),
        NoticeConfig::default(),
    );
    let forwarder = NoticeForwarder::new(config.sync.desktop_notifications).spawn(view.subscribe());

    if let Err(e) = view.load_calendars().await {
        close_view(view, forwarder).await;
        return Err(e.into());
    }

    #[cfg(feature = "google")]
    if let Some(ref google) = config.google {
        view.retain_sources(|s| google.wants(s.id()));
    }
    if !only.is_empty() {
        view.retain_sources(|s| only.iter().any(|id| id == s.id()));
    }

    Ok((view, forwarder))
}

/// Prints the events of one period.
pub async fn show(config: &ClientConfig, options: ShowOptions) -> ClientResult<()> {
    let week_start = config.display.week_start().map_err(ClientError::Config)?;
    let window = window_for(options.date, options.period, week_start, &Local)?;

    let (mut view, forwarder) = open_view(config, options.format, &options.calendars).await?;
    view.surface_mut().set_window(window);
    view.goto_date(options.date);

    let report = view.show(window).await;
    info!(
        fetched = report.fetched,
        skipped = report.skipped,
        failed = report.failed,
        rejected = report.rejected,
        "view loaded"
    );

    print!("{}", view.surface().output());
    if options.format == OutputFormat::Json {
        println!();
    }
    if report.failed > 0 {
        warn!(failed = report.failed, "some calendars could not be loaded");
        eprintln!("warning: {} calendar(s) could not be loaded", report.failed);
    }

    close_view(view, forwarder).await;
    Ok(())
}

/// Lists the subscribed calendars.
pub async fn calendars(config: &ClientConfig) -> ClientResult<()> {
    let (view, forwarder) = open_view(config, OutputFormat::Agenda, &[]).await?;

    for source in view.sources() {
        let marker = if source.is_selected() { "*" } else { " " };
        let access = if source.style().editable { "rw" } else { "ro" };
        println!("{} {} {:<40} {}", marker, access, source.id(), source.name());
    }

    close_view(view, forwarder).await;
    Ok(())
}

/// Deletes one event from the week containing `date`.
pub async fn delete(
    config: &ClientConfig,
    calendar: &str,
    event_id: &str,
    date: NaiveDate,
) -> ClientResult<()> {
    let week_start = config.display.week_start().map_err(ClientError::Config)?;
    let window = window_for(date, Period::Week, week_start, &Local)?;

    let only = [calendar.to_string()];
    let (mut view, forwarder) = open_view(config, OutputFormat::Agenda, &only).await?;
    let result = delete_in(&mut view, calendar, event_id, window).await;
    close_view(view, forwarder).await;

    let removed = result?;
    println!("Deleted \"{}\" ({})", removed.title, removed.id);
    Ok(())
}

async fn delete_in(
    view: &mut CalendarView<TerminalSurface>,
    calendar: &str,
    event_id: &str,
    window: TimeWindow,
) -> ClientResult<EventRecord> {
    if view.source(calendar).is_none() {
        return Err(calpane_sync::SyncError::unknown_calendar(calendar).into());
    }
    view.set_selected(calendar, true).await?;
    view.show(window).await;

    Ok(view.delete_event(calendar, event_id).await?)
}
