//! Terminal render surface.
//!
//! Renders the merged events of all selected sources as an agenda, grouped
//! by day, or as JSON. The surface only formats; the caller decides when to
//! print [`TerminalSurface::output`].

use calpane_core::{EventRecord, EventTime, TimeWindow};
use calpane_sync::{CalendarSource, RenderSurface};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::debug;

/// Output format of the terminal surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Agenda,
    Json,
}

/// A [`RenderSurface`] that renders into a string.
#[derive(Debug, Default)]
pub struct TerminalSurface {
    format: OutputFormat,
    window: Option<TimeWindow>,
    focus: Option<NaiveDate>,
    output: String,
    redraws: usize,
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    calendar: &'a str,
    #[serde(flatten)]
    event: &'a EventRecord,
}

impl TerminalSurface {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Sets the window rendered on the next redraw.
    pub fn set_window(&mut self, window: TimeWindow) {
        self.window = Some(window);
    }

    /// Date the user navigated to, if any.
    pub fn focus(&self) -> Option<NaiveDate> {
        self.focus
    }

    /// Result of the last redraw.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn redraws(&self) -> usize {
        self.redraws
    }

    fn collect<'a>(&self, sources: &'a [CalendarSource]) -> Vec<(&'a str, &'a EventRecord)> {
        let Some(window) = self.window else {
            return Vec::new();
        };
        let mut events: Vec<_> = sources
            .iter()
            .filter(|s| s.is_selected())
            .flat_map(|s| {
                s.events()
                    .iter()
                    .filter(move |e| e.overlaps(&window))
                    .map(move |e| (s.name(), e))
            })
            .collect();
        events.sort_by(|(_, a), (_, b)| a.start.cmp(&b.start).then_with(|| a.title.cmp(&b.title)));
        events
    }

    fn render_agenda(events: &[(&str, &EventRecord)]) -> String {
        if events.is_empty() {
            return "No events\n".to_string();
        }

        let mut out = String::new();
        let mut current_day: Option<NaiveDate> = None;
        for (calendar, event) in events {
            let day = local_date(&event.start);
            if current_day != Some(day) {
                if current_day.is_some() {
                    out.push('\n');
                }
                out.push_str(&format!("{}\n", day.format("%A %Y-%m-%d")));
                current_day = Some(day);
            }
            out.push_str(&format!(
                "  {:<11} {} [{}]\n",
                time_label(event),
                event.title,
                calendar
            ));
        }
        out
    }

    fn render_json(events: &[(&str, &EventRecord)]) -> String {
        let rows: Vec<_> = events
            .iter()
            .map(|&(calendar, event)| JsonEvent { calendar, event })
            .collect();
        serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
    }
}

impl RenderSurface for TerminalSurface {
    fn refetch_events(&mut self, sources: &[CalendarSource]) {
        let events = self.collect(sources);
        self.output = match self.format {
            OutputFormat::Agenda => Self::render_agenda(&events),
            OutputFormat::Json => Self::render_json(&events),
        };
        self.redraws += 1;
        debug!(events = events.len(), redraws = self.redraws, "redrew surface");
    }

    fn goto_date(&mut self, date: NaiveDate) {
        self.focus = Some(date);
    }

    fn source_loaded(&mut self, source: &CalendarSource) {
        debug!(source = %source.id(), events = source.events().len(), "source loaded");
    }
}

fn local_date(time: &EventTime) -> NaiveDate {
    match time {
        EventTime::AllDay(date) => *date,
        EventTime::DateTime(dt) => dt.with_timezone(&Local).date_naive(),
    }
}

fn time_label(event: &EventRecord) -> String {
    match (&event.start, &event.end) {
        (EventTime::DateTime(start), EventTime::DateTime(end)) => format!(
            "{}-{}",
            start.with_timezone(&Local).format("%H:%M"),
            end.with_timezone(&Local).format("%H:%M")
        ),
        _ => "all day".to_string(),
    }
}
