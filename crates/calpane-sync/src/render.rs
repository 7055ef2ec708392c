//! The rendering side of a calendar view.

use chrono::NaiveDate;

use crate::source::CalendarSource;

/// Something that draws the merged events of all sources.
///
/// The view pushes state to the surface; the surface pulls events through
/// [`CalendarSource::events_in`] for the window it shows.
pub trait RenderSurface {
    /// Re-reads every source and redraws.
    fn refetch_events(&mut self, sources: &[CalendarSource]);

    /// Navigates to the period containing `date`.
    fn goto_date(&mut self, date: NaiveDate);

    /// Called after each successful fetch of one source.
    ///
    /// Lets a surface draw partial results while other sources are still
    /// loading. Does nothing by default.
    fn source_loaded(&mut self, _source: &CalendarSource) {}
}
