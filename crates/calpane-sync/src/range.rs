//! Cache keys for fetched windows.

use std::fmt;

use calpane_core::TimeWindow;
use chrono::{DateTime, Utc};

/// Marks one exact window as fetched for a source.
///
/// The key is the literal `(start, end)` pair. A window that contains a
/// previously fetched window does not match it; only the same bounds do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RangeKey {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl RangeKey {
    /// Builds the key for a window.
    pub fn new(window: &TimeWindow) -> Self {
        Self {
            start: window.start,
            end: window.end,
        }
    }

    /// Start bound.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// End bound.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Sum of both bounds in epoch milliseconds.
    ///
    /// Only for log correlation with older tooling; distinct windows can
    /// share a sum, so this is never used for lookups.
    pub fn legacy_fingerprint(&self) -> i64 {
        self.start
            .timestamp_millis()
            .saturating_add(self.end.timestamp_millis())
    }
}

impl From<&TimeWindow> for RangeKey {
    fn from(window: &TimeWindow) -> Self {
        Self::new(window)
    }
}

impl fmt::Display for RangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
