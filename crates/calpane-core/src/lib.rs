//! Core types: time windows, event records, tracing setup

pub mod event;
pub mod time;
pub mod tracing;

pub use event::{EventRecord, EventStyle};
pub use time::{EventTime, TimeWindow, TimeWindowError};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
