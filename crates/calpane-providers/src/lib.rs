//! Remote event sources and record normalization.
//!
//! - [`EventSourceClient`] - the trait every calendar backend implements
//! - [`RawEvent`] - an event as the backend returned it, every field optional
//! - [`normalize_event`] - validation into a typed [`EventRecord`](calpane_core::EventRecord)
//! - [`ProviderError`] - error type for backend calls
//!
//! ```text
//!  Google API ──▶ GoogleCalendarClient ──▶ Vec<RawEvent>
//!                                               │
//!                                               ▼ normalize_events()
//!                                        NormalizedBatch
//!                                  (records, cancelled, rejected)
//! ```

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod normalize;
pub mod raw_event;
pub mod source;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use normalize::{NormalizeError, NormalizedBatch, SourceStyle, normalize_event, normalize_events};
pub use raw_event::{RawEvent, RawEventTime};
pub use source::{BoxFuture, CalendarInfo, ErrorSource, EventQuery, EventSourceClient};
