//! Event range cache and fetch coordination for a calendar view.
//!
//! - [`CalendarSource`] - one calendar, its fetched ranges and merged events
//! - [`FetchCoordinator`] - walks sources one fetch at a time
//! - [`NoticeBus`] - transient status banner messages
//! - [`RenderSurface`] - the drawing side, implemented by the embedder
//! - [`CalendarView`] - glue owning all of the above

pub mod config;
pub mod coordinator;
pub mod error;
pub mod notice;
pub mod range;
pub mod render;
pub mod source;
pub mod view;

pub use config::{CoordinatorConfig, FailurePolicy, NoticeConfig};
pub use coordinator::{CoordinatorState, FetchCoordinator, InFlight, RunReport};
pub use error::{SyncError, SyncResult};
pub use notice::{Notice, NoticeBus, Severity};
pub use range::RangeKey;
pub use render::RenderSurface;
pub use source::CalendarSource;
pub use view::CalendarView;
