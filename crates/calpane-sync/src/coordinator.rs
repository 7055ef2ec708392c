//! Sequential fetch coordinator.
//!
//! [`FetchCoordinator::run`] walks the sources of a view in order and makes
//! sure every selected source has fetched the requested window once. At most
//! one remote fetch is outstanding at any time; the next source is only
//! considered after the previous fetch resolved, failed or timed out.
//!
//! ```text
//!        run()
//!  Idle ───────▶ Fetching{0} ─▶ Fetching{1} ─▶ ... ─▶ Done ─▶ Idle
//!                    │
//!                    ├─ not selected / cached / latch held ─▶ skip
//!                    └─ fetch ─▶ Ok  ─▶ record range, merge, progress
//!                              └▶ Err ─▶ error notice, policy
//! ```

use std::sync::Arc;

use calpane_core::TimeWindow;
use calpane_providers::{
    EventQuery, EventSourceClient, NormalizedBatch, ProviderError, RawEvent, normalize_events,
};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::config::CoordinatorConfig;
use crate::notice::{NoticeBus, Severity};
use crate::source::CalendarSource;

/// Where the coordinator is in its walk over the sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinatorState {
    /// No run in progress.
    #[default]
    Idle,
    /// Considering the source at `index`.
    Fetching { index: usize },
    /// All sources considered; the completion is being invoked.
    Done,
}

/// The single outstanding fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    /// Source being fetched.
    pub source_id: String,
    /// When the fetch was issued.
    pub started: Instant,
}

/// Outcome counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Sources fetched successfully.
    pub fetched: usize,
    /// Sources skipped without I/O.
    pub skipped: usize,
    /// Sources whose fetch failed after all attempts.
    pub failed: usize,
    /// Malformed records dropped during normalization.
    pub rejected: usize,
}

impl RunReport {
    /// True when the run touched the network for no source.
    pub fn is_noop(&self) -> bool {
        self.fetched == 0 && self.failed == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    NotSelected,
    Cached,
    FetchInFlight,
}

/// Drives fetches for a list of [`CalendarSource`]s.
pub struct FetchCoordinator {
    client: Arc<dyn EventSourceClient>,
    config: CoordinatorConfig,
    notices: NoticeBus,
    state: CoordinatorState,
    in_flight: Option<InFlight>,
}

impl std::fmt::Debug for FetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("client", &self.client.name())
            .field("config", &self.config)
            .field("state", &self.state)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

impl FetchCoordinator {
    /// Creates an idle coordinator.
    pub fn new(
        client: Arc<dyn EventSourceClient>,
        notices: NoticeBus,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            client,
            config,
            notices,
            state: CoordinatorState::Idle,
            in_flight: None,
        }
    }

    pub fn client(&self) -> &Arc<dyn EventSourceClient> {
        &self.client
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn notices(&self) -> &NoticeBus {
        &self.notices
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// The outstanding fetch, if any.
    ///
    /// Outside of [`run`](Self::run) this is only set when a run was dropped
    /// while a fetch was pending. The next run releases it.
    pub fn in_flight(&self) -> Option<&InFlight> {
        self.in_flight.as_ref()
    }

    /// Ensures every selected source has fetched `window` once.
    ///
    /// `on_progress` is called after each successful fetch with the updated
    /// source. `on_complete` is called exactly once after every source was
    /// considered, also when nothing had to be fetched.
    ///
    /// Fetch failures do not end the run: they publish an error notice, leave
    /// the window unrecorded so a later run retries, and then follow the
    /// configured [`FailurePolicy`](crate::config::FailurePolicy).
    #[instrument(skip_all, fields(window = %window, sources = sources.len()))]
    pub async fn run<P, C>(
        &mut self,
        sources: &mut [CalendarSource],
        window: &TimeWindow,
        mut on_progress: P,
        on_complete: C,
    ) -> RunReport
    where
        P: FnMut(&CalendarSource),
        C: FnOnce(),
    {
        let mut report = RunReport::default();

        // `run` holds `&mut self`, so a latch left here belongs to a run whose
        // future was dropped together with its fetch.
        if let Some(latch) = self.in_flight.take() {
            debug!(source = %latch.source_id, "releasing latch of a cancelled run");
        }

        for index in 0..sources.len() {
            self.state = CoordinatorState::Fetching { index };
            let source = &mut sources[index];

            if let Some(reason) = self.skip_reason(source, window) {
                debug!(source = %source.id(), ?reason, "skipping source");
                report.skipped += 1;
                continue;
            }

            match self.fetch_source(source, window).await {
                Ok(batch) => {
                    report.fetched += 1;
                    report.rejected += batch.rejected.len();
                    source.record_fetch(window);
                    let added = source.merge_events(batch.records);
                    debug!(
                        source = %source.id(),
                        added,
                        cancelled = batch.cancelled,
                        rejected = batch.rejected.len(),
                        "merged events"
                    );
                    on_progress(source);
                }
                Err(_) => report.failed += 1,
            }
        }

        self.state = CoordinatorState::Done;
        info!(
            fetched = report.fetched,
            skipped = report.skipped,
            failed = report.failed,
            "fetch run complete"
        );
        on_complete();
        self.state = CoordinatorState::Idle;

        report
    }

    fn skip_reason(&self, source: &CalendarSource, window: &TimeWindow) -> Option<SkipReason> {
        if !source.is_selected() {
            return Some(SkipReason::NotSelected);
        }
        if source.has_fetched(window) {
            return Some(SkipReason::Cached);
        }
        if self.in_flight.is_some() {
            return Some(SkipReason::FetchInFlight);
        }
        None
    }

    /// Fetches one source, retrying per policy. Publishes exactly one error
    /// notice if every attempt fails.
    async fn fetch_source(
        &mut self,
        source: &CalendarSource,
        window: &TimeWindow,
    ) -> Result<NormalizedBatch, ProviderError> {
        let policy = self.config.failure_policy;
        let max_attempts = policy.max_attempts();
        let mut attempt = 0;

        self.notices
            .start(Severity::Info, format!("Loading {}...", source.name()));

        loop {
            attempt += 1;
            self.in_flight = Some(InFlight {
                source_id: source.id().to_string(),
                started: Instant::now(),
            });

            let result = self.fetch_once(source.id(), window).await;
            self.in_flight = None;

            match result {
                Ok(raws) => {
                    self.notices.stop();
                    return Ok(normalize_events(&raws, source.id(), source.style()));
                }
                Err(e) if attempt < max_attempts && e.is_retryable() => {
                    let delay = policy.backoff_delay(attempt);
                    warn!(
                        source = %source.id(),
                        attempt,
                        max_attempts,
                        ?delay,
                        error = %e,
                        "fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(source = %source.id(), attempt, error = %e, "fetch failed");
                    self.notices.start(Severity::Error, e.message());
                    self.notices.stop_after(self.config.notice_clear_delay);
                    return Err(e);
                }
            }
        }
    }

    async fn fetch_once(
        &self,
        calendar_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<RawEvent>, ProviderError> {
        debug!(
            source = %calendar_id,
            start = %window.start,
            end = %window.end,
            "fetching events"
        );
        let query = EventQuery::new(calendar_id, *window);
        let timeout = self.config.fetch_timeout;

        match tokio::time::timeout(timeout, self.client.fetch_events(query)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(format!(
                "Loading {} timed out after {}s",
                calendar_id,
                timeout.as_secs()
            ))
            .with_provider(self.client.name())),
        }
    }
}
