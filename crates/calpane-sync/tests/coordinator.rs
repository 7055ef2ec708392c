//! End-to-end behavior of the fetch coordinator against a scripted source.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use calpane_core::TimeWindow;
use calpane_providers::{
    BoxFuture, CalendarInfo, EventQuery, EventSourceClient, ProviderError, ProviderResult, RawEvent,
};
use calpane_sync::{
    CalendarSource, CoordinatorConfig, CoordinatorState, FailurePolicy, FetchCoordinator, Notice,
    NoticeBus, Severity,
};
use chrono::{TimeZone, Utc};
use tokio::sync::broadcast;

/// One scripted answer to a fetch.
enum Reply {
    Events(Vec<RawEvent>),
    Fail(ProviderError),
}

/// Answers fetches from per-calendar scripts and records every call.
///
/// Each fetch takes `latency` of (paused) time so overlapping calls would be
/// visible in `max_outstanding`.
#[derive(Default)]
struct ScriptedSource {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<EventQuery>>,
    outstanding: AtomicUsize,
    max_outstanding: AtomicUsize,
    latency: Duration,
}

impl ScriptedSource {
    fn new() -> Self {
        Self {
            latency: Duration::from_millis(200),
            ..Self::default()
        }
    }

    fn script(self, calendar_id: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(calendar_id.to_string(), replies.into());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|q| q.calendar_id.clone())
            .collect()
    }

    fn next_reply(&self, calendar_id: &str) -> Reply {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(calendar_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Reply::Events(Vec::new()))
    }
}

impl EventSourceClient for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch_events(&self, query: EventQuery) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            let now = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_outstanding.fetch_max(now, Ordering::SeqCst);

            let reply = self.next_reply(&query.calendar_id);
            self.calls.lock().unwrap().push(query);
            tokio::time::sleep(self.latency).await;

            self.outstanding.fetch_sub(1, Ordering::SeqCst);
            match reply {
                Reply::Events(events) => Ok(events),
                Reply::Fail(error) => Err(error),
            }
        })
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

fn window(t0_ms: i64, t1_ms: i64) -> TimeWindow {
    TimeWindow::new(
        Utc.timestamp_millis_opt(t0_ms).unwrap(),
        Utc.timestamp_millis_opt(t1_ms).unwrap(),
    )
}

fn week() -> TimeWindow {
    TimeWindow::new(
        Utc.with_ymd_and_hms(2025, 2, 3, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 2, 10, 0, 0, 0).unwrap(),
    )
}

fn raw(id: &str, title: &str) -> RawEvent {
    RawEvent::timed(id, title, "2025-02-05T10:00:00Z", "2025-02-05T11:00:00Z")
}

fn coordinator(client: Arc<ScriptedSource>, config: CoordinatorConfig) -> FetchCoordinator {
    FetchCoordinator::new(client, NoticeBus::default(), config)
}

fn drain(rx: &mut broadcast::Receiver<Notice>) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices
}

#[tokio::test(start_paused = true)]
async fn selected_uncached_source_is_fetched_once() {
    let client = Arc::new(ScriptedSource::new().script("a", vec![Reply::Events(vec![raw("1", "x")])]));
    let mut coordinator = coordinator(client.clone(), CoordinatorConfig::default());
    let mut sources = vec![
        CalendarSource::new("a", "A"),
        CalendarSource::new("b", "B").with_selected(false),
    ];
    let w = window(1_700_000_000_000, 1_700_604_800_000);

    let mut completions = 0;
    let report = coordinator
        .run(&mut sources, &w, |_| {}, || completions += 1)
        .await;

    assert_eq!(client.calls(), vec!["a"]);
    assert_eq!(completions, 1);
    assert_eq!(report.fetched, 1);
    assert_eq!(report.skipped, 1);
    assert!(sources[0].has_fetched(&w));
    assert!(!sources[1].has_fetched(&w));
    assert_eq!(sources[0].events().len(), 1);
    assert_eq!(coordinator.state(), CoordinatorState::Idle);
}

#[tokio::test(start_paused = true)]
async fn second_run_issues_no_fetch() {
    let client = Arc::new(ScriptedSource::new());
    let mut coordinator = coordinator(client.clone(), CoordinatorConfig::default());
    let mut sources = vec![
        CalendarSource::new("a", "A"),
        CalendarSource::new("b", "B"),
        CalendarSource::new("c", "C"),
    ];

    coordinator.run(&mut sources, &week(), |_| {}, || {}).await;
    assert_eq!(client.calls().len(), 3);

    let mut completions = 0;
    let report = coordinator
        .run(&mut sources, &week(), |_| {}, || completions += 1)
        .await;

    assert_eq!(client.calls().len(), 3);
    assert!(report.is_noop());
    assert_eq!(report.skipped, 3);
    assert_eq!(completions, 1);
}

#[tokio::test(start_paused = true)]
async fn unselected_source_is_never_fetched() {
    let client = Arc::new(ScriptedSource::new());
    let mut coordinator = coordinator(client.clone(), CoordinatorConfig::default());
    let mut sources = vec![CalendarSource::new("hidden", "Hidden").with_selected(false)];

    for day in 0..3 {
        let w = window(day * 86_400_000, (day + 1) * 86_400_000);
        coordinator.run(&mut sources, &w, |_| {}, || {}).await;
    }
    sources[0].invalidate();
    coordinator.run(&mut sources, &week(), |_| {}, || {}).await;

    assert!(client.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn fetches_never_overlap_and_keep_source_order() {
    let client = Arc::new(ScriptedSource::new());
    let mut coordinator = coordinator(client.clone(), CoordinatorConfig::default());
    let mut sources: Vec<_> = ["a", "b", "c", "d"]
        .iter()
        .map(|id| CalendarSource::new(*id, id.to_uppercase()))
        .collect();

    let mut progress = Vec::new();
    coordinator
        .run(
            &mut sources,
            &week(),
            |source| progress.push(source.id().to_string()),
            || {},
        )
        .await;

    assert_eq!(client.max_outstanding.load(Ordering::SeqCst), 1);
    assert_eq!(client.calls(), vec!["a", "b", "c", "d"]);
    assert_eq!(progress, vec!["a", "b", "c", "d"]);
}

#[tokio::test(start_paused = true)]
async fn repeated_ids_keep_first_record() {
    let client = Arc::new(ScriptedSource::new().script(
        "a",
        vec![
            Reply::Events(vec![raw("1", "x"), raw("1", "y"), raw("2", "z")]),
            Reply::Events(vec![raw("2", "newer"), raw("3", "w")]),
        ],
    ));
    let mut coordinator = coordinator(client, CoordinatorConfig::default());
    let mut sources = vec![CalendarSource::new("a", "A")];

    coordinator.run(&mut sources, &week(), |_| {}, || {}).await;
    coordinator
        .run(&mut sources, &window(0, 86_400_000), |_| {}, || {})
        .await;

    let got: Vec<_> = sources[0]
        .events()
        .iter()
        .map(|e| (e.id.as_str(), e.title.as_str()))
        .collect();
    assert_eq!(got, vec![("1", "x"), ("2", "z"), ("3", "w")]);
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_leaves_cache_and_notices_once() {
    let client = Arc::new(ScriptedSource::new().script(
        "a",
        vec![Reply::Fail(ProviderError::server("Backend Error"))],
    ));
    let config = CoordinatorConfig::default().with_notice_clear_delay(Duration::from_secs(3));
    let mut coordinator = coordinator(client.clone(), config);
    let mut rx = coordinator.notices().subscribe();
    let mut sources = vec![CalendarSource::new("a", "A"), CalendarSource::new("b", "B")];

    let mut completions = 0;
    let report = coordinator
        .run(&mut sources, &week(), |_| {}, || completions += 1)
        .await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.fetched, 1);
    assert_eq!(completions, 1);
    assert!(!sources[0].has_fetched(&week()));
    assert_eq!(sources[0].fetched_count(), 0);
    assert!(sources[0].events().is_empty());
    assert!(sources[1].has_fetched(&week()));

    let notices = drain(&mut rx);
    let errors: Vec<_> = notices.iter().filter(|n| n.is_error()).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0],
        &Notice::Start {
            severity: Severity::Error,
            message: "Backend Error".to_string()
        }
    );

    // the error banner is cleared after the configured delay
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(drain(&mut rx), vec![Notice::Stop]);

    // the failed window is retried on the next run
    let report = coordinator.run(&mut sources, &week(), |_| {}, || {}).await;
    assert_eq!(report.fetched, 1);
    assert_eq!(client.calls(), vec!["a", "b", "a"]);
    assert!(sources[0].has_fetched(&week()));
}

#[tokio::test(start_paused = true)]
async fn retry_policy_retries_same_source_before_advancing() {
    let client = Arc::new(ScriptedSource::new().script(
        "a",
        vec![
            Reply::Fail(ProviderError::network("connection reset")),
            Reply::Fail(ProviderError::rate_limited("slow down")),
            Reply::Events(vec![raw("1", "x")]),
        ],
    ));
    let config = CoordinatorConfig::default().with_failure_policy(FailurePolicy::Retry {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(100),
        max_backoff: Duration::from_secs(1),
    });
    let mut coordinator = coordinator(client.clone(), config);
    let mut rx = coordinator.notices().subscribe();
    let mut sources = vec![CalendarSource::new("a", "A"), CalendarSource::new("b", "B")];

    let report = coordinator.run(&mut sources, &week(), |_| {}, || {}).await;

    assert_eq!(client.calls(), vec!["a", "a", "a", "b"]);
    assert_eq!(report.fetched, 2);
    assert_eq!(report.failed, 0);
    assert!(drain(&mut rx).iter().all(|n| !n.is_error()));
}

#[tokio::test(start_paused = true)]
async fn retry_policy_stops_after_max_attempts() {
    let client = Arc::new(ScriptedSource::new().script(
        "a",
        (0..5)
            .map(|_| Reply::Fail(ProviderError::network("connection reset")))
            .collect(),
    ));
    let config = CoordinatorConfig::default().with_failure_policy(FailurePolicy::Retry {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(100),
        max_backoff: Duration::from_secs(1),
    });
    let mut coordinator = coordinator(client.clone(), config);
    let mut rx = coordinator.notices().subscribe();
    let mut sources = vec![CalendarSource::new("a", "A"), CalendarSource::new("b", "B")];

    let started = tokio::time::Instant::now();
    let report = coordinator.run(&mut sources, &week(), |_| {}, || {}).await;
    let elapsed = started.elapsed();

    assert_eq!(client.calls(), vec!["a", "a", "a", "b"]);
    assert_eq!(report.failed, 1);
    assert_eq!(report.fetched, 1);
    assert!(!sources[0].has_fetched(&week()));
    assert!(sources[1].has_fetched(&week()));

    // four fetches of 200ms plus 100ms and 200ms of backoff
    assert!(elapsed >= Duration::from_millis(1100), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(1200), "{elapsed:?}");

    let notices = drain(&mut rx);
    assert_eq!(notices.iter().filter(|n| n.is_error()).count(), 1);
    let loading: Vec<_> = notices
        .iter()
        .filter(|n| {
            matches!(n, Notice::Start { severity: Severity::Info, .. })
        })
        .collect();
    assert_eq!(
        loading,
        vec![
            &Notice::Start {
                severity: Severity::Info,
                message: "Loading A...".to_string()
            },
            &Notice::Start {
                severity: Severity::Info,
                message: "Loading B...".to_string()
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn cancelled_run_leaves_next_window_fetchable() {
    let client = Arc::new(ScriptedSource {
        latency: Duration::from_secs(2),
        ..ScriptedSource::new()
    });
    let mut coordinator = coordinator(client.clone(), CoordinatorConfig::default());
    let mut sources = vec![CalendarSource::new("a", "A"), CalendarSource::new("b", "B")];

    let cancelled = tokio::time::timeout(
        Duration::from_millis(500),
        coordinator.run(&mut sources, &week(), |_| {}, || {}),
    )
    .await;
    assert!(cancelled.is_err());
    assert!(!sources[0].has_fetched(&week()));

    let next_week = TimeWindow::new(
        Utc.with_ymd_and_hms(2025, 2, 10, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 2, 17, 0, 0, 0).unwrap(),
    );
    let mut completions = 0;
    let report = coordinator
        .run(&mut sources, &next_week, |_| {}, || completions += 1)
        .await;

    assert_eq!(report.fetched, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(completions, 1);
    assert!(coordinator.in_flight().is_none());
    assert!(sources[0].has_fetched(&next_week));
    assert_eq!(client.calls(), vec!["a", "a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn retry_policy_gives_up_on_permanent_errors() {
    let client = Arc::new(ScriptedSource::new().script(
        "a",
        vec![Reply::Fail(ProviderError::authorization("Forbidden"))],
    ));
    let config = CoordinatorConfig::default().with_failure_policy(FailurePolicy::retry(5));
    let mut coordinator = coordinator(client.clone(), config);
    let mut rx = coordinator.notices().subscribe();
    let mut sources = vec![CalendarSource::new("a", "A")];

    let report = coordinator.run(&mut sources, &week(), |_| {}, || {}).await;

    assert_eq!(client.calls(), vec!["a"]);
    assert_eq!(report.failed, 1);
    assert_eq!(drain(&mut rx).iter().filter(|n| n.is_error()).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn malformed_records_are_rejected_not_merged() {
    let broken = RawEvent {
        start: None,
        ..raw("bad", "no start")
    };
    let client = Arc::new(ScriptedSource::new().script(
        "a",
        vec![Reply::Events(vec![raw("1", "ok"), broken, raw("2", "ok").with_status("cancelled")])],
    ));
    let mut coordinator = coordinator(client, CoordinatorConfig::default());
    let mut sources = vec![CalendarSource::new("a", "A")];

    let report = coordinator.run(&mut sources, &week(), |_| {}, || {}).await;

    assert_eq!(report.rejected, 1);
    let ids: Vec<_> = sources[0].events().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["1"]);
    assert!(sources[0].has_fetched(&week()));
}

#[tokio::test(start_paused = true)]
async fn successful_fetch_shows_then_hides_loading_notice() {
    let client = Arc::new(ScriptedSource::new());
    let mut coordinator = coordinator(client, CoordinatorConfig::default());
    let mut rx = coordinator.notices().subscribe();
    let mut sources = vec![CalendarSource::new("work", "Work")];

    coordinator.run(&mut sources, &week(), |_| {}, || {}).await;

    assert_eq!(
        drain(&mut rx),
        vec![
            Notice::Start {
                severity: Severity::Info,
                message: "Loading Work...".to_string()
            },
            Notice::Stop,
        ]
    );
}
