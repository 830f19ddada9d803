//! Behaviour of the pagination controller against scripted fetchers.

use almanac_timeline::{
    ControllerState, FetchError, HttpPageFetcher, LoadOutcome, PageFetcher, ScrollMetrics,
    TimelineController, TimelineOptions,
};
use almanac_types::{DiaryIdentifierMeta, DiaryPage, PaginationInfo, ParsedEntry, TimeBlock};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn entry(date: &str) -> ParsedEntry {
    ParsedEntry {
        meta: DiaryIdentifierMeta {
            raw_id: date.to_string(),
            start_date: date.to_string(),
            end_date: date.to_string(),
            is_range: false,
            quarter_key: "2024-Q1".to_string(),
            sort_key: date.to_string(),
        },
        time_blocks: vec![TimeBlock::new("09:00")],
    }
}

fn page(n: u32, dates: &[&str], has_more: bool) -> DiaryPage {
    DiaryPage {
        entries: dates.iter().map(|d| entry(d)).collect(),
        pagination: PaginationInfo {
            current_page: n,
            total_pages: if has_more { n + 1 } else { n },
            has_more,
            items_per_page: 2,
        },
    }
}

/// Serves canned pages; a missing page is a server error. Optionally waits on a
/// gate before answering.
#[derive(Default)]
struct ScriptedFetcher {
    pages: HashMap<u32, DiaryPage>,
    calls: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl ScriptedFetcher {
    fn with_page(mut self, page: DiaryPage) -> Self {
        self.pages.insert(page.pagination.current_page, page);
        self
    }

    fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(&self, n: u32) -> Result<DiaryPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.pages
            .get(&n)
            .cloned()
            .ok_or(FetchError::Status { page: n, status: 500 })
    }
}

fn first_page() -> DiaryPage {
    page(1, &["2024-01-10", "2024-01-09"], true)
}

fn controller(fetcher: ScriptedFetcher) -> TimelineController<ScriptedFetcher> {
    TimelineController::new(fetcher, first_page(), TimelineOptions::default())
}

#[tokio::test]
async fn test_appends_next_page() {
    let fetcher = ScriptedFetcher::default().with_page(page(2, &["2024-01-08"], false));
    let timeline = controller(fetcher);

    assert_eq!(timeline.state(), ControllerState::Idle);
    assert_eq!(
        timeline.load_more().await,
        LoadOutcome::Appended { page: 2, added: 1 }
    );
    assert_eq!(timeline.current_page(), 2);
    assert_eq!(timeline.entry_count(), 3);
    assert_eq!(timeline.state(), ControllerState::Exhausted);

    // Server said there is nothing after page 2
    assert_eq!(timeline.load_more().await, LoadOutcome::Skipped);
}

#[tokio::test]
async fn test_concurrent_triggers_fetch_once() {
    let gate = Arc::new(Notify::new());
    let fetcher = ScriptedFetcher::default()
        .with_page(page(2, &["2024-01-08", "2024-01-07"], true))
        .gated(gate.clone());
    let timeline = controller(fetcher);

    let (first, second, _) = tokio::join!(timeline.load_more(), timeline.load_more(), async {
        gate.notify_one();
    });

    assert_eq!(first, LoadOutcome::Appended { page: 2, added: 2 });
    assert_eq!(second, LoadOutcome::Skipped);
    assert_eq!(timeline.fetcher().calls(), 1);
    assert_eq!(timeline.entry_count(), 4);
    assert!(timeline.has_more());
}

#[tokio::test]
async fn test_failure_stops_pagination() {
    let fetcher = ScriptedFetcher::default();
    let timeline = controller(fetcher);

    assert_eq!(timeline.load_more().await, LoadOutcome::Failed { page: 2 });
    assert!(!timeline.has_more());
    assert_eq!(timeline.state(), ControllerState::Exhausted);
    assert_eq!(timeline.load_more().await, LoadOutcome::Skipped);
    assert_eq!(timeline.entry_count(), 2);
}

#[tokio::test]
async fn test_empty_page_exhausts() {
    let fetcher = ScriptedFetcher::default().with_page(page(2, &[], true));
    let timeline = controller(fetcher);

    assert_eq!(timeline.load_more().await, LoadOutcome::Exhausted { page: 2 });
    assert_eq!(timeline.state(), ControllerState::Exhausted);
    assert_eq!(timeline.current_page(), 1);
}

#[tokio::test]
async fn test_displayed_entries_are_not_duplicated() {
    let fetcher =
        ScriptedFetcher::default().with_page(page(2, &["2024-01-09", "2024-01-08"], false));
    let timeline = controller(fetcher);

    assert_eq!(
        timeline.load_more().await,
        LoadOutcome::Appended { page: 2, added: 1 }
    );
    let dates: Vec<String> = timeline
        .entries()
        .iter()
        .map(|e| e.meta.start_date.clone())
        .collect();
    assert_eq!(dates, vec!["2024-01-10", "2024-01-09", "2024-01-08"]);
}

#[tokio::test]
async fn test_teardown_discards_in_flight_result() {
    let gate = Arc::new(Notify::new());
    let fetcher = ScriptedFetcher::default()
        .with_page(page(2, &["2024-01-08"], true))
        .gated(gate.clone());
    let timeline = controller(fetcher);

    let (outcome, _) = tokio::join!(timeline.load_more(), async {
        timeline.teardown();
        gate.notify_one();
    });

    assert_eq!(outcome, LoadOutcome::Discarded { page: 2 });
    assert_eq!(timeline.entry_count(), 2);
    assert_eq!(timeline.load_more().await, LoadOutcome::Skipped);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_load_releases_page() {
    let gate = Arc::new(Notify::new());
    let fetcher = ScriptedFetcher::default()
        .with_page(page(2, &["2024-01-08"], true))
        .gated(gate.clone());
    let timeline = controller(fetcher);

    let abandoned =
        tokio::time::timeout(Duration::from_millis(10), timeline.load_more()).await;
    assert!(abandoned.is_err());
    assert_eq!(timeline.state(), ControllerState::Idle);
    assert!(timeline.has_more());

    // The next trigger asks for the same page again
    gate.notify_one();
    assert_eq!(
        timeline.load_more().await,
        LoadOutcome::Appended { page: 2, added: 1 }
    );
    assert_eq!(timeline.fetcher().calls(), 2);
    assert_eq!(timeline.state(), ControllerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_scroll_burst_is_debounced() {
    let fetcher = ScriptedFetcher::default().with_page(page(2, &["2024-01-08"], true));
    let timeline = controller(fetcher);
    let bottom = ScrollMetrics::new(800.0, 2200.0, 3000.0);

    let (a, b, c) = tokio::join!(
        timeline.on_scroll(bottom),
        timeline.on_scroll(bottom),
        timeline.on_scroll(bottom)
    );

    assert_eq!(a, LoadOutcome::Skipped);
    assert_eq!(b, LoadOutcome::Skipped);
    assert_eq!(c, LoadOutcome::Appended { page: 2, added: 1 });
    assert_eq!(timeline.fetcher().calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_scroll_far_from_bottom_does_nothing() {
    let fetcher = ScriptedFetcher::default().with_page(page(2, &["2024-01-08"], true));
    let timeline = TimelineController::new(
        fetcher,
        first_page(),
        TimelineOptions {
            scroll_threshold: 1000.0,
            debounce: Duration::from_millis(100),
        },
    );

    let outcome = timeline
        .on_scroll(ScrollMetrics::new(800.0, 0.0, 10_000.0))
        .await;
    assert_eq!(outcome, LoadOutcome::Skipped);
    assert_eq!(timeline.fetcher().calls(), 0);
    assert_eq!(timeline.current_page(), 1);
}

#[tokio::test]
async fn test_http_fetcher_reports_transport_errors() {
    // Nothing listens on the discard port
    let fetcher = HttpPageFetcher::new("http://127.0.0.1:9");
    let result = fetcher.fetch_page(2).await;
    assert!(matches!(result, Err(FetchError::Transport(_))));
}
