//! Timeline pagination state machine.
//!
//! ```text
//! Idle --load--> Loading --entries--> Idle
//!                        --empty----> Exhausted
//!                        --error----> Exhausted (no retry)
//! ```
//!
//! The lock guarding the state is never held across an await; overlapping
//! triggers are turned away by the in-flight page set. A load future dropped
//! mid-fetch releases its page so later triggers can retry it.

use crate::fetch::PageFetcher;
use crate::scroll::{ScrollMetrics, TimelineOptions};
use almanac_types::{DiaryPage, ParsedEntry};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Loading,
    Exhausted,
}

/// What a trigger ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Page fetched; `added` new entries were appended
    Appended { page: u32, added: usize },
    /// The server had nothing more
    Exhausted { page: u32 },
    /// The fetch failed; pagination is stopped for this session
    Failed { page: u32 },
    /// Suppressed by a guard: torn down, exhausted, already in flight or debounced
    Skipped,
    /// Completed after teardown; the result was dropped
    Discarded { page: u32 },
}

#[derive(Debug)]
struct Inner {
    entries: Vec<ParsedEntry>,
    current_page: u32,
    has_more: bool,
    in_flight: HashSet<u32>,
    torn_down: bool,
}

impl Inner {
    /// Append entries not already displayed, returning how many were new
    fn append(&mut self, entries: Vec<ParsedEntry>) -> usize {
        let mut added = 0;
        for entry in entries {
            let shown = self
                .entries
                .iter()
                .any(|existing| existing.span_key() == entry.span_key());
            if !shown {
                self.entries.push(entry);
                added += 1;
            }
        }
        added
    }
}

/// Removes a page from the in-flight set unless the request completed normally
struct InFlight<'c> {
    inner: &'c Mutex<Inner>,
    page: u32,
    armed: bool,
}

impl InFlight<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("request for page {} dropped before completion", self.page);
            self.inner.lock().in_flight.remove(&self.page);
        }
    }
}

/// Drives page loading for an append-only timeline
pub struct TimelineController<F> {
    fetcher: F,
    options: TimelineOptions,
    inner: Mutex<Inner>,
    scroll_generation: AtomicU64,
}

impl<F: PageFetcher> TimelineController<F> {
    /// Start from the server-rendered first page
    pub fn new(fetcher: F, initial: DiaryPage, options: TimelineOptions) -> Self {
        Self {
            fetcher,
            options,
            inner: Mutex::new(Inner {
                entries: initial.entries,
                current_page: initial.pagination.current_page,
                has_more: initial.pagination.has_more,
                in_flight: HashSet::new(),
                torn_down: false,
            }),
            scroll_generation: AtomicU64::new(0),
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn options(&self) -> &TimelineOptions {
        &self.options
    }

    pub fn entries(&self) -> Vec<ParsedEntry> {
        self.inner.lock().entries.clone()
    }

    pub fn entry_count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn current_page(&self) -> u32 {
        self.inner.lock().current_page
    }

    pub fn has_more(&self) -> bool {
        self.inner.lock().has_more
    }

    pub fn state(&self) -> ControllerState {
        let inner = self.inner.lock();
        if !inner.in_flight.is_empty() {
            ControllerState::Loading
        } else if inner.has_more {
            ControllerState::Idle
        } else {
            ControllerState::Exhausted
        }
    }

    /// Stop issuing requests. Anything still in flight completes and is discarded.
    pub fn teardown(&self) {
        self.inner.lock().torn_down = true;
    }

    /// Request the next page (the manual trigger)
    pub async fn load_more(&self) -> LoadOutcome {
        let page = {
            let mut inner = self.inner.lock();
            if inner.torn_down || !inner.has_more {
                return LoadOutcome::Skipped;
            }
            let next = inner.current_page + 1;
            if !inner.in_flight.insert(next) {
                tracing::debug!("page {} already in flight", next);
                return LoadOutcome::Skipped;
            }
            next
        };
        let mut guard = InFlight {
            inner: &self.inner,
            page,
            armed: true,
        };

        let result = self.fetcher.fetch_page(page).await;

        let mut inner = self.inner.lock();
        inner.in_flight.remove(&page);
        guard.disarm();

        if inner.torn_down {
            tracing::debug!("discarding page {} after teardown", page);
            return LoadOutcome::Discarded { page };
        }

        match result {
            Ok(response) if response.entries.is_empty() => {
                inner.has_more = false;
                LoadOutcome::Exhausted { page }
            }
            Ok(response) => {
                let added = inner.append(response.entries);
                inner.current_page = page;
                inner.has_more = response.pagination.has_more;
                tracing::debug!("page {}: {} new entries", page, added);
                LoadOutcome::Appended { page, added }
            }
            Err(e) => {
                tracing::warn!("failed to load page {}: {}", page, e);
                inner.has_more = false;
                LoadOutcome::Failed { page }
            }
        }
    }

    /// Scroll trigger. Waits out the debounce window; only the last scroll in a
    /// burst may load, and only when it is near the bottom.
    pub async fn on_scroll(&self, metrics: ScrollMetrics) -> LoadOutcome {
        let generation = self.scroll_generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.options.debounce).await;

        if self.scroll_generation.load(Ordering::SeqCst) != generation {
            return LoadOutcome::Skipped;
        }
        if !metrics.near_bottom(self.options.scroll_threshold) {
            return LoadOutcome::Skipped;
        }
        self.load_more().await
    }
}
