//! Timeline command: page through a published diary with manual triggers.

use super::load_config_or_default;
use almanac_timeline::{
    HttpPageFetcher, LoadOutcome, PageFetcher, TimelineController, TimelineOptions,
};
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

pub async fn show_timeline(config_path: &Path, base_url: &str, pages: u32) -> Result<()> {
    let config = load_config_or_default(config_path)?;
    let options = TimelineOptions {
        scroll_threshold: config.timeline.scroll_threshold,
        debounce: Duration::from_millis(config.timeline.debounce_ms),
    };

    let fetcher = HttpPageFetcher::new(base_url);
    let first = fetcher
        .fetch_page(1)
        .await
        .with_context(|| format!("Failed to load the first page from {}", base_url))?;

    let controller = TimelineController::new(fetcher, first, options);
    for _ in 1..pages {
        match controller.load_more().await {
            LoadOutcome::Appended { page, added } => {
                tracing::info!("Page {}: {} entries", page, added);
            }
            LoadOutcome::Exhausted { page } => {
                tracing::info!("Page {} is empty, no more entries", page);
                break;
            }
            LoadOutcome::Failed { page } => {
                tracing::warn!("Stopped at page {}", page);
                break;
            }
            LoadOutcome::Skipped | LoadOutcome::Discarded { .. } => break,
        }
    }
    controller.teardown();

    for entry in controller.entries() {
        let times: Vec<&str> = entry
            .time_blocks
            .iter()
            .filter(|block| block.show_time)
            .map(|block| block.time.as_str())
            .collect();
        println!("{}\t{}", entry.entry_id(), times.join(" "));
    }
    if controller.has_more() {
        println!("(more entries available)");
    }
    Ok(())
}
