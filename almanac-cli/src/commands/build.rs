//! Build command implementation.

use super::load_config;
use almanac_core::{BuildReport, Config, SiteBuilder};
use anyhow::{Context, Result};
use std::path::Path;

/// Build the site and print a summary
pub fn build_site(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let report = build_site_with_config(config)?;

    println!(
        "Built {} diary entries from {} files ({} pages), {} protected posts, {} skipped",
        report.diary_entries,
        report.diary_files,
        report.pages,
        report.protected_posts,
        report.skipped
    );
    Ok(())
}

/// Build from an already loaded config
pub fn build_site_with_config(config: Config) -> Result<BuildReport> {
    if !config.site.title.is_empty() {
        tracing::info!("Building site: {}", config.site.title);
    }
    let output_dir = config.output_dir();
    let report = SiteBuilder::new(config)
        .build()
        .context("Failed to build site")?;
    tracing::info!("Output written to {:?}", output_dir);
    Ok(report)
}
