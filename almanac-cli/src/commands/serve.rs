//! Serve command: static hosting of the built site and its pagination API.

use super::build::build_site_with_config;
use super::load_config;
use anyhow::{Context, Result};
use axum::Router;
use std::path::Path;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Build once, then serve the output directory
pub async fn serve_site(config_path: &Path, port: u16) -> Result<()> {
    let config = load_config(config_path)?;
    let output_dir = config.output_dir();

    let report = tokio::task::spawn_blocking(move || build_site_with_config(config))
        .await
        .context("Build task failed")??;
    tracing::info!(
        "Serving {} diary entries over {} pages",
        report.diary_entries,
        report.pages
    );

    let app = Router::new()
        .fallback_service(ServeDir::new(&output_dir))
        .layer(TraceLayer::new_for_http());

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Serving {:?} at http://{}", output_dir, addr);
    println!("Serving at http://{}/api/diary/1.json", addr);
    println!("Press Ctrl+C to stop");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
