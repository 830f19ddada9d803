//! CLI command implementations.

pub mod build;
pub mod identify;
pub mod protect;
pub mod serve;
pub mod timeline;
pub mod unlock;

pub use build::build_site;
pub use identify::identify;
pub use protect::protect_post;
pub use serve::serve_site;
pub use timeline::show_timeline;
pub use unlock::unlock_payload;

use almanac_core::Config;
use anyhow::{Context, Result};
use std::path::Path;

/// Load the config file, failing if it is missing or invalid
pub(crate) fn load_config(config_path: &Path) -> Result<Config> {
    tracing::info!("Loading config from {:?}", config_path);
    Config::from_file(config_path).context("Failed to load configuration")
}

/// Load the config file if present, otherwise fall back to defaults
pub(crate) fn load_config_or_default(config_path: &Path) -> Result<Config> {
    if config_path.exists() {
        load_config(config_path)
    } else {
        tracing::debug!("No config at {:?}, using defaults", config_path);
        Ok(Config::default())
    }
}
