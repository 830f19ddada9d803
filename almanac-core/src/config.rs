//! Configuration parsing and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Main configuration struct matching the almanac.yml schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub diary: DiaryConfig,

    #[serde(default)]
    pub protected: ProtectedConfig,

    #[serde(default)]
    pub markdown: MarkdownConfig,

    #[serde(default)]
    pub timeline: TimelineConfig,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SiteConfig {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_diary_dir")]
    pub diary: PathBuf,

    #[serde(default = "default_blog_dir")]
    pub blog: PathBuf,

    #[serde(default = "default_attachment_dir")]
    pub attachments: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output: PathBuf,
}

fn default_diary_dir() -> PathBuf {
    PathBuf::from("src/data/diary")
}

fn default_blog_dir() -> PathBuf {
    PathBuf::from("src/data/blog")
}

fn default_attachment_dir() -> PathBuf {
    PathBuf::from("src/data/attachment")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            diary: default_diary_dir(),
            blog: default_blog_dir(),
            attachments: default_attachment_dir(),
            output: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiaryConfig {
    #[serde(default = "default_entries_per_page")]
    pub entries_per_page: u32,
}

fn default_entries_per_page() -> u32 {
    5
}

impl Default for DiaryConfig {
    fn default() -> Self {
        Self {
            entries_per_page: default_entries_per_page(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedConfig {
    /// Longest edge requested from the image optimizer
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
}

fn default_thumbnail_size() -> u32 {
    1000
}

impl Default for ProtectedConfig {
    fn default() -> Self {
        Self {
            thumbnail_size: default_thumbnail_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// Heading text under which the table of contents is inserted
    #[serde(default = "default_toc_heading")]
    pub toc_heading: String,
}

fn default_toc_heading() -> String {
    String::from("目录")
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            toc_heading: default_toc_heading(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Distance from the document bottom (px) that triggers the next page
    #[serde(default = "default_scroll_threshold")]
    pub scroll_threshold: f64,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_scroll_threshold() -> f64 {
    1000.0
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            scroll_threshold: default_scroll_threshold(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.diary.entries_per_page == 0 {
            return Err(ConfigError::InvalidValue {
                field: "diary.entries_per_page".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.protected.thumbnail_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "protected.thumbnail_size".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Diary directory, resolved relative to the config file
    pub fn diary_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.diary)
    }

    /// Blog directory, resolved relative to the config file
    pub fn blog_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.blog)
    }

    /// Attachment namespace root, resolved relative to the config file
    pub fn attachment_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.attachments)
    }

    /// Output directory, resolved relative to the config file
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.output)
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(parent) = self.config_path.as_deref().and_then(Path::parent) {
            parent.join(path)
        } else {
            path.to_path_buf()
        }
    }
}
