//! Site building: diary pages, quarter index and protected post payloads.

use crate::{
    config::Config,
    diary::DiaryArchive,
    frontmatter::parse_frontmatter,
    pipeline::PipelineContext,
    protected::{encrypt, CodecError},
    slug::slugify,
};
use almanac_types::{ParsedEntry, ProtectedPostEnvelope};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frontmatter error in {path}: {source}")]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: crate::frontmatter::FrontmatterError,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Encryption error: {0}")]
    Codec(#[from] CodecError),

    #[error("Duplicate protected slug: {0}")]
    DuplicateSlug(String),
}

/// Summary of a finished build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub diary_files: usize,
    pub diary_entries: usize,
    pub pages: u32,
    pub protected_posts: usize,
    pub skipped: usize,
}

/// Main site builder
pub struct SiteBuilder {
    config: Config,
    ctx: PipelineContext,
}

impl SiteBuilder {
    pub fn new(config: Config) -> Self {
        let ctx = PipelineContext::from_config(&config);
        Self { config, ctx }
    }

    pub fn with_context(config: Config, ctx: PipelineContext) -> Self {
        Self { config, ctx }
    }

    /// Build the entire site
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let output_dir = self.config.output_dir();
        fs::create_dir_all(&output_dir)?;

        let mut report = BuildReport::default();

        let (archive, diary_files, skipped) = self.load_diary()?;
        report.diary_files = diary_files;
        report.diary_entries = archive.len();
        report.skipped += skipped;
        report.pages = self.write_diary_api(&archive, &output_dir)?;

        let (protected, skipped) = self.write_protected_posts(&output_dir)?;
        report.protected_posts = protected;
        report.skipped += skipped;

        tracing::info!(
            "Built {} diary entries over {} pages, {} protected posts",
            report.diary_entries,
            report.pages,
            report.protected_posts
        );
        Ok(report)
    }

    /// Parse every publishable diary file into the archive
    pub fn load_diary(&self) -> Result<(DiaryArchive, usize, usize), BuildError> {
        let files = discover_markdown_files(&self.config.diary_dir());
        tracing::info!("Found {} diary files", files.len());

        let mut archive = DiaryArchive::new();
        let mut skipped = 0;
        for path in &files {
            match self.parse_diary_file(path)? {
                Some(entry) => archive.insert(entry),
                None => skipped += 1,
            }
        }
        Ok((archive, files.len(), skipped))
    }

    fn parse_diary_file(&self, path: &Path) -> Result<Option<ParsedEntry>, BuildError> {
        let content = fs::read_to_string(path)?;
        let (frontmatter, body) =
            parse_frontmatter(&content).map_err(|source| BuildError::Frontmatter {
                path: path.to_path_buf(),
                source,
            })?;
        if frontmatter.draft {
            tracing::debug!("Skipping draft {}", path.display());
            return Ok(None);
        }

        let raw_id = file_name(path);
        Ok(Some(self.ctx.parse_diary(&raw_id, &body, Some(path))))
    }

    fn write_diary_api(&self, archive: &DiaryArchive, output_dir: &Path) -> Result<u32, BuildError> {
        let api_dir = output_dir.join("api").join("diary");
        fs::create_dir_all(&api_dir)?;

        let per_page = self.config.diary.entries_per_page;
        let mut pages = 0;
        for page in archive.pages(per_page) {
            let path = api_dir.join(format!("{}.json", page.pagination.current_page));
            write_json(&path, &page)?;
            pages += 1;
        }

        write_json(&api_dir.join("quarters.json"), &archive.by_quarter())?;
        Ok(pages)
    }

    fn write_protected_posts(&self, output_dir: &Path) -> Result<(usize, usize), BuildError> {
        let files = discover_markdown_files(&self.config.blog_dir());
        let api_dir = output_dir.join("api").join("protected");

        let mut slugs = HashSet::new();
        let mut written = 0;
        let mut skipped = 0;

        for path in &files {
            let content = fs::read_to_string(path)?;
            let (frontmatter, body) =
                parse_frontmatter(&content).map_err(|source| BuildError::Frontmatter {
                    path: path.to_path_buf(),
                    source,
                })?;
            let Some(password) = frontmatter.password.as_deref() else {
                continue;
            };
            if frontmatter.draft {
                skipped += 1;
                continue;
            }

            let stem = file_stem(path);
            let slug = frontmatter
                .slug
                .as_deref()
                .map(slugify)
                .unwrap_or_else(|| slugify(&stem));
            if !slugs.insert(slug.clone()) {
                return Err(BuildError::DuplicateSlug(slug));
            }

            let envelope = ProtectedPostEnvelope {
                title: frontmatter.title.clone().unwrap_or_else(|| stem.clone()),
                password_hint: frontmatter.password_hint.clone(),
                payload: encrypt(&body, password)?,
                slug,
            };

            fs::create_dir_all(&api_dir)?;
            write_json(&api_dir.join(format!("{}.json", envelope.slug)), &envelope)?;
            tracing::debug!("Encrypted {}", path.display());
            written += 1;
        }

        Ok((written, skipped))
    }
}

/// Markdown files under `dir`, sorted by path, skipping `_`-prefixed names
fn discover_markdown_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        tracing::warn!("Directory {} does not exist", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            matches!(
                e.path().extension().and_then(|ext| ext.to_str()),
                Some("md") | Some("mdx")
            )
        })
        .filter(|e| {
            let hidden = e.file_name().to_string_lossy().starts_with('_');
            if hidden {
                tracing::debug!("Ignoring {}", e.path().display());
            }
            !hidden
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), BuildError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_skips_underscore_and_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2024-01-01.md"), "x").unwrap();
        fs::write(dir.path().join("_template.md"), "x").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir_all(dir.path().join("2023")).unwrap();
        fs::write(dir.path().join("2023/2023-12-31.mdx"), "x").unwrap();

        let names: Vec<String> = discover_markdown_files(dir.path())
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["2023-12-31.mdx", "2024-01-01.md"]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_markdown_files(&dir.path().join("nope")).is_empty());
    }
}
