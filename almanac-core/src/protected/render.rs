//! Render path for unlocked posts.

use super::{decrypt, CodecError};
use crate::markdown::{html_escape, MarkdownProcessor, RenderContext};
use almanac_types::EncryptedPostPayload;
use regex::{Captures, NoExpand, Regex};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

/// Longest edge of generated thumbnails
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 1000;

const ATTACHMENT_MARKER: &str = "attachment";

#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error("Not an attachment path: {0}")]
    NotAnAttachment(String),

    #[error("Failed to read image {path}: {source}")]
    Probe {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// A display-ready variant of an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizedImage {
    pub thumbnail: String,
    pub width: u32,
    pub height: u32,
}

/// Supplies thumbnails and display dimensions for attachment images
pub trait ImageOptimizer: Send + Sync {
    fn optimize(&self, src: &str, thumbnail_size: u32) -> Result<OptimizedImage, OptimizeError>;
}

/// Reads image headers from the attachment directory and reports dimensions scaled
/// to fit the thumbnail box. The source URL is kept as the thumbnail.
#[derive(Debug, Clone)]
pub struct DimensionProbe {
    root: PathBuf,
}

impl DimensionProbe {
    pub fn new(attachment_root: impl Into<PathBuf>) -> Self {
        Self {
            root: attachment_root.into(),
        }
    }

    fn locate(&self, src: &str) -> Option<PathBuf> {
        let path = src.split(['?', '#']).next().unwrap_or(src);
        let (_, rel) = path.split_once("attachment/")?;
        let decoded = percent_encoding::percent_decode_str(rel)
            .decode_utf8()
            .ok()?
            .into_owned();
        (!decoded.is_empty()).then(|| self.root.join(decoded))
    }
}

impl ImageOptimizer for DimensionProbe {
    fn optimize(&self, src: &str, thumbnail_size: u32) -> Result<OptimizedImage, OptimizeError> {
        let path = self
            .locate(src)
            .ok_or_else(|| OptimizeError::NotAnAttachment(src.to_string()))?;
        let (width, height) =
            image::image_dimensions(&path).map_err(|source| OptimizeError::Probe {
                path: path.clone(),
                source,
            })?;
        let (width, height) = fit_within(width, height, thumbnail_size);
        Ok(OptimizedImage {
            thumbnail: src.to_string(),
            width,
            height,
        })
    }
}

/// Scale `(width, height)` down so the longest edge is at most `max_edge`
pub fn fit_within(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_edge || longest == 0 {
        return (width, height);
    }
    let scale = |side: u32| {
        let scaled = (side as u64 * max_edge as u64 + longest as u64 / 2) / longest as u64;
        scaled.max(1) as u32
    };
    (scale(width), scale(height))
}

fn img_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<img\b[^>]*>").expect("valid regex"))
}

fn src_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\ssrc="([^"]*)""#).expect("valid regex"))
}

fn size_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\s(?:width|height)="[^"]*""#).expect("valid regex"))
}

/// Point every attachment `<img>` at its thumbnail and give it explicit dimensions.
///
/// Images the optimizer cannot handle keep their original tag.
pub fn rewrite_attachment_images(
    html: &str,
    optimizer: &dyn ImageOptimizer,
    thumbnail_size: u32,
) -> String {
    img_tag_regex()
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[0];
            let Some(src) = src_attr_regex().captures(tag).map(|c| c[1].to_string()) else {
                return tag.to_string();
            };
            if !src.contains(ATTACHMENT_MARKER) {
                return tag.to_string();
            }

            match optimizer.optimize(&src, thumbnail_size) {
                Ok(optimized) => with_optimized(tag, &optimized),
                Err(e) => {
                    tracing::debug!("keeping original image {}: {}", src, e);
                    tag.to_string()
                }
            }
        })
        .into_owned()
}

fn with_optimized(tag: &str, optimized: &OptimizedImage) -> String {
    let without_size = size_attr_regex().replace_all(tag, "");
    let src = format!(r#" src="{}""#, html_escape(&optimized.thumbnail));
    let replaced_src = src_attr_regex().replace(&without_size, NoExpand(&src));
    let dims = format!(
        r#" width="{}" height="{}""#,
        optimized.width, optimized.height
    );

    let body = replaced_src.trim_end_matches('>');
    match body.strip_suffix('/') {
        Some(open) => format!("{}{} />", open.trim_end(), dims),
        None => format!("{}{}>", body.trim_end(), dims),
    }
}

/// Literal plaintext shown when a protected body cannot be rendered
pub fn escape_fallback(markdown: &str) -> String {
    format!("<pre>{}</pre>", html_escape(markdown))
}

/// Renders unlocked post bodies
pub struct ProtectedRenderer<'a> {
    processor: &'a MarkdownProcessor,
    optimizer: Option<&'a dyn ImageOptimizer>,
    thumbnail_size: u32,
}

impl<'a> ProtectedRenderer<'a> {
    pub fn new(processor: &'a MarkdownProcessor) -> Self {
        Self {
            processor,
            optimizer: None,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
        }
    }

    pub fn with_optimizer(mut self, optimizer: &'a dyn ImageOptimizer, thumbnail_size: u32) -> Self {
        self.optimizer = Some(optimizer);
        self.thumbnail_size = thumbnail_size;
        self
    }

    /// Render decrypted markdown to HTML. Never fails: any panic in the
    /// pipeline yields the escaped plaintext instead.
    pub fn render(&self, markdown: &str, ctx: RenderContext<'_>) -> String {
        let rendered = catch_unwind(AssertUnwindSafe(|| {
            let html = self.processor.render(markdown, ctx).html;
            match self.optimizer {
                Some(optimizer) => rewrite_attachment_images(&html, optimizer, self.thumbnail_size),
                None => html,
            }
        }));

        match rendered {
            Ok(html) => html,
            Err(_) => {
                tracing::warn!("protected render failed, falling back to plaintext");
                escape_fallback(markdown)
            }
        }
    }

    /// Decrypt and render. Codec errors are returned so callers can tell a wrong
    /// password from broken content.
    pub fn unlock(
        &self,
        payload: &EncryptedPostPayload,
        password: &str,
        ctx: RenderContext<'_>,
    ) -> Result<String, CodecError> {
        let markdown = decrypt(payload, password)?;
        Ok(self.render(&markdown, ctx))
    }
}

/// Decrypt `payload` and render it with default settings
pub fn unlock_and_render(
    payload: &EncryptedPostPayload,
    password: &str,
) -> Result<String, CodecError> {
    let processor = MarkdownProcessor::new();
    ProtectedRenderer::new(&processor).unlock(payload, password, RenderContext::default())
}
