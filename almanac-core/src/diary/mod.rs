//! Diary entry assembly.
//!
//! A diary file is named after its date (or date range) and its body is split into
//! time blocks on `## HH:MM` headings:
//!
//! ```markdown
//! Woke up late.
//!
//! ## 09:30
//! ![[coffee.jpg]]
//! ![[street.jpg|Morning street]]
//!
//! Walked to the station.
//! ```
//!
//! Content before the first time heading becomes an untimed block. Runs of
//! image-only lines become image groups, and the first media card in a block is
//! lifted out as the block's structured media reference.

mod archive;

pub use archive::{DiaryArchive, QuarterGroup};

use crate::attachments::{sanitize_caption, AttachmentResolver};
use crate::identifier::parse_identifier;
use crate::markdown::cards::parse_media_card;
use crate::markdown::embeds::{embed_regex, parse_embed};
use crate::markdown::{MarkdownProcessor, RenderContext};
use crate::protected::{ImageOptimizer, DEFAULT_THUMBNAIL_SIZE};
use almanac_types::{
    image_group_placeholder, MediaCardData, MediaKind, ParsedEntry, TimeBlock, TimelineImage,
};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Time used for content written before the first time heading
pub const UNTIMED_BLOCK_TIME: &str = "00:00";

fn time_heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^#{2,3}[ \t]+(\d{1,2}):(\d{2})[ \t]*#*[ \t]*$").expect("valid regex")
    })
}

fn markdown_image_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"!\[([^\]]*)\]\(\s*<?([^)\s>]+)>?(?:\s+"([^"]*)")?\s*\)"#)
            .expect("valid regex")
    })
}

/// Builds [`ParsedEntry`] values from diary files
pub struct DiaryParser<'a> {
    processor: &'a MarkdownProcessor,
    resolver: Option<AttachmentResolver<'a>>,
    optimizer: Option<&'a dyn ImageOptimizer>,
    thumbnail_size: u32,
}

impl<'a> DiaryParser<'a> {
    pub fn new(processor: &'a MarkdownProcessor) -> Self {
        Self {
            processor,
            resolver: None,
            optimizer: None,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
        }
    }

    pub fn with_resolver(mut self, resolver: AttachmentResolver<'a>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_optimizer(mut self, optimizer: &'a dyn ImageOptimizer, thumbnail_size: u32) -> Self {
        self.optimizer = Some(optimizer);
        self.thumbnail_size = thumbnail_size;
        self
    }

    /// Parse one diary file. `body` is the markdown without frontmatter.
    pub fn parse(&self, raw_id: &str, body: &str, document: Option<&Path>) -> ParsedEntry {
        let meta = parse_identifier(raw_id);
        let time_blocks = split_time_blocks(body)
            .into_iter()
            .filter_map(|section| self.build_block(section, document))
            .collect();

        ParsedEntry { meta, time_blocks }
    }

    fn build_block(&self, section: Section<'_>, document: Option<&Path>) -> Option<TimeBlock> {
        let Section { time, mut lines } = section;
        let timed = time.is_some();
        let mut block = TimeBlock::new(time.unwrap_or_else(|| UNTIMED_BLOCK_TIME.to_string()));
        block.show_time = timed;

        if let Some((kind, data)) = extract_media_card(&mut lines) {
            block.set_media(kind, data);
        }

        let mut text_lines: Vec<String> = Vec::with_capacity(lines.len());
        let mut in_fence = false;
        let mut group: Vec<TimelineImage> = Vec::new();

        for line in &lines {
            if is_fence(line) {
                in_fence = !in_fence;
            }
            let images = if in_fence || is_fence(line) {
                None
            } else {
                image_only_line(line)
            };

            match images {
                Some(found) => {
                    group.extend(found.into_iter().map(|raw| self.timeline_image(raw, document)))
                }
                None => {
                    self.flush_group(&mut group, &mut block, &mut text_lines);
                    text_lines.push(line.to_string());
                }
            }
        }
        self.flush_group(&mut group, &mut block, &mut text_lines);

        let text = text_lines.join("\n").trim().to_string();
        let has_text = !text.is_empty();
        if !has_text && block.media().is_none() && !timed {
            return None;
        }

        if has_text {
            let ctx = RenderContext {
                resolver: self.resolver,
                document,
            };
            block.html_content = Some(self.processor.render(&text, ctx).html);
            block.text = Some(text);
        }
        Some(block)
    }

    fn flush_group(
        &self,
        group: &mut Vec<TimelineImage>,
        block: &mut TimeBlock,
        text_lines: &mut Vec<String>,
    ) {
        if group.is_empty() {
            return;
        }
        text_lines.push(image_group_placeholder(block.image_groups.len()));
        block.image_groups.push(std::mem::take(group));
    }

    fn timeline_image(&self, raw: RawImage, document: Option<&Path>) -> TimelineImage {
        let src = match self.resolver {
            Some(resolver) => resolver.resolve(&raw.target, document),
            None => raw.target,
        };
        let alt = sanitize_caption(&raw.alt, &src);
        let title = raw
            .title
            .map(|t| sanitize_caption(&t, &src))
            .filter(|t| !t.is_empty());

        let mut image = TimelineImage {
            alt,
            src,
            title,
            original: None,
            width: None,
            height: None,
        };

        if let Some(optimizer) = self.optimizer {
            match optimizer.optimize(&image.src, self.thumbnail_size) {
                Ok(optimized) => {
                    if optimized.thumbnail != image.src {
                        image.original = Some(std::mem::replace(&mut image.src, optimized.thumbnail));
                    }
                    image.width = Some(optimized.width);
                    image.height = Some(optimized.height);
                }
                Err(e) => tracing::debug!("no thumbnail for {}: {}", image.src, e),
            }
        }
        image
    }
}

/// Parse a diary file without attachment resolution or image optimization
///
/// # Example
///
/// ```
/// use almanac_core::parse_diary_entry;
///
/// let entry = parse_diary_entry("2024-03-02", "Rain.\n\n## 08:15\nCoffee.\n");
/// assert_eq!(entry.meta.quarter_key, "2024-Q1");
/// assert_eq!(entry.time_blocks.len(), 2);
/// assert!(!entry.time_blocks[0].show_time);
/// assert_eq!(entry.time_blocks[1].time, "08:15");
/// ```
pub fn parse_diary_entry(raw_id: &str, body: &str) -> ParsedEntry {
    let processor = MarkdownProcessor::new();
    DiaryParser::new(&processor).parse(raw_id, body, None)
}

struct Section<'b> {
    time: Option<String>,
    lines: Vec<&'b str>,
}

/// Normalized `HH:MM` for a time heading line
fn time_heading(line: &str) -> Option<String> {
    let caps = time_heading_regex().captures(line.trim_end())?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    (hour < 24 && minute < 60).then(|| format!("{hour:02}:{minute:02}"))
}

fn split_time_blocks(body: &str) -> Vec<Section<'_>> {
    let mut sections = vec![Section {
        time: None,
        lines: Vec::new(),
    }];
    let mut in_fence = false;

    for line in body.lines() {
        if is_fence(line) {
            in_fence = !in_fence;
        }
        match (!in_fence).then(|| time_heading(line)).flatten() {
            Some(time) => sections.push(Section {
                time: Some(time),
                lines: Vec::new(),
            }),
            None => {
                if let Some(section) = sections.last_mut() {
                    section.lines.push(line);
                }
            }
        }
    }

    sections
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// Remove the first well-formed media card fence from `lines`
fn extract_media_card(lines: &mut Vec<&str>) -> Option<(MediaKind, MediaCardData)> {
    let mut start = 0;
    while start < lines.len() {
        let open = lines[start].trim();
        if !is_fence(open) {
            start += 1;
            continue;
        }

        let fence = &open[..3];
        let end = (start + 1..lines.len()).find(|&i| lines[i].trim().starts_with(fence));
        let Some(end) = end else {
            return None;
        };

        let info = open.trim_start_matches(['`', '~']).trim();
        if let Some(kind) = MediaKind::from_info(info) {
            let body = lines[start + 1..end].join("\n");
            if let Some(data) = parse_media_card(&body) {
                lines.drain(start..=end);
                return Some((kind, data));
            }
        }
        start = end + 1;
    }
    None
}

struct RawImage {
    target: String,
    alt: String,
    title: Option<String>,
}

/// Images on `line` when the line holds nothing but images
fn image_only_line(line: &str) -> Option<Vec<RawImage>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut found: Vec<(usize, RawImage)> = Vec::new();

    for caps in embed_regex().captures_iter(trimmed) {
        let embed = parse_embed(&caps[1])?;
        let start = caps.get(0).map_or(0, |m| m.start());
        found.push((
            start,
            RawImage {
                target: embed.target,
                alt: embed.alt,
                title: None,
            },
        ));
    }

    for caps in markdown_image_regex().captures_iter(trimmed) {
        let start = caps.get(0).map_or(0, |m| m.start());
        found.push((
            start,
            RawImage {
                target: caps[2].to_string(),
                alt: caps[1].to_string(),
                title: caps.get(3).map(|m| m.as_str().to_string()),
            },
        ));
    }
    let rest = embed_regex().replace_all(trimmed, "");
    let rest = markdown_image_regex().replace_all(&rest, "");

    if found.is_empty() || !rest.trim().is_empty() {
        return None;
    }
    found.sort_by_key(|(start, _)| *start);
    Some(found.into_iter().map(|(_, image)| image).collect())
}
