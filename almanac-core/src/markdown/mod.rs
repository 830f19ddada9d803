//! Markdown processing pipeline with custom extensions.

pub mod cards;
pub mod embeds;
pub mod link_cards;
pub mod media_cards;

#[cfg(test)]
mod test_integration;

use crate::attachments::AttachmentResolver;
use crate::slug::slugify;
use almanac_types::LinkCard;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;
use std::path::Path;

pub use embeds::EmbedTransformer;
pub use link_cards::LinkCardTransformer;
pub use media_cards::MediaCardTransformer;

/// Heading used when no TOC marker is configured
pub const DEFAULT_TOC_HEADING: &str = "目录";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocItem {
    pub level: u32,
    pub title: String,
    pub id: String,
}

/// Where a document lives, for attachment resolution
#[derive(Clone, Copy, Default)]
pub struct RenderContext<'r> {
    pub resolver: Option<AttachmentResolver<'r>>,
    pub document: Option<&'r Path>,
}

impl<'r> RenderContext<'r> {
    pub fn new(resolver: AttachmentResolver<'r>, document: Option<&'r Path>) -> Self {
        Self {
            resolver: Some(resolver),
            document,
        }
    }
}

/// Output of a single render
#[derive(Debug, Clone, Default)]
pub struct RenderedDocument {
    pub html: String,
    pub link_cards: Vec<LinkCard>,
    pub headings: Vec<TocItem>,
}

/// Markdown processor with custom extensions
pub struct MarkdownProcessor {
    options: Options,
    toc_heading: String,
}

impl MarkdownProcessor {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self {
            options,
            toc_heading: DEFAULT_TOC_HEADING.to_string(),
        }
    }

    /// A heading whose text equals `heading` gets a table of contents of the
    /// headings that follow it.
    pub fn with_toc_heading(mut self, heading: impl Into<String>) -> Self {
        self.toc_heading = heading.into();
        self
    }

    /// Convert markdown to HTML with all custom transforms
    pub fn render(&self, markdown: &str, ctx: RenderContext<'_>) -> RenderedDocument {
        let events: Vec<Event> = Parser::new_ext(markdown, self.options).collect();

        // Embeds first so captions and paths are settled before anything else looks at images
        let embed_transformer = EmbedTransformer::new(ctx.resolver, ctx.document);
        let events = embed_transformer.transform(events);

        let (events, link_cards) = LinkCardTransformer::new().transform(events);
        let events = MediaCardTransformer::new().transform(events);

        let headings = collect_headings(&events);
        let events = attach_heading_ids(events, &headings);
        let events = insert_toc(events, &headings, &self.toc_heading);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        RenderedDocument {
            html: html_output,
            link_cards,
            headings,
        }
    }

    /// Convert markdown to HTML without attachment resolution
    pub fn render_simple(&self, markdown: &str) -> String {
        self.render(markdown, RenderContext::default()).html
    }
}

impl Default for MarkdownProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_headings(events: &[Event]) -> Vec<TocItem> {
    let mut toc = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut current: Option<(u32, Option<String>, String)> = None;

    for event in events {
        match event {
            Event::Start(Tag::Heading { level, id, .. }) => {
                current = Some((*level as u32, id.as_ref().map(|s| s.to_string()), String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, _, ref mut title)) = current {
                    title.push_str(text.as_ref());
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, explicit, title)) = current.take() {
                    let id = explicit.unwrap_or_else(|| unique_id(&mut seen, slugify(&title)));
                    toc.push(TocItem { level, title, id });
                }
            }
            _ => {}
        }
    }

    toc
}

/// `base`, `base-1`, `base-2`, ... in order of appearance
fn unique_id(seen: &mut HashMap<String, usize>, base: String) -> String {
    let count = seen.entry(base.clone()).or_insert(0);
    let id = if *count == 0 {
        base
    } else {
        format!("{base}-{count}")
    };
    *count += 1;
    id
}

fn attach_heading_ids<'a>(events: Vec<Event<'a>>, headings: &[TocItem]) -> Vec<Event<'a>> {
    let mut heading_iter = headings.iter();
    let mut result = Vec::with_capacity(events.len());

    for event in events {
        match event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                let next = heading_iter.next();
                let id = match (id, next) {
                    (None, Some(next)) if !next.id.is_empty() => {
                        Some(CowStr::Boxed(next.id.clone().into_boxed_str()))
                    }
                    (id, _) => id,
                };
                result.push(Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                }));
            }
            other => result.push(other),
        }
    }

    result
}

/// Place a TOC right after the marker heading, listing every heading below it.
fn insert_toc<'a>(events: Vec<Event<'a>>, headings: &[TocItem], marker: &str) -> Vec<Event<'a>> {
    let marker = marker.trim();
    let Some(position) = headings
        .iter()
        .position(|h| !marker.is_empty() && h.title.trim() == marker)
    else {
        return events;
    };
    let entries = &headings[position + 1..];
    if entries.is_empty() {
        return events;
    }

    let mut seen = 0;
    let mut result = Vec::with_capacity(events.len() + 1);
    for event in events {
        let closes_heading = matches!(event, Event::End(TagEnd::Heading(_)));
        result.push(event);
        if closes_heading {
            if seen == position {
                result.push(Event::Html(CowStr::Boxed(render_toc(entries).into_boxed_str())));
            }
            seen += 1;
        }
    }
    result
}

pub fn render_toc(headings: &[TocItem]) -> String {
    let mut html = String::from(r#"<nav class="article-toc-nav"><ul class="toc-list">"#);
    for h in headings {
        html.push_str(&format!(
            r##"<li class="toc-level-{}"><a href="#{}">{}</a></li>"##,
            h.level,
            html_escape(&h.id),
            html_escape(&h.title)
        ));
    }
    html.push_str("</ul></nav>\n");
    html
}

pub(crate) fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
