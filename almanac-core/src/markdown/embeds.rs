//! Wiki-style image embeds (`![[photo.png|caption|640x480]]`) and image path rewriting.

use crate::attachments::{sanitize_caption, AttachmentResolver};
use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

pub(crate) fn embed_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[\[([^\]]+)\]\]").expect("valid regex"))
}

fn image_ext_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\.(avif|bmp|gif|ico|jpe?g|png|svg|tiff?|webp)$").expect("valid regex")
    })
}

fn dimension_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\d+(?:x\d+)?$").expect("valid regex"))
}

/// A parsed `![[...]]` embed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub target: String,
    pub alt: String,
}

/// Parse the inside of an embed. Returns `None` for non-image targets.
///
/// Segments after the first `|` are captions, except pure dimension tokens
/// such as `300` or `640x480`, which are ignored. A `#fragment` on the target is
/// dropped. Without a caption the file stem is used.
pub fn parse_embed(inner: &str) -> Option<Embed> {
    let mut segments = inner.split('|').map(str::trim);
    let target_part = segments.next()?;
    let target = target_part
        .split('#')
        .next()
        .unwrap_or(target_part)
        .trim()
        .to_string();
    if target.is_empty() || !image_ext_regex().is_match(&target) {
        return None;
    }

    let caption = segments
        .filter(|segment| {
            let compact: String = segment.chars().filter(|c| !c.is_whitespace()).collect();
            !segment.is_empty() && !dimension_regex().is_match(&compact)
        })
        .collect::<Vec<_>>()
        .join(" ");

    let alt = if caption.is_empty() {
        let file_name = target.rsplit('/').next().unwrap_or(&target);
        file_name
            .rsplit_once('.')
            .map_or(file_name, |(stem, _)| stem)
            .to_string()
    } else {
        caption
    };

    Some(Embed { target, alt })
}

/// Expands embeds into images and rewrites every image URL through the resolver
pub struct EmbedTransformer<'r> {
    resolver: Option<AttachmentResolver<'r>>,
    document: Option<&'r Path>,
}

impl<'r> EmbedTransformer<'r> {
    pub fn new(resolver: Option<AttachmentResolver<'r>>, document: Option<&'r Path>) -> Self {
        Self { resolver, document }
    }

    pub fn transform<'a>(&self, events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        let mut result = Vec::with_capacity(events.len());
        let mut iter = events.into_iter().peekable();
        let mut in_code_block = false;

        while let Some(event) = iter.next() {
            match event {
                Event::Start(Tag::CodeBlock(_)) => {
                    in_code_block = true;
                    result.push(event);
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    result.push(event);
                }
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => {
                    // Alt text arrives as the image's child events.
                    let mut alt = String::new();
                    for inner in iter.by_ref() {
                        match inner {
                            Event::End(TagEnd::Image) => break,
                            Event::Text(text) | Event::Code(text) => alt.push_str(&text),
                            _ => {}
                        }
                    }
                    result.extend(self.image(link_type, &dest_url, &alt, &title, id));
                }
                Event::Text(text) if !in_code_block => {
                    // Embeds may be split across several text events
                    let mut merged = text.into_string();
                    while let Some(Event::Text(next)) = iter.peek() {
                        merged.push_str(next);
                        iter.next();
                    }

                    if merged.contains("![[") {
                        result.extend(self.expand(&merged));
                    } else {
                        result.push(Event::Text(CowStr::Boxed(merged.into_boxed_str())));
                    }
                }
                other => result.push(other),
            }
        }

        result
    }

    fn resolve(&self, target: &str) -> String {
        match self.resolver {
            Some(resolver) => resolver.resolve(target, self.document),
            None => target.to_string(),
        }
    }

    fn image<'a>(
        &self,
        link_type: LinkType,
        target: &str,
        alt: &str,
        title: &str,
        id: CowStr<'a>,
    ) -> Vec<Event<'a>> {
        let url = self.resolve(target);
        let alt = sanitize_caption(alt, &url);
        let title = sanitize_caption(title, &url);

        let mut events = vec![Event::Start(Tag::Image {
            link_type,
            dest_url: CowStr::Boxed(url.into_boxed_str()),
            title: CowStr::Boxed(title.into_boxed_str()),
            id,
        })];
        if !alt.is_empty() {
            events.push(Event::Text(CowStr::Boxed(alt.into_boxed_str())));
        }
        events.push(Event::End(TagEnd::Image));
        events
    }

    fn expand<'a>(&self, text: &str) -> Vec<Event<'a>> {
        let mut events = Vec::new();
        let mut pending = String::new();
        let mut last_end = 0;

        for caps in embed_regex().captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            pending.push_str(&text[last_end..whole.start()]);
            last_end = whole.end();

            match parse_embed(&caps[1]) {
                Some(embed) => {
                    if !pending.is_empty() {
                        let before = std::mem::take(&mut pending);
                        events.push(Event::Text(CowStr::Boxed(before.into_boxed_str())));
                    }
                    events.extend(self.image(
                        LinkType::Inline,
                        &embed.target,
                        &embed.alt,
                        "",
                        CowStr::Borrowed(""),
                    ));
                }
                // Not an image: keep the literal text
                None => pending.push_str(whole.as_str()),
            }
        }

        pending.push_str(&text[last_end..]);
        if !pending.is_empty() {
            events.push(Event::Text(CowStr::Boxed(pending.into_boxed_str())));
        }
        events
    }
}
