//! Card blocks: fenced code blocks used as a tiny `key: value` data language.
//!
//! ````markdown
//! ```card-link
//! title: "Rust Blog"
//! url: https://blog.rust-lang.org
//! ```
//! ````

use almanac_types::{CardValue, LinkCard, MediaCardData};
use pulldown_cmark::{CodeBlockKind, Event, Tag, TagEnd};
use regex::Regex;
use std::sync::OnceLock;

pub const LINK_CARD_INFO: &str = "card-link";

fn numeric_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid regex"))
}

/// First word of a fenced block's info string
pub fn info_tag(info: &str) -> &str {
    info.split_whitespace().next().unwrap_or("")
}

fn strip_quotes(raw: &str) -> &str {
    let trimmed = raw.trim();
    let quoted = trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')));
    if quoted {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

/// Parse a `card-link` body. Keys are case-insensitive, values may be quoted.
///
/// Returns `None` unless both `title` and `url` are present.
pub fn parse_link_card(body: &str) -> Option<LinkCard> {
    let mut title = None;
    let mut url = None;
    let mut description = None;
    let mut image = None;

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(idx) = line.find(':').filter(|idx| *idx > 0) else {
            continue;
        };
        let key = line[..idx].trim().to_lowercase();
        let value = strip_quotes(&line[idx + 1..]);
        if value.is_empty() {
            continue;
        }
        let slot = match key.as_str() {
            "title" => &mut title,
            "url" => &mut url,
            "description" => &mut description,
            "image" => &mut image,
            _ => continue,
        };
        *slot = Some(value.to_string());
    }

    Some(LinkCard {
        title: title?,
        url: url?,
        description,
        image,
    })
}

/// Parse a media card body into a flat record, turning pure numbers into numbers.
///
/// Returns `None` when there is no textual `title`.
pub fn parse_media_card(body: &str) -> Option<MediaCardData> {
    let mut data = MediaCardData::default();

    for line in body.trim().lines().filter(|l| !l.trim().is_empty()) {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }

        let value = match value.parse::<f64>() {
            Ok(number) if numeric_regex().is_match(value) => CardValue::Number(number),
            _ => CardValue::Text(value.to_string()),
        };
        data.fields.insert(key.to_string(), value);
    }

    data.title()?;
    Some(data)
}

/// Map every fenced code block through `rewrite`.
///
/// `rewrite` receives the info string and the block body; returning `Some` swaps the
/// whole block for the given events, `None` keeps the block untouched. Everything
/// else passes through in order.
pub(crate) fn map_fenced_blocks<'a, F>(events: Vec<Event<'a>>, mut rewrite: F) -> Vec<Event<'a>>
where
    F: FnMut(&str, &str) -> Option<Vec<Event<'a>>>,
{
    let mut out = Vec::with_capacity(events.len());
    let mut iter = events.into_iter();

    while let Some(event) = iter.next() {
        let info = match &event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => info.to_string(),
            _ => {
                out.push(event);
                continue;
            }
        };

        let mut block = vec![event];
        let mut body = String::new();
        for inner in iter.by_ref() {
            let is_end = matches!(inner, Event::End(TagEnd::CodeBlock));
            if let Event::Text(text) = &inner {
                body.push_str(text);
            }
            block.push(inner);
            if is_end {
                break;
            }
        }

        match rewrite(&info, &body) {
            Some(replacement) => out.extend(replacement),
            None => out.extend(block),
        }
    }

    out
}
