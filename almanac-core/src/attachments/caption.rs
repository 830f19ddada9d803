//! Caption sanitization for images.
//!
//! Screenshot and paste tools name files `Pasted image 20240101.png`,
//! `image-3.png` or a hash. Those names must never surface as captions.

use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::OnceLock;

fn generated_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)^(?:
                (?:pasted[\s_-]*)?image(?:[\s_-]*\d+)*
                | img[\s_-]*\d+
                | [0-9a-f]{16,}
                | [0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}
            )$",
        )
        .expect("valid regex")
    })
}

/// Return `caption` trimmed, or an empty string when it carries no information.
///
/// A caption is dropped when it is empty, repeats the image's file name (with or
/// without extension, ignoring case), or looks like a capture tool's default name.
pub fn sanitize_caption(caption: &str, resolved_url: &str) -> String {
    let caption = caption.trim();
    if caption.is_empty() || is_generated_name(caption) {
        return String::new();
    }

    let file_name = file_name_of(resolved_url);
    if !file_name.is_empty() {
        let stem = file_name
            .rsplit_once('.')
            .map_or(file_name.as_str(), |(stem, _)| stem);
        let lowered = caption.to_lowercase();
        if lowered == file_name.to_lowercase() || lowered == stem.to_lowercase() {
            return String::new();
        }
    }

    caption.to_string()
}

/// Whether `text` (with or without an extension) looks like an auto-generated file name
pub fn is_generated_name(text: &str) -> bool {
    let text = text.trim();
    let stem = match text.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            stem
        }
        _ => text,
    };
    generated_name_regex().is_match(stem.trim())
}

fn file_name_of(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last = path.rsplit('/').next().unwrap_or(path);
    percent_decode_str(last)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| last.to_string())
}
