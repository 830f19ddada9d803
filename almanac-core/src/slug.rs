//! Slug generation for heading anchors and post ids.

use regex::Regex;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

fn hyphen_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-+").expect("valid regex"))
}

/// Convert a string to a URL-safe slug
///
/// Letters in any script survive (CJK headings keep their text), whitespace and
/// underscores become hyphens, punctuation is dropped.
///
/// # Examples
///
/// ```
/// use almanac_core::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("旅行 笔记"), "旅行-笔记");
/// assert_eq!(slugify("C++ Notes!"), "c-notes");
/// ```
pub fn slugify(input: &str) -> String {
    let cleaned = input
        .to_lowercase()
        .graphemes(true)
        .filter_map(|g| {
            let c = g.chars().next()?;
            if c.is_whitespace() || c == '_' || c == '-' {
                Some("-")
            } else if c.is_alphanumeric() {
                Some(g)
            } else {
                None
            }
        })
        .collect::<String>();

    hyphen_run_regex()
        .replace_all(&cleaned, "-")
        .trim_matches('-')
        .to_string()
}
