//! Frontmatter parsing from diary files and blog posts.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Invalid YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Metadata block shared by diary files and posts. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Frontmatter {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub draft: bool,

    #[serde(default)]
    pub slug: Option<String>,

    /// Posts carrying a password are published as encrypted payloads
    #[serde(default, deserialize_with = "blank_as_none")]
    pub password: Option<String>,

    #[serde(default, deserialize_with = "blank_as_none")]
    pub password_hint: Option<String>,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

static FRONTMATTER_REGEX: OnceLock<Regex> = OnceLock::new();

fn frontmatter_regex() -> &'static Regex {
    FRONTMATTER_REGEX.get_or_init(|| {
        Regex::new(r"(?s)^---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n|$)(.*)$").expect("valid regex")
    })
}

/// Parse frontmatter from markdown content
///
/// Returns a tuple of (frontmatter, markdown_body).
/// If no frontmatter is present, returns default frontmatter with the full content as body.
///
/// # Example
///
/// ```
/// use almanac_core::frontmatter::parse_frontmatter;
///
/// let content = "---\ntitle: Secret\npassword: hunter2\n---\n# Hello\n";
///
/// let (fm, body) = parse_frontmatter(content).unwrap();
/// assert_eq!(fm.title.as_deref(), Some("Secret"));
/// assert_eq!(fm.password.as_deref(), Some("hunter2"));
/// assert!(body.starts_with("# Hello"));
/// ```
pub fn parse_frontmatter(content: &str) -> Result<(Frontmatter, String), FrontmatterError> {
    let Some(captures) = frontmatter_regex().captures(content) else {
        return Ok((Frontmatter::default(), content.to_string()));
    };

    let yaml = captures.get(1).map_or("", |m| m.as_str());
    let body = captures.get(2).map_or("", |m| m.as_str());

    let frontmatter = if yaml.trim().is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml::from_str(yaml)?
    };

    Ok((frontmatter, body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_frontmatter() {
        let (fm, body) = parse_frontmatter("## 08:00\nMorning").unwrap();
        assert_eq!(fm, Frontmatter::default());
        assert_eq!(body, "## 08:00\nMorning");
    }

    #[test]
    fn test_diary_frontmatter() {
        let content = "---\ntags: [Diary, travel]\ndraft: true\n---\n## 09:00\n";
        let (fm, body) = parse_frontmatter(content).unwrap();
        assert!(fm.draft);
        assert_eq!(fm.tags, vec!["Diary", "travel"]);
        assert_eq!(body, "## 09:00\n");
    }

    #[test]
    fn test_blank_password_is_ignored() {
        let content = "---\ntitle: Open\npassword: \"   \"\npasswordHint: ''\n---\nbody";
        let (fm, _) = parse_frontmatter(content).unwrap();
        assert_eq!(fm.password, None);
        assert_eq!(fm.password_hint, None);
    }

    #[test]
    fn test_invalid_yaml() {
        let content = "---\ntitle: [unclosed\n---\nbody";
        assert!(matches!(
            parse_frontmatter(content),
            Err(FrontmatterError::YamlError(_))
        ));
    }
}
