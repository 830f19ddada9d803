//! Shared types for almanac
//!
//! These are the shapes that cross crate and process boundaries: diary entries as
//! served by the pagination API, the structured card records parsed out of fenced
//! blocks, and the envelope used for password-protected posts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Date used when an identifier carries no valid calendar date.
pub const SENTINEL_DATE: &str = "1970-01-01";

/// Text placeholder marking where an image group sits inside a time block's text.
pub const IMAGE_GROUP_PLACEHOLDER_PREFIX: &str = "++DIARY_IMAGE_GROUP_";

/// Build the placeholder for image group `index`.
pub fn image_group_placeholder(index: usize) -> String {
    format!("{IMAGE_GROUP_PLACEHOLDER_PREFIX}{index}++")
}

/// Normalized view of a diary entry identifier (usually its file name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryIdentifierMeta {
    pub raw_id: String,
    pub start_date: String,
    pub end_date: String,
    pub is_range: bool,
    pub quarter_key: String,
    pub sort_key: String,
}

/// One image shown in a time block gallery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineImage {
    pub alt: String,
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Kind of media a structured card describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
    Book,
    Music,
}

impl MediaKind {
    /// Parse a fenced block info string. Only the exact `card-<kind>` tags match.
    pub fn from_info(info: &str) -> Option<Self> {
        match info.trim().strip_prefix("card-")? {
            "movie" => Some(MediaKind::Movie),
            "tv" => Some(MediaKind::Tv),
            "book" => Some(MediaKind::Book),
            "music" => Some(MediaKind::Music),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
            MediaKind::Book => "book",
            MediaKind::Music => "music",
        }
    }

    /// Display label used in rendered card titles
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Movie => "电影",
            MediaKind::Tv => "剧集",
            MediaKind::Book => "书籍",
            MediaKind::Music => "音乐",
        }
    }
}

/// A value parsed from a `key: value` card line. Pure numbers are kept as numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CardValue {
    Number(f64),
    Text(String),
}

impl CardValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CardValue::Number(n) => Some(*n),
            CardValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// JavaScript-style truthiness: zero and empty strings count as absent.
    pub fn is_truthy(&self) -> bool {
        match self {
            CardValue::Number(n) => *n != 0.0 && !n.is_nan(),
            CardValue::Text(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for CardValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardValue::Number(n) => write!(f, "{n}"),
            CardValue::Text(s) => f.write_str(s),
        }
    }
}

/// Flat record parsed from a `card-movie` / `card-tv` / `card-book` / `card-music` block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaCardData {
    pub fields: BTreeMap<String, CardValue>,
}

impl MediaCardData {
    pub fn get(&self, key: &str) -> Option<&CardValue> {
        self.fields.get(key).filter(|v| v.is_truthy())
    }

    /// Field rendered as text, skipping absent or falsy values
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }

    pub fn title(&self) -> Option<&str> {
        match self.fields.get("title") {
            Some(CardValue::Text(title)) if !title.is_empty() => Some(title),
            _ => None,
        }
    }
}

/// Link preview parsed from a `card-link` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCard {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

/// One timestamped unit inside a diary entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlock {
    pub time: String,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub show_time: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_groups: Vec<Vec<TimelineImage>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie_data: Option<MediaCardData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tv_data: Option<MediaCardData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_data: Option<MediaCardData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_data: Option<MediaCardData>,
}

impl TimeBlock {
    pub fn new(time: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            show_time: true,
            text: None,
            image_groups: Vec::new(),
            html_content: None,
            movie_data: None,
            tv_data: None,
            book_data: None,
            music_data: None,
        }
    }

    /// The attached media reference, if any
    pub fn media(&self) -> Option<(MediaKind, &MediaCardData)> {
        [
            (MediaKind::Movie, &self.movie_data),
            (MediaKind::Tv, &self.tv_data),
            (MediaKind::Book, &self.book_data),
            (MediaKind::Music, &self.music_data),
        ]
        .into_iter()
        .find_map(|(kind, data)| data.as_ref().map(|d| (kind, d)))
    }

    /// Attach a media reference, replacing whichever one was set before.
    pub fn set_media(&mut self, kind: MediaKind, data: MediaCardData) {
        self.movie_data = None;
        self.tv_data = None;
        self.book_data = None;
        self.music_data = None;
        let slot = match kind {
            MediaKind::Movie => &mut self.movie_data,
            MediaKind::Tv => &mut self.tv_data,
            MediaKind::Book => &mut self.book_data,
            MediaKind::Music => &mut self.music_data,
        };
        *slot = Some(data);
    }
}

/// One calendar day or date range with its time blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedEntry {
    #[serde(flatten)]
    pub meta: DiaryIdentifierMeta,
    pub time_blocks: Vec<TimeBlock>,
}

impl ParsedEntry {
    /// Stable id used for anchors: `start_to_end` for ranges, the date otherwise.
    pub fn entry_id(&self) -> String {
        if self.meta.is_range {
            format!("{}_to_{}", self.meta.start_date, self.meta.end_date)
        } else {
            self.meta.start_date.clone()
        }
    }

    /// Key under which entries describing the same span are merged
    pub fn span_key(&self) -> (&str, &str) {
        (&self.meta.start_date, &self.meta.end_date)
    }
}

/// Server-computed pagination state for one page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub current_page: u32,
    pub total_pages: u32,
    pub has_more: bool,
    pub items_per_page: u32,
}

impl Default for PaginationInfo {
    fn default() -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            has_more: false,
            items_per_page: 5,
        }
    }
}

/// Body of `GET /api/diary/{page}.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryPage {
    pub entries: Vec<ParsedEntry>,
    pub pagination: PaginationInfo,
}

pub const PAYLOAD_VERSION: u8 = 1;
pub const PAYLOAD_ALG: &str = "AES-256-GCM";
pub const PAYLOAD_DIGEST: &str = "SHA-256";

/// Versioned envelope for a password-protected post body. Binary fields are base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPostPayload {
    pub v: u8,
    pub alg: String,
    pub digest: String,
    pub iterations: u32,
    pub salt: String,
    pub iv: String,
    pub data: String,
}

/// What the build writes for each protected post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectedPostEnvelope {
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hint: Option<String>,
    pub payload: EncryptedPostPayload,
}
