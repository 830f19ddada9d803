//! Media cards: `card-movie`, `card-tv`, `card-book` and `card-music` blocks.
//!
//! A card renders as two paragraphs, a linked title and a details line:
//!
//! ```text
//! 电影：《Interstellar》
//! 2014-11-07 · 美国 · 评分 8.9 ｜ A team of explorers... ｜ Sci-Fi / Drama
//! ```

use super::cards::{map_fenced_blocks, parse_media_card};
use super::html_escape;
use almanac_types::{MediaCardData, MediaKind};
use pulldown_cmark::{CowStr, Event, Tag, TagEnd};

/// Replaces media card blocks with their rendered title and details
pub struct MediaCardTransformer;

impl MediaCardTransformer {
    pub fn new() -> Self {
        Self
    }

    pub fn transform<'a>(&self, events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        map_fenced_blocks(events, |info, body| {
            let kind = MediaKind::from_info(info)?;
            let data = parse_media_card(body)?;
            Some(card_events(kind, &data))
        })
    }
}

impl Default for MediaCardTransformer {
    fn default() -> Self {
        Self::new()
    }
}

/// Public URL for a card
///
/// Music cards may carry their own `url`; any card may override with
/// `external_url`. Otherwise the URL is derived from `id` and `source`.
pub fn card_url(kind: MediaKind, data: &MediaCardData) -> String {
    if kind == MediaKind::Music {
        if let Some(url) = data.text("url") {
            return url;
        }
    }
    if let Some(url) = data.text("external_url") {
        return url;
    }
    let Some(id) = data.text("id") else {
        return "#".to_string();
    };

    let douban = data.text("source").as_deref() == Some("douban");
    match kind {
        MediaKind::Tv if douban => format!("https://movie.douban.com/subject/{id}"),
        MediaKind::Tv => format!("https://www.themoviedb.org/tv/{id}"),
        MediaKind::Book => format!("https://book.douban.com/subject/{id}"),
        _ if douban => format!("https://movie.douban.com/subject/{id}"),
        _ => format!("https://www.themoviedb.org/movie/{id}"),
    }
}

/// Details line: meta, overview and genres joined by ` ｜ `
pub fn card_details(kind: MediaKind, data: &MediaCardData) -> String {
    let mut meta = Vec::new();
    if let Some(date) = data.text("release_date") {
        meta.push(date);
    }
    match kind {
        MediaKind::Book => meta.extend(data.text("author")),
        MediaKind::Movie | MediaKind::Tv => meta.extend(data.text("region")),
        MediaKind::Music => {}
    }
    if let Some(rating) = data.get("rating").and_then(|v| v.as_number()) {
        meta.push(format!("评分 {rating:.1}"));
    }

    let genres = data
        .text("genres")
        .map(|raw| {
            raw.split([',', '，'])
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .collect::<Vec<_>>()
                .join(" / ")
        })
        .unwrap_or_default();

    [meta.join(" · "), data.text("overview").unwrap_or_default(), genres]
        .into_iter()
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(" ｜ ")
}

fn card_events<'a>(kind: MediaKind, data: &MediaCardData) -> Vec<Event<'a>> {
    let title = data.title().unwrap_or_default();
    let label = format!("{}：《{}》", kind.label(), title);
    let url = card_url(kind, data);
    let anchor = format!(
        r#"<a href="{}" title="{}" target="_blank" rel="noopener noreferrer">"#,
        html_escape(&url),
        html_escape(&label)
    );

    let mut events = vec![
        Event::Start(Tag::Paragraph),
        Event::InlineHtml(CowStr::Boxed(anchor.into_boxed_str())),
        Event::Text(CowStr::Boxed(label.into_boxed_str())),
        Event::InlineHtml(CowStr::Borrowed("</a>")),
        Event::End(TagEnd::Paragraph),
    ];

    let details = card_details(kind, data);
    if !details.is_empty() {
        events.push(Event::Start(Tag::Paragraph));
        events.push(Event::Text(CowStr::Boxed(details.into_boxed_str())));
        events.push(Event::End(TagEnd::Paragraph));
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::cards::parse_media_card;
    use pulldown_cmark::{html, Parser};

    fn render(markdown: &str) -> String {
        let events: Vec<Event> = Parser::new(markdown).collect();
        let events = MediaCardTransformer::new().transform(events);
        let mut out = String::new();
        html::push_html(&mut out, events.into_iter());
        out
    }

    #[test]
    fn test_movie_card() {
        let html = render(
            "```card-movie\ntitle: Interstellar\nid: 157336\nrating: 8.9\ngenres: Sci-Fi, Drama\n```\n",
        );
        assert!(html.contains(r#"href="https://www.themoviedb.org/movie/157336""#));
        assert!(html.contains(r#"title="电影：《Interstellar》""#));
        assert!(html.contains(">电影：《Interstellar》</a>"));
        assert!(html.contains("评分 8.9"));
        assert!(html.contains("Sci-Fi / Drama"));
        assert!(!html.contains("<pre>"));
    }

    #[test]
    fn test_card_without_title_passes_through() {
        let html = render("```card-book\nauthor: Nobody\n```\n");
        assert!(html.contains("<pre><code class=\"language-card-book\">"));
    }

    #[test]
    fn test_info_with_extra_words_stays_code() {
        let html = render("```card-movie wide\ntitle: Interstellar\n```\n");
        assert!(html.contains("<pre><code"));
        assert!(!html.contains("电影：《Interstellar》"));
    }

    #[test]
    fn test_urls() {
        let tv = parse_media_card("title: X\nid: 42\nsource: douban").unwrap();
        assert_eq!(
            card_url(MediaKind::Tv, &tv),
            "https://movie.douban.com/subject/42"
        );
        assert_eq!(
            card_url(MediaKind::Movie, &tv),
            "https://movie.douban.com/subject/42"
        );
        let book = parse_media_card("title: X\nid: 7").unwrap();
        assert_eq!(
            card_url(MediaKind::Book, &book),
            "https://book.douban.com/subject/7"
        );
        let song = parse_media_card("title: X\nurl: https://music.test/1\nid: 3").unwrap();
        assert_eq!(card_url(MediaKind::Music, &song), "https://music.test/1");
        let bare = parse_media_card("title: X").unwrap();
        assert_eq!(card_url(MediaKind::Movie, &bare), "#");
        let external = parse_media_card("title: X\nid: 1\nexternal_url: https://e.test").unwrap();
        assert_eq!(card_url(MediaKind::Tv, &external), "https://e.test");
    }

    #[test]
    fn test_details_segments() {
        let book = parse_media_card(
            "title: Dune\nauthor: Frank Herbert\nrelease_date: 1965\noverview: Spice.\ngenres: 科幻，经典",
        )
        .unwrap();
        assert_eq!(
            card_details(MediaKind::Book, &book),
            "1965 · Frank Herbert ｜ Spice. ｜ 科幻 / 经典"
        );

        let zero = parse_media_card("title: Quiet\nrating: 0").unwrap();
        assert_eq!(card_details(MediaKind::Music, &zero), "");
    }
}
