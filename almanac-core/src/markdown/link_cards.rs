//! `card-link` blocks rendered as link previews.

use super::cards::{info_tag, map_fenced_blocks, parse_link_card, LINK_CARD_INFO};
use super::html_escape;
use almanac_types::LinkCard;
use pulldown_cmark::{CowStr, Event};

/// Replaces well-formed `card-link` blocks with a preview anchor
pub struct LinkCardTransformer;

impl LinkCardTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Transform events, swapping each valid card block for its rendered card.
    ///
    /// Returns (transformed_events, cards) with cards in document order. Blocks
    /// missing a title or url are left as ordinary code blocks.
    pub fn transform<'a>(&self, events: Vec<Event<'a>>) -> (Vec<Event<'a>>, Vec<LinkCard>) {
        let mut cards = Vec::new();

        let events = map_fenced_blocks(events, |info, body| {
            if info_tag(info) != LINK_CARD_INFO {
                return None;
            }
            let Some(card) = parse_link_card(body) else {
                tracing::debug!("card-link block without title/url left as code");
                return None;
            };
            let html = render_link_card(&card);
            cards.push(card);
            Some(vec![Event::Html(CowStr::Boxed(html.into_boxed_str()))])
        });

        (events, cards)
    }
}

impl Default for LinkCardTransformer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render_link_card(card: &LinkCard) -> String {
    let mut html = format!(
        r#"<a class="link-card" href="{}" target="_blank" rel="noopener noreferrer">"#,
        html_escape(&card.url)
    );
    if let Some(image) = &card.image {
        html.push_str(&format!(
            r#"<img class="link-card-image" src="{}" alt="" loading="lazy">"#,
            html_escape(image)
        ));
    }
    html.push_str(r#"<span class="link-card-body">"#);
    html.push_str(&format!(
        r#"<span class="link-card-title">{}</span>"#,
        html_escape(&card.title)
    ));
    if let Some(description) = &card.description {
        html.push_str(&format!(
            r#"<span class="link-card-description">{}</span>"#,
            html_escape(description)
        ));
    }
    html.push_str(&format!(
        r#"<span class="link-card-url">{}</span>"#,
        html_escape(&card.url)
    ));
    html.push_str("</span></a>\n");
    html
}
