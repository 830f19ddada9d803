//! Integration tests for markdown processing

use super::*;
use crate::attachments::MemoryAttachments;

fn attachments() -> MemoryAttachments {
    MemoryAttachments::new("/site/src/data/attachment")
        .with_file("blog/kyoto/temple.jpg")
        .with_file("inbox/temple.jpg")
        .with_file("inbox/map.png")
}

#[test]
fn test_three_link_cards_with_broken_middle() {
    let markdown = r#"
```card-link
title: First
url: https://one.example
```

```card-link
title: Broken, no url
```

```card-link
title: Third
url: https://three.example
```
"#;

    let processor = MarkdownProcessor::new();
    let doc = processor.render(markdown, RenderContext::default());

    let titles: Vec<&str> = doc.link_cards.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["First", "Third"]);

    let first = doc.html.find("https://one.example").unwrap();
    let broken = doc.html.find("title: Broken, no url").unwrap();
    let third = doc.html.find("https://three.example").unwrap();
    assert!(first < broken && broken < third, "document order preserved");
    assert_eq!(doc.html.matches(r#"class="link-card""#).count(), 2);
    assert_eq!(doc.html.matches("<pre>").count(), 1);
}

#[test]
fn test_embeds_resolve_per_document() {
    let source = attachments();
    let resolver = AttachmentResolver::new(&source);
    let doc_path = Path::new("/site/src/data/blog/kyoto.md");

    let processor = MarkdownProcessor::new();
    let doc = processor.render(
        "Day one ![[temple.jpg|Kinkaku-ji]] and ![[map.png|400]].",
        RenderContext::new(resolver, Some(doc_path)),
    );

    assert!(doc
        .html
        .contains(r#"<img src="../attachment/blog/kyoto/temple.jpg" alt="Kinkaku-ji" />"#));
    assert!(doc
        .html
        .contains(r#"<img src="../attachment/inbox/map.png" alt="" />"#));
    assert!(doc.html.contains("Day one "));
    assert!(!doc.html.contains("![["));
}

#[test]
fn test_cards_and_embeds_in_one_document() {
    let markdown = r#"# 京都

## 目录

## Watching

```card-movie
title: Interstellar
rating: 8.9
genres: Sci-Fi, Drama
id: 157336
```

## Reading

```card-link
title: Kyoto guide
url: https://guide.example
```

![[temple.jpg]]
"#;
    let source = attachments();
    let resolver = AttachmentResolver::new(&source);
    let processor = MarkdownProcessor::new();
    let doc = processor.render(markdown, RenderContext::new(resolver, None));

    assert!(doc.html.contains("电影：《Interstellar》"));
    assert!(doc.html.contains("评分 8.9 ｜ Sci-Fi / Drama"));
    assert_eq!(doc.link_cards.len(), 1);
    assert!(doc.html.contains(r##"<a href="#watching">Watching</a>"##));
    assert!(doc.html.contains(r##"<a href="#reading">Reading</a>"##));
    // No document path: the inbox copy wins
    assert!(doc.html.contains(r#"src="../attachment/inbox/temple.jpg""#));
}

#[test]
fn test_card_syntax_inside_other_code_is_untouched() {
    let markdown = "````markdown\n```card-link\ntitle: x\nurl: https://x.example\n```\n````\n";
    let processor = MarkdownProcessor::new();
    let doc = processor.render(markdown, RenderContext::default());
    assert!(doc.link_cards.is_empty());
    assert!(doc.html.contains("card-link"));
}
