//! Attachment path resolution.
//!
//! Documents reference media loosely: bare file names pasted by an editor, paths
//! relative to the document, or already-namespaced `attachment/...` paths. The
//! resolver maps all of them onto the published `../attachment/<path>` form.

mod caption;
mod source;

pub use caption::{is_generated_name, sanitize_caption};
pub use source::{absolutize, normalize_path, AttachmentSource, DiskAttachments, MemoryAttachments};

use percent_encoding::percent_decode_str;
use std::path::Path;

/// Prefix of every published attachment URL
pub const ATTACHMENT_URL_PREFIX: &str = "../attachment/";

const ATTACHMENT_SEGMENT: &str = "attachment/";
const BLOG_FOLDER: &str = "blog";
const INBOX_FOLDER: &str = "inbox";

/// Resolves raw image targets against an attachment namespace
#[derive(Clone, Copy)]
pub struct AttachmentResolver<'a> {
    source: &'a dyn AttachmentSource,
}

impl<'a> AttachmentResolver<'a> {
    pub fn new(source: &'a dyn AttachmentSource) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &'a dyn AttachmentSource {
        self.source
    }

    /// Resolve `raw_target` as referenced from `current_document`.
    ///
    /// Never fails: when nothing matches, the cleaned-up target is returned so the
    /// broken reference stays visible in the output.
    pub fn resolve(&self, raw_target: &str, current_document: Option<&Path>) -> String {
        let target = clean_target(raw_target);
        if target.is_empty() {
            return target;
        }

        if is_absolute_url(&target) {
            return target;
        }

        if let Some(namespaced) = namespaced(&target) {
            return namespaced;
        }

        if target.contains('/') {
            return self
                .resolve_relative(&target, current_document)
                .unwrap_or(target);
        }

        match self.resolve_bare(&target, current_document) {
            Some(found) => found,
            None => {
                tracing::debug!(
                    "attachment {:?} not found (from {:?})",
                    target,
                    current_document
                );
                target
            }
        }
    }

    fn resolve_relative(&self, target: &str, current_document: Option<&Path>) -> Option<String> {
        let base = current_document
            .and_then(Path::parent)
            .map(absolutize)
            .unwrap_or_else(|| absolutize(Path::new("")));
        let candidate = normalize_path(&base.join(target));
        if !self.source.exists(&candidate) {
            return None;
        }

        let rel = candidate.strip_prefix(self.source.root()).ok()?;
        let rel = source::to_slash(rel);
        (!rel.is_empty()).then(|| format!("{ATTACHMENT_URL_PREFIX}{rel}"))
    }

    fn resolve_bare(&self, name: &str, current_document: Option<&Path>) -> Option<String> {
        let root = self.source.root();
        let doc_folder = current_document
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty());

        if let Some(doc) = &doc_folder {
            if self.source.exists(&root.join(BLOG_FOLDER).join(doc).join(name)) {
                return Some(format!("{ATTACHMENT_URL_PREFIX}{BLOG_FOLDER}/{doc}/{name}"));
            }
        }

        if self.source.exists(&root.join(INBOX_FOLDER).join(name)) {
            return Some(format!("{ATTACHMENT_URL_PREFIX}{INBOX_FOLDER}/{name}"));
        }

        self.search_index(name, doc_folder.as_deref())
            .map(|rel| format!("{ATTACHMENT_URL_PREFIX}{rel}"))
    }

    /// Match the full attachment index by file name suffix.
    fn search_index(&self, name: &str, doc_folder: Option<&str>) -> Option<String> {
        let needle = name.to_lowercase();
        let suffix = format!("/{needle}");
        let candidates: Vec<&String> = self
            .source
            .index()
            .iter()
            .filter(|rel| {
                let lowered = rel.to_lowercase();
                lowered == needle || lowered.ends_with(&suffix)
            })
            .collect();

        let doc_prefix = doc_folder.map(|doc| format!("{BLOG_FOLDER}/{doc}/"));
        let inbox_prefix = format!("{INBOX_FOLDER}/");

        doc_prefix
            .and_then(|prefix| candidates.iter().find(|rel| rel.starts_with(&prefix)))
            .or_else(|| candidates.iter().find(|rel| rel.starts_with(&inbox_prefix)))
            .or_else(|| candidates.first())
            .map(|rel| rel.to_string())
    }
}

fn clean_target(raw: &str) -> String {
    let unquoted = raw
        .trim()
        .trim_start_matches(['"', '\''])
        .trim_end_matches(['"', '\'']);
    let decoded = percent_decode_str(unquoted)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| unquoted.to_string());
    decoded.replace('\\', "/")
}

fn is_absolute_url(target: &str) -> bool {
    let lowered = target.get(..8).unwrap_or(target).to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

fn namespaced(target: &str) -> Option<String> {
    if target.starts_with(ATTACHMENT_URL_PREFIX) {
        return Some(target.to_string());
    }
    if target.starts_with(ATTACHMENT_SEGMENT) {
        return Some(format!("../{target}"));
    }
    let (_, suffix) = target.split_once(ATTACHMENT_SEGMENT)?;
    let suffix = if suffix.is_empty() { target } else { suffix };
    Some(format!("{ATTACHMENT_URL_PREFIX}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> MemoryAttachments {
        MemoryAttachments::new("/site/src/data/attachment")
            .with_file("blog/my-trip/beach.png")
            .with_file("inbox/beach.png")
            .with_file("inbox/shared.jpg")
            .with_file("blog/other-post/deep.webp")
            .with_file("misc/2023/Deep.webp")
    }

    fn doc(name: &str) -> std::path::PathBuf {
        Path::new("/site/src/data/blog").join(name)
    }

    #[test]
    fn test_absolute_urls_unchanged() {
        let source = fixture();
        let resolver = AttachmentResolver::new(&source);
        assert_eq!(
            resolver.resolve("https://example.com/a.png", None),
            "https://example.com/a.png"
        );
    }

    #[test]
    fn test_namespaced_paths() {
        let source = fixture();
        let resolver = AttachmentResolver::new(&source);
        assert_eq!(
            resolver.resolve("attachment/inbox/a.png", None),
            "../attachment/inbox/a.png"
        );
        assert_eq!(
            resolver.resolve("../attachment/inbox/a.png", None),
            "../attachment/inbox/a.png"
        );
        assert_eq!(
            resolver.resolve("../../src/data/attachment/blog/x/a.png", None),
            "../attachment/blog/x/a.png"
        );
    }

    #[test]
    fn test_per_document_folder_wins_over_inbox() {
        let source = fixture();
        let resolver = AttachmentResolver::new(&source);
        assert_eq!(
            resolver.resolve("beach.png", Some(&doc("my-trip.md"))),
            "../attachment/blog/my-trip/beach.png"
        );
        assert_eq!(
            resolver.resolve("beach.png", Some(&doc("unrelated.md"))),
            "../attachment/inbox/beach.png"
        );
    }

    #[test]
    fn test_index_search_prefers_document_folder() {
        let source = fixture();
        let resolver = AttachmentResolver::new(&source);
        assert_eq!(
            resolver.resolve("deep.webp", Some(&doc("other-post.md"))),
            "../attachment/blog/other-post/deep.webp"
        );
        // Case-insensitive suffix match; first index hit when no folder preference applies.
        assert_eq!(
            resolver.resolve("DEEP.webp", Some(&doc("unrelated.md"))),
            "../attachment/blog/other-post/deep.webp"
        );
    }

    #[test]
    fn test_relative_path_under_attachment_root() {
        let source = MemoryAttachments::new("/site/media")
            .with_file("inbox/shared.jpg")
            .with_file("/site/posts/img/local.png");
        let resolver = AttachmentResolver::new(&source);
        let post = Path::new("/site/posts/post.md");

        assert_eq!(
            resolver.resolve("../media/inbox/shared.jpg", Some(post)),
            "../attachment/inbox/shared.jpg"
        );
        // Exists, but outside the attachment root: kept as written.
        assert_eq!(resolver.resolve("img/local.png", Some(post)), "img/local.png");
    }

    #[test]
    fn test_relative_path_missing_is_returned_as_given() {
        let source = fixture();
        let resolver = AttachmentResolver::new(&source);
        assert_eq!(
            resolver.resolve("images/missing.png", Some(&doc("post.md"))),
            "images/missing.png"
        );
    }

    #[test]
    fn test_bare_miss_returns_file_name() {
        let source = fixture();
        let resolver = AttachmentResolver::new(&source);
        assert_eq!(
            resolver.resolve("'nowhere.png'", Some(&doc("post.md"))),
            "nowhere.png"
        );
    }

    #[test]
    fn test_percent_encoded_and_backslashes() {
        let source = MemoryAttachments::new("/root/attachment").with_file("inbox/my photo.png");
        let resolver = AttachmentResolver::new(&source);
        assert_eq!(
            resolver.resolve("my%20photo.png", None),
            "../attachment/inbox/my photo.png"
        );
        assert_eq!(
            resolver.resolve("attachment\\inbox\\x.png", None),
            "../attachment/inbox/x.png"
        );
    }
}
