//! # almanac-core
//!
//! Core library for the almanac diary publisher.
//!
//! This crate turns authoring input (dated diary files, markdown with wiki-style
//! embeds and card blocks, password-protected posts) into the render-ready model
//! served to the timeline client.

pub mod attachments;
pub mod builder;
pub mod config;
pub mod diary;
pub mod frontmatter;
pub mod identifier;
pub mod markdown;
pub mod pipeline;
pub mod protected;
pub mod slug;

pub use almanac_types as types;
pub use attachments::{
    sanitize_caption, AttachmentResolver, AttachmentSource, DiskAttachments, MemoryAttachments,
};
pub use builder::{BuildError, BuildReport, SiteBuilder};
pub use config::Config;
pub use diary::{parse_diary_entry, DiaryArchive, DiaryParser};
pub use identifier::parse_identifier;
pub use markdown::{MarkdownProcessor, RenderContext, RenderedDocument};
pub use pipeline::PipelineContext;
pub use protected::{
    decrypt, encrypt, unlock_and_render, CodecError, DimensionProbe, ImageOptimizer, OptimizedImage,
};
pub use slug::slugify;
