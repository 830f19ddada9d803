//! Per-run processing context.
//!
//! Everything one build needs to render documents lives here: the attachment
//! source (and its filename index), the markdown processor and the optional image
//! optimizer. A context is created for a run and dropped with it, so no cache
//! outlives the run that filled it.

use crate::attachments::{AttachmentResolver, AttachmentSource, DiskAttachments};
use crate::config::Config;
use crate::diary::DiaryParser;
use crate::markdown::{MarkdownProcessor, RenderContext, RenderedDocument};
use crate::protected::{
    CodecError, DimensionProbe, ImageOptimizer, ProtectedRenderer, DEFAULT_THUMBNAIL_SIZE,
};
use almanac_types::{EncryptedPostPayload, ParsedEntry};
use std::path::Path;

pub struct PipelineContext {
    source: Box<dyn AttachmentSource>,
    processor: MarkdownProcessor,
    optimizer: Option<Box<dyn ImageOptimizer>>,
    thumbnail_size: u32,
}

impl PipelineContext {
    pub fn new(source: Box<dyn AttachmentSource>) -> Self {
        Self {
            source,
            processor: MarkdownProcessor::new(),
            optimizer: None,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
        }
    }

    /// Context for a configured site: disk attachments plus header-probing optimizer
    pub fn from_config(config: &Config) -> Self {
        let attachment_dir = config.attachment_dir();
        let source = DiskAttachments::new(&attachment_dir);
        let probe = DimensionProbe::new(source.root().to_path_buf());

        Self::new(Box::new(source))
            .with_processor(MarkdownProcessor::new().with_toc_heading(&config.markdown.toc_heading))
            .with_optimizer(Box::new(probe), config.protected.thumbnail_size)
    }

    pub fn with_processor(mut self, processor: MarkdownProcessor) -> Self {
        self.processor = processor;
        self
    }

    pub fn with_optimizer(mut self, optimizer: Box<dyn ImageOptimizer>, thumbnail_size: u32) -> Self {
        self.optimizer = Some(optimizer);
        self.thumbnail_size = thumbnail_size;
        self
    }

    pub fn resolver(&self) -> AttachmentResolver<'_> {
        AttachmentResolver::new(self.source.as_ref())
    }

    pub fn processor(&self) -> &MarkdownProcessor {
        &self.processor
    }

    fn render_context<'a>(&'a self, document: Option<&'a Path>) -> RenderContext<'a> {
        RenderContext::new(self.resolver(), document)
    }

    pub fn render_markdown(&self, markdown: &str, document: Option<&Path>) -> RenderedDocument {
        self.processor
            .render(markdown, self.render_context(document))
    }

    fn protected_renderer(&self) -> ProtectedRenderer<'_> {
        let renderer = ProtectedRenderer::new(&self.processor);
        match self.optimizer.as_deref() {
            Some(optimizer) => renderer.with_optimizer(optimizer, self.thumbnail_size),
            None => renderer,
        }
    }

    /// Render an already decrypted protected body. Never fails.
    pub fn render_protected(&self, markdown: &str, document: Option<&Path>) -> String {
        self.protected_renderer()
            .render(markdown, self.render_context(document))
    }

    /// Decrypt and render a protected body
    pub fn unlock(
        &self,
        payload: &EncryptedPostPayload,
        password: &str,
        document: Option<&Path>,
    ) -> Result<String, CodecError> {
        self.protected_renderer()
            .unlock(payload, password, self.render_context(document))
    }

    pub fn diary_parser(&self) -> DiaryParser<'_> {
        let parser = DiaryParser::new(&self.processor).with_resolver(self.resolver());
        match self.optimizer.as_deref() {
            Some(optimizer) => parser.with_optimizer(optimizer, self.thumbnail_size),
            None => parser,
        }
    }

    pub fn parse_diary(&self, raw_id: &str, body: &str, document: Option<&Path>) -> ParsedEntry {
        self.diary_parser().parse(raw_id, body, document)
    }
}
