//! Extractor contract shared by all non-crawl sources.

use async_trait::async_trait;

use contextfunnel_shared::{Result, SourceKind};

/// A per-kind text extractor.
///
/// Implementations fetch the referenced resource and render it as plain
/// UTF-8 text, or fail with a source-specific error that the dispatcher
/// propagates unchanged. Exactly one extractor is registered per kind.
#[async_trait]
pub trait SourceExtractor: Send + Sync {
    /// The kind this extractor serves.
    fn kind(&self) -> SourceKind;

    /// Human-readable extractor name for tracing.
    fn name(&self) -> &str;

    /// Fetch the referenced resource and render it as text.
    async fn extract(&self, reference: &str) -> Result<String>;
}
