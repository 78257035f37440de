//! PDF text extraction collaborator.
//!
//! The crawler and the arXiv extractor both consume PDFs through the
//! [`PdfTextExtractor`] trait; tests substitute stubs so nothing outside this
//! module depends on the `pdf-extract` crate's behavior.

use contextfunnel_shared::{FunnelError, Result};

/// Extracts UTF-8 text from in-memory PDF bytes.
pub trait PdfTextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8]) -> Result<String>;
}

/// Default extractor backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextDefault;

impl PdfTextExtractor for PdfTextDefault {
    fn extract_text(&self, bytes: &[u8]) -> Result<String> {
        pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| FunnelError::Transform(format!("pdf text extraction failed: {e}")))
    }
}
