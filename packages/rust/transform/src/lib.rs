//! Text transforms shared by the extraction pipeline.
//!
//! Four concerns live here:
//! - [`html_to_text`] — readable text (Markdown-flavored) from fetched HTML
//! - [`compress_text`] — the normalization pass producing the compressed artifact
//! - [`TokenCounter`] / [`count_tokens`] — token estimation for artifacts
//! - [`PdfTextExtractor`] — the PDF-to-text collaborator boundary

mod html;
mod normalize;
mod pdf;
mod tokens;

pub use html::html_to_text;
pub use normalize::compress_text;
pub use pdf::{PdfTextDefault, PdfTextExtractor};
pub use tokens::{EstimatingCounter, TokenCounter, count_tokens};
