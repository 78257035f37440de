//! Source classification and extraction.
//!
//! A reference string (URL, DOI, PMID, or filesystem path) is classified
//! into a [`SourceKind`] by an ordered rule table, then dispatched to the
//! extractor registered for that kind. Every extractor returns plain text
//! ready for the transform stage.
//!
//! [`SourceKind`]: contextfunnel_shared::SourceKind

pub mod arxiv;
pub mod classify;
pub mod dispatch;
pub mod extractor;
pub mod github;
pub mod local;
pub mod scholarly;
pub mod video;

pub use arxiv::ArxivExtractor;
pub use classify::{Classification, classify};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use extractor::SourceExtractor;
pub use github::{GithubClient, IssueExtractor, PullRequestExtractor, RepoExtractor};
pub use local::{LocalPathExtractor, read_text_lossy};
pub use scholarly::ScholarlyExtractor;
pub use video::VideoExtractor;
