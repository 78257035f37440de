//! Error types for ContextFunnel.
//!
//! Library crates use [`FunnelError`] via `thiserror`.
//! App crates (cli/server) catch this at the boundary: the server turns it
//! into a JSON error body, the CLI wraps it with `color-eyre`.

use std::path::PathBuf;

use crate::types::SourceKind;

/// Top-level error type for all ContextFunnel operations.
///
/// Per-node crawl failures are deliberately NOT a variant here: the crawler
/// isolates them internally and they surface only as a URL missing from the
/// processed list.
#[derive(Debug, thiserror::Error)]
pub enum FunnelError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error outside any specific source extractor.
    #[error("network error: {0}")]
    Network(String),

    /// A source extractor failed; aborts the whole run.
    #[error("{kind} source error: {message}")]
    Source { kind: SourceKind, message: String },

    /// Text transform failure (PDF extraction, HTML conversion).
    #[error("transform error: {0}")]
    Transform(String),

    /// Database or run-history layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Requested artifact name absent from the store.
    #[error("artifact not found: {name}")]
    ArtifactNotFound { name: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad identifier, rejected artifact name, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FunnelError>;

impl FunnelError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a source error tagged with the kind that failed.
    pub fn source(kind: SourceKind, msg: impl Into<String>) -> Self {
        Self::Source {
            kind,
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a not-found error for an artifact name.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::ArtifactNotFound { name: name.into() }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable tag for the variant, used in API error payloads.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Network(_) => "network",
            Self::Source { .. } => "source",
            Self::Transform(_) => "transform",
            Self::Storage(_) => "storage",
            Self::ArtifactNotFound { .. } => "artifact_not_found",
            Self::Io { .. } => "io",
            Self::Validation { .. } => "validation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = FunnelError::config("missing data directory");
        assert_eq!(err.to_string(), "config error: missing data directory");

        let err = FunnelError::source(SourceKind::Arxiv, "paper fetch returned 503");
        assert_eq!(err.to_string(), "arxiv source error: paper fetch returned 503");

        let err = FunnelError::not_found("compressed_output.txt");
        assert!(err.to_string().contains("compressed_output.txt"));
    }

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(FunnelError::Network("boom".into()).kind_tag(), "network");
        assert_eq!(
            FunnelError::source(SourceKind::Video, "no captions").kind_tag(),
            "source"
        );
        assert_eq!(
            FunnelError::not_found("missing.txt").kind_tag(),
            "artifact_not_found"
        );
    }
}
