//! Core domain types for ContextFunnel runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for run identifiers (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// SourceKind
// ---------------------------------------------------------------------------

/// Classification of an input reference. Every reference gets exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// GitHub repository URL.
    Repo,
    /// GitHub pull request URL.
    PullRequest,
    /// GitHub issue URL.
    Issue,
    /// arXiv paper URL.
    Arxiv,
    /// YouTube video URL.
    Video,
    /// Any other http(s) URL; handled by the crawler.
    WebPage,
    /// DOI or PubMed identifier.
    ScholarlyId,
    /// Local file or directory path.
    LocalPath,
}

impl SourceKind {
    /// Stable snake_case tag, used in storage rows and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Repo => "repo",
            Self::PullRequest => "pull_request",
            Self::Issue => "issue",
            Self::Arxiv => "arxiv",
            Self::Video => "video",
            Self::WebPage => "web_page",
            Self::ScholarlyId => "scholarly_id",
            Self::LocalPath => "local_path",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "repo" => Ok(Self::Repo),
            "pull_request" => Ok(Self::PullRequest),
            "issue" => Ok(Self::Issue),
            "arxiv" => Ok(Self::Arxiv),
            "video" => Ok(Self::Video),
            "web_page" => Ok(Self::WebPage),
            "scholarly_id" => Ok(Self::ScholarlyId),
            "local_path" => Ok(Self::LocalPath),
            other => Err(format!("unknown source kind: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// RunStatus / RunRecord
// ---------------------------------------------------------------------------

/// Lifecycle state of a processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown run status: {other}")),
        }
    }
}

/// One processing run, as persisted in the run history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique run identifier (UUID v7).
    pub id: RunId,
    /// The reference string as submitted, trimmed.
    pub reference: String,
    /// Classification assigned to the reference.
    pub kind: SourceKind,
    /// Name of the classification rule that fired.
    pub rule: String,
    /// Lifecycle state.
    pub status: RunStatus,
    /// Token count of the uncompressed artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncompressed_tokens: Option<usize>,
    /// Token count of the compressed artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_tokens: Option<usize>,
    /// Number of crawled URLs (crawl runs only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_count: Option<usize>,
    /// Failure description for failed runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the run started.
    pub created_at: DateTime<Utc>,
    /// When the run completed or failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunRecord {
    /// Start a new record in the running state.
    pub fn started(id: RunId, reference: impl Into<String>, kind: SourceKind, rule: impl Into<String>) -> Self {
        Self {
            id,
            reference: reference.into(),
            kind,
            rule: rule.into(),
            status: RunStatus::Running,
            uncompressed_tokens: None,
            compressed_tokens: None,
            url_count: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn run_ids_are_time_sortable() {
        let a = RunId::new();
        let b = RunId::new();
        assert!(a.to_string() <= b.to_string());
    }

    #[test]
    fn source_kind_tag_roundtrip() {
        for kind in [
            SourceKind::Repo,
            SourceKind::PullRequest,
            SourceKind::Issue,
            SourceKind::Arxiv,
            SourceKind::Video,
            SourceKind::WebPage,
            SourceKind::ScholarlyId,
            SourceKind::LocalPath,
        ] {
            let parsed: SourceKind = kind.as_str().parse().expect("parse kind tag");
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn source_kind_serde_uses_snake_case() {
        let json = serde_json::to_string(&SourceKind::PullRequest).expect("serialize");
        assert_eq!(json, "\"pull_request\"");
    }

    #[test]
    fn run_record_serialization() {
        let record = RunRecord::started(
            RunId::new(),
            "https://example.com/page",
            SourceKind::WebPage,
            "http-url",
        );
        let json = serde_json::to_string(&record).expect("serialize");
        let parsed: RunRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.status, RunStatus::Running);
        assert_eq!(parsed.kind, SourceKind::WebPage);
        assert!(parsed.completed_at.is_none());
    }
}
