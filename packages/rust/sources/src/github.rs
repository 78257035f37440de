//! GitHub extractors: repository trees, pull requests, and issues.
//!
//! All three ride the REST v3 API through a shared [`GithubClient`]. An
//! optional bearer token is read from the environment variable named in the
//! config; unauthenticated access works for public repositories within the
//! API rate limits.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use contextfunnel_shared::{FunnelError, GithubConfig, Result, SourceKind};

use crate::extractor::SourceExtractor;
use crate::local::is_text_path;

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";

/// Blobs larger than this are listed but not fetched.
const MAX_BLOB_BYTES: u64 = 1024 * 1024;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Shared GitHub REST client used by the repo, pull request, and issue
/// extractors.
#[derive(Clone)]
pub struct GithubClient {
    client: Client,
    api_base: String,
    raw_base: String,
    token: Option<String>,
}

impl GithubClient {
    /// Build a client from config. The token is read from the environment
    /// variable named in the config and attached as a bearer credential when
    /// present; it is never persisted anywhere.
    pub fn new(client: Client, config: &GithubConfig) -> Self {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|token| !token.is_empty());
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            raw_base: config.raw_base.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn api(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    fn raw(&self, path: &str) -> String {
        format!("{}{path}", self.raw_base)
    }

    fn request(&self, url: &str, accept: Option<&str>) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, accept.unwrap_or(JSON_MEDIA_TYPE));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn get_json<T: DeserializeOwned>(&self, kind: SourceKind, url: &str) -> Result<T> {
        let response = self
            .request(url, None)
            .send()
            .await
            .map_err(|e| FunnelError::source(kind, format!("{url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FunnelError::source(kind, format!("{url}: HTTP {status}")));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| FunnelError::source(kind, format!("{url}: malformed response: {e}")))
    }

    async fn get_text(&self, kind: SourceKind, url: &str, accept: Option<&str>) -> Result<String> {
        let response = self
            .request(url, accept)
            .send()
            .await
            .map_err(|e| FunnelError::source(kind, format!("{url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FunnelError::source(kind, format!("{url}: HTTP {status}")));
        }
        response
            .text()
            .await
            .map_err(|e| FunnelError::source(kind, format!("{url}: body read failed: {e}")))
    }
}

// ---------------------------------------------------------------------------
// API payloads
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RepoInfo {
    default_branch: String,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Deserialize)]
struct IssuePayload {
    title: String,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Deserialize)]
struct CommentPayload {
    #[serde(default)]
    user: Option<UserPayload>,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Deserialize)]
struct UserPayload {
    login: String,
}

// ---------------------------------------------------------------------------
// Reference parsing
// ---------------------------------------------------------------------------

/// Split a GitHub URL into its non-empty path segments.
fn parse_repo_path(reference: &str, kind: SourceKind) -> Result<Vec<String>> {
    let url = Url::parse(reference)
        .map_err(|e| FunnelError::source(kind, format!("unparseable GitHub URL: {e}")))?;
    let segments: Vec<String> = url
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();
    if segments.len() < 2 {
        return Err(FunnelError::source(
            kind,
            "expected https://github.com/<owner>/<repo>",
        ));
    }
    Ok(segments)
}

/// Parse `<owner>/<repo>/<marker>/<number>` references (pulls and issues).
fn parse_numbered(
    reference: &str,
    marker: &str,
    kind: SourceKind,
) -> Result<(String, String, u64)> {
    let segments = parse_repo_path(reference, kind)?;
    if segments.len() < 4 || segments[2] != marker {
        return Err(FunnelError::source(
            kind,
            format!("expected https://github.com/<owner>/<repo>/{marker}/<number>"),
        ));
    }
    let number: u64 = segments[3].parse().map_err(|_| {
        FunnelError::source(kind, format!("invalid {marker} number: {}", segments[3]))
    })?;
    let repo = segments[1].trim_end_matches(".git").to_string();
    Ok((segments[0].clone(), repo, number))
}

fn push_file_section(buffer: &mut String, path: &str, content: &str) {
    buffer.push_str(&format!("--- {path} ---\n"));
    buffer.push_str(content);
    if !content.ends_with('\n') {
        buffer.push('\n');
    }
    buffer.push('\n');
}

fn push_comments(buffer: &mut String, heading: &str, comments: &[CommentPayload]) {
    if comments.is_empty() {
        return;
    }
    buffer.push_str(&format!("\n{heading}\n\n"));
    for comment in comments {
        let author = comment
            .user
            .as_ref()
            .map_or("unknown", |user| user.login.as_str());
        let body = comment.body.as_deref().unwrap_or("").trim();
        buffer.push_str(&format!("{author}: {body}\n"));
    }
}

// ---------------------------------------------------------------------------
// Repo extractor
// ---------------------------------------------------------------------------

/// Renders a repository's default branch as concatenated text files.
pub struct RepoExtractor {
    client: GithubClient,
}

impl RepoExtractor {
    pub fn new(client: GithubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceExtractor for RepoExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::Repo
    }

    fn name(&self) -> &str {
        "github-repo"
    }

    async fn extract(&self, reference: &str) -> Result<String> {
        let kind = self.kind();
        let segments = parse_repo_path(reference, kind)?;
        let owner = &segments[0];
        let repo = segments[1].trim_end_matches(".git");

        let info: RepoInfo = self
            .client
            .get_json(kind, &self.client.api(&format!("/repos/{owner}/{repo}")))
            .await?;
        let tree: TreeResponse = self
            .client
            .get_json(
                kind,
                &self.client.api(&format!(
                    "/repos/{owner}/{repo}/git/trees/{}?recursive=1",
                    info.default_branch
                )),
            )
            .await?;
        if tree.truncated {
            warn!(%owner, %repo, "tree listing truncated by the API");
        }

        let mut buffer = format!(
            "# Repository: {owner}/{repo} (branch {})\n\n",
            info.default_branch
        );
        let mut included = 0usize;
        for entry in &tree.tree {
            if entry.entry_type != "blob" || !is_text_path(&entry.path) {
                continue;
            }
            if entry.size.unwrap_or(0) > MAX_BLOB_BYTES {
                debug!(path = %entry.path, "skipping oversized blob");
                continue;
            }
            let raw_url = self.client.raw(&format!(
                "/{owner}/{repo}/{}/{}",
                info.default_branch, entry.path
            ));
            let content = self.client.get_text(kind, &raw_url, None).await?;
            push_file_section(&mut buffer, &entry.path, &content);
            included += 1;
        }

        info!(%owner, %repo, files = included, "repository rendered");
        Ok(buffer)
    }
}

// ---------------------------------------------------------------------------
// Pull request extractor
// ---------------------------------------------------------------------------

/// Renders a pull request: title, body, diff, and both comment streams.
pub struct PullRequestExtractor {
    client: GithubClient,
}

impl PullRequestExtractor {
    pub fn new(client: GithubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceExtractor for PullRequestExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::PullRequest
    }

    fn name(&self) -> &str {
        "github-pull-request"
    }

    async fn extract(&self, reference: &str) -> Result<String> {
        let kind = self.kind();
        let (owner, repo, number) = parse_numbered(reference, "pull", kind)?;

        let pulls_url = self
            .client
            .api(&format!("/repos/{owner}/{repo}/pulls/{number}"));
        let pr: IssuePayload = self.client.get_json(kind, &pulls_url).await?;
        let diff = self
            .client
            .get_text(kind, &pulls_url, Some(DIFF_MEDIA_TYPE))
            .await?;
        let discussion: Vec<CommentPayload> = self
            .client
            .get_json(
                kind,
                &self
                    .client
                    .api(&format!("/repos/{owner}/{repo}/issues/{number}/comments")),
            )
            .await?;
        let reviews: Vec<CommentPayload> = self
            .client
            .get_json(
                kind,
                &self
                    .client
                    .api(&format!("/repos/{owner}/{repo}/pulls/{number}/comments")),
            )
            .await?;

        let mut buffer = format!("# Pull Request #{number}: {}\n\n", pr.title);
        if let Some(body) = pr.body.as_deref().filter(|body| !body.trim().is_empty()) {
            buffer.push_str(body.trim());
            buffer.push_str("\n\n");
        }
        buffer.push_str("## Diff\n\n");
        buffer.push_str(diff.trim_end());
        buffer.push('\n');
        push_comments(&mut buffer, "## Comments", &discussion);
        push_comments(&mut buffer, "## Review comments", &reviews);

        info!(%owner, %repo, number, "pull request rendered");
        Ok(buffer)
    }
}

// ---------------------------------------------------------------------------
// Issue extractor
// ---------------------------------------------------------------------------

/// Renders an issue with its comment thread.
pub struct IssueExtractor {
    client: GithubClient,
}

impl IssueExtractor {
    pub fn new(client: GithubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceExtractor for IssueExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::Issue
    }

    fn name(&self) -> &str {
        "github-issue"
    }

    async fn extract(&self, reference: &str) -> Result<String> {
        let kind = self.kind();
        let (owner, repo, number) = parse_numbered(reference, "issues", kind)?;

        let issue: IssuePayload = self
            .client
            .get_json(
                kind,
                &self
                    .client
                    .api(&format!("/repos/{owner}/{repo}/issues/{number}")),
            )
            .await?;
        let comments: Vec<CommentPayload> = self
            .client
            .get_json(
                kind,
                &self
                    .client
                    .api(&format!("/repos/{owner}/{repo}/issues/{number}/comments")),
            )
            .await?;

        let mut buffer = format!("# Issue #{number}: {}\n\n", issue.title);
        if let Some(body) = issue.body.as_deref().filter(|body| !body.trim().is_empty()) {
            buffer.push_str(body.trim());
            buffer.push('\n');
        }
        push_comments(&mut buffer, "## Comments", &comments);

        info!(%owner, %repo, number, "issue rendered");
        Ok(buffer)
    }
}
