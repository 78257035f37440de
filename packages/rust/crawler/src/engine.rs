//! Depth-bounded, sequential web crawler.
//!
//! The crawler starts from a seed URL and performs strict breadth-first
//! traversal within the seed's host, extracting readable text from HTML pages
//! and (optionally) PDF documents. Nodes are fetched one at a time, so the
//! visitation order is reproducible for a fixed seed and fixed responses.

use std::collections::{HashSet, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use contextfunnel_shared::{CrawlParams, FunnelError, Result};
use contextfunnel_transform::{PdfTextDefault, PdfTextExtractor, html_to_text};

/// User-Agent string for crawl requests.
const USER_AGENT: &str = concat!("ContextFunnel/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// CrawlResult
// ---------------------------------------------------------------------------

/// Outcome of a bounded crawl.
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    /// Concatenation of per-page text fragments in visitation order.
    pub content: String,
    /// URLs that contributed text, in visitation order. Contains no
    /// duplicates; every entry was reached within `max_depth` of the seed.
    pub processed_urls: Vec<String>,
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// Depth-bounded breadth-first web crawler.
///
/// Traversal is sequential: the frontier is a FIFO queue and nodes are
/// fetched strictly one at a time, so `processed_urls` order is the BFS
/// order of the link graph. Fetch and extraction failures are isolated per
/// node and never abort the crawl.
pub struct Crawler {
    client: Client,
    params: CrawlParams,
    pdf: Arc<dyn PdfTextExtractor>,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_localhost: bool,
}

impl Crawler {
    /// Create a new crawler with the given parameters.
    pub fn new(params: CrawlParams) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(params.timeout_secs))
            .build()
            .map_err(|e| FunnelError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            params,
            pdf: Arc::new(PdfTextDefault),
            allow_localhost: false,
        })
    }

    /// Replace the PDF text extractor. Tests substitute a stub here.
    pub fn with_pdf_extractor(mut self, pdf: Arc<dyn PdfTextExtractor>) -> Self {
        self.pdf = pdf;
        self
    }

    /// Allow crawling localhost/private IPs (for integration tests with mock
    /// servers). Not part of the documented API.
    #[doc(hidden)]
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    /// Crawl starting from `seed`, one node at a time in BFS order.
    ///
    /// Never fails as a whole: fetch and decode failures are isolated per
    /// node and reflected only by the node's absence from `processed_urls`.
    #[instrument(skip_all, fields(seed = %seed))]
    pub async fn crawl(&self, seed: &Url) -> CrawlResult {
        let seed_host = seed.host_str().unwrap_or("").to_string();

        let mut frontier: VecDeque<(Url, u32)> = VecDeque::new();
        frontier.push_back((seed.clone(), 0));
        let mut visited: HashSet<String> = HashSet::new();
        let mut result = CrawlResult::default();
        let mut skipped: usize = 0;

        info!(
            max_depth = self.params.max_depth,
            include_pdfs = self.params.include_pdfs,
            ignore_epubs = self.params.ignore_epubs,
            "starting crawl"
        );

        while let Some((url, depth)) = frontier.pop_front() {
            let normalized = normalize_url(&url);
            if visited.contains(&normalized) {
                continue;
            }
            // Mark before fetching so cyclic links can never re-enqueue a
            // node that is already being processed.
            visited.insert(normalized);

            if !in_scope(&seed_host, &url) {
                debug!(%url, "out of scope, skipping");
                skipped += 1;
                continue;
            }

            if !self.allow_localhost && is_ssrf_target(&url) {
                warn!(%url, "SSRF protection: blocked");
                skipped += 1;
                continue;
            }

            debug!(%url, depth, "fetching");
            let fetched = match self.fetch(&url).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    debug!(%url, error = %e, "fetch failed, node skipped");
                    skipped += 1;
                    continue;
                }
            };

            let kind = classify_resource(fetched.content_type.as_deref(), &url);
            match kind {
                ResourceKind::Html => {
                    let html = String::from_utf8_lossy(&fetched.body);
                    let text = match html_to_text(&html) {
                        Ok(text) => text,
                        Err(e) => {
                            debug!(%url, error = %e, "text extraction failed, node skipped");
                            skipped += 1;
                            continue;
                        }
                    };
                    push_fragment(&mut result.content, &url, &text);
                    result.processed_urls.push(url.to_string());

                    if depth < self.params.max_depth {
                        for link in extract_links(&html, &url) {
                            if link.host_str().unwrap_or("") != seed_host {
                                continue;
                            }
                            if !visited.contains(&normalize_url(&link)) {
                                frontier.push_back((link, depth + 1));
                            }
                        }
                    }
                }
                ResourceKind::Pdf if self.params.include_pdfs => {
                    // PDFs are traversal leaves: text only, no outbound links.
                    match self.pdf.extract_text(&fetched.body) {
                        Ok(text) => {
                            push_fragment(&mut result.content, &url, &text);
                            result.processed_urls.push(url.to_string());
                        }
                        Err(e) => {
                            debug!(%url, error = %e, "pdf extraction failed, node skipped");
                            skipped += 1;
                        }
                    }
                }
                ResourceKind::Epub if self.params.ignore_epubs => {
                    debug!(%url, "epub resource ignored");
                    skipped += 1;
                }
                _ => {
                    debug!(%url, ?kind, "unsupported content type, skipping");
                    skipped += 1;
                }
            }
        }

        info!(
            processed = result.processed_urls.len(),
            skipped,
            "crawl completed"
        );

        result
    }

    async fn fetch(&self, url: &Url) -> Result<FetchedResource> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| FunnelError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FunnelError::Network(format!("{url}: HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let body = response
            .bytes()
            .await
            .map_err(|e| FunnelError::Network(format!("{url}: body read failed: {e}")))?
            .to_vec();

        Ok(FetchedResource { content_type, body })
    }
}

/// A fetched resource before classification.
struct FetchedResource {
    content_type: Option<String>,
    body: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Resource classification
// ---------------------------------------------------------------------------

/// Resource categories the crawler distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceKind {
    Html,
    Pdf,
    Epub,
    Other,
}

/// Classify a fetched resource by Content-Type header, falling back to the
/// URL's path extension when the header is missing or unrecognized.
fn classify_resource(content_type: Option<&str>, url: &Url) -> ResourceKind {
    let header = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase());

    match header.as_deref() {
        Some("text/html") | Some("application/xhtml+xml") => return ResourceKind::Html,
        Some("application/pdf") => return ResourceKind::Pdf,
        Some("application/epub+zip") => return ResourceKind::Epub,
        _ => {}
    }

    let path = url.path().to_ascii_lowercase();
    if path.ends_with(".pdf") {
        ResourceKind::Pdf
    } else if path.ends_with(".epub") {
        ResourceKind::Epub
    } else if header.is_none() {
        // No header to go on; assume a page, like a browser would.
        ResourceKind::Html
    } else {
        ResourceKind::Other
    }
}

// ---------------------------------------------------------------------------
// Scope and SSRF protection
// ---------------------------------------------------------------------------

/// A URL is in scope when it is http(s) and shares the seed's host.
fn in_scope(seed_host: &str, url: &Url) -> bool {
    if url.scheme() != "http" && url.scheme() != "https" {
        return false;
    }
    url.host_str().unwrap_or("") == seed_host
}

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    // Block non-HTTP schemes
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    // Block private/loopback IPs
    if let Some(host) = url.host_str() {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return is_private_ip(&ip);
        }
        // Block known local hostnames
        if host == "localhost"
            || host == "127.0.0.1"
            || host == "[::1]"
            || host.ends_with(".local")
            || host.ends_with(".internal")
        {
            return true;
        }
    }

    false
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
                // 192.0.0.0/24
                || (v4.octets()[0] == 192 && v4.octets()[1] == 0 && v4.octets()[2] == 0)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

// ---------------------------------------------------------------------------
// Link discovery and text assembly
// ---------------------------------------------------------------------------

/// Extract outbound links in document order, resolved against the base URL.
fn extract_links(html: &str, base: &Url) -> Vec<Url> {
    let doc = Html::parse_document(html);
    let link_sel = Selector::parse("a[href]").expect("valid selector");
    let mut links = Vec::new();

    for el in doc.select(&link_sel) {
        if let Some(href) = el.value().attr("href") {
            // Skip anchors, javascript:, mailto:
            if href.starts_with('#')
                || href.starts_with("javascript:")
                || href.starts_with("mailto:")
            {
                continue;
            }

            // Resolve relative URLs and strip fragments
            if let Ok(mut resolved) = base.join(href) {
                resolved.set_fragment(None);
                links.push(resolved);
            }
        }
    }

    links
}

/// Normalize a URL for deduplication (strip fragment, trailing slash).
fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    let mut s = normalized.to_string();
    // Remove trailing slash for consistency (except root path)
    if s.ends_with('/') && s.matches('/').count() > 3 {
        s.pop();
    }
    s
}

/// Append one node's text to the crawl buffer, preceded by a source marker.
fn push_fragment(buffer: &mut String, url: &Url, text: &str) {
    if !buffer.is_empty() {
        buffer.push_str("\n\n");
    }
    buffer.push_str("# Source: ");
    buffer.push_str(url.as_str());
    buffer.push('\n');
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        buffer.push('\n');
        buffer.push_str(trimmed);
    }
}
