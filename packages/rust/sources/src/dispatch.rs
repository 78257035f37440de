//! Routes a classified reference to the extractor that handles its kind.

use std::sync::Arc;

use reqwest::Client;
use reqwest::redirect::Policy;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use contextfunnel_crawler::{CrawlResult, Crawler};
use contextfunnel_shared::{AppConfig, CrawlParams, FunnelError, Result, SourceKind};
use contextfunnel_transform::{PdfTextDefault, PdfTextExtractor};

use crate::arxiv::ArxivExtractor;
use crate::extractor::SourceExtractor;
use crate::github::{GithubClient, IssueExtractor, PullRequestExtractor, RepoExtractor};
use crate::local::LocalPathExtractor;
use crate::scholarly::ScholarlyExtractor;
use crate::video::VideoExtractor;

const USER_AGENT: &str = concat!("ContextFunnel/", env!("CARGO_PKG_VERSION"));

// Web crawls always run with this shape; only the timeout is configurable.
const WEB_MAX_DEPTH: u32 = 2;
const WEB_INCLUDE_PDFS: bool = true;
const WEB_IGNORE_EPUBS: bool = true;

/// Extracted text plus, for crawls, the pages that contributed to it.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub text: String,
    pub processed_urls: Option<Vec<String>>,
}

/// Holds one extractor per source kind and a crawler for web pages.
pub struct Dispatcher {
    extractors: Vec<Box<dyn SourceExtractor>>,
    crawler: Crawler,
}

impl Dispatcher {
    /// Wire up the full extractor registry from config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let timeout_secs = config.defaults.fetch_timeout_secs;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::limited(5))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FunnelError::config(format!("http client: {e}")))?;

        let github = GithubClient::new(client.clone(), &config.github);
        let pdf: Arc<dyn PdfTextExtractor> = Arc::new(PdfTextDefault);

        let extractors: Vec<Box<dyn SourceExtractor>> = vec![
            Box::new(RepoExtractor::new(github.clone())),
            Box::new(PullRequestExtractor::new(github.clone())),
            Box::new(IssueExtractor::new(github)),
            Box::new(ArxivExtractor::new(client.clone(), Arc::clone(&pdf))),
            Box::new(VideoExtractor::new(client.clone())),
            Box::new(ScholarlyExtractor::new(client, &config.scholarly)),
            Box::new(LocalPathExtractor),
        ];

        let crawler = Crawler::new(CrawlParams {
            max_depth: WEB_MAX_DEPTH,
            include_pdfs: WEB_INCLUDE_PDFS,
            ignore_epubs: WEB_IGNORE_EPUBS,
            timeout_secs,
        })?
        .with_pdf_extractor(pdf);

        Ok(Self {
            extractors,
            crawler,
        })
    }

    /// Replace the crawler, used by tests that need local-network access.
    pub fn with_crawler(mut self, crawler: Crawler) -> Self {
        self.crawler = crawler;
        self
    }

    /// Replace the extractor registry.
    pub fn with_extractors(mut self, extractors: Vec<Box<dyn SourceExtractor>>) -> Self {
        self.extractors = extractors;
        self
    }

    /// Run the extractor for `kind` against `reference`.
    #[instrument(skip_all, fields(kind = %kind))]
    pub async fn dispatch(&self, reference: &str, kind: SourceKind) -> Result<DispatchOutcome> {
        if kind == SourceKind::WebPage {
            let seed = Url::parse(reference).map_err(|e| {
                FunnelError::source(SourceKind::WebPage, format!("invalid seed URL: {e}"))
            })?;
            let CrawlResult {
                content,
                processed_urls,
            } = self.crawler.crawl(&seed).await;
            return Ok(DispatchOutcome {
                text: content,
                processed_urls: Some(processed_urls),
            });
        }

        let extractor = self
            .extractors
            .iter()
            .find(|extractor| extractor.kind() == kind)
            .ok_or_else(|| {
                FunnelError::source(kind, "no extractor registered for this kind")
            })?;
        debug!(extractor = extractor.name(), "dispatching");
        let text = extractor.extract(reference).await?;
        Ok(DispatchOutcome {
            text,
            processed_urls: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FakeExtractor {
        kind: SourceKind,
        reply: &'static str,
    }

    #[async_trait]
    impl SourceExtractor for FakeExtractor {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn name(&self) -> &str {
            "fake"
        }

        async fn extract(&self, _reference: &str) -> Result<String> {
            Ok(self.reply.to_string())
        }
    }

    fn test_dispatcher() -> Dispatcher {
        Dispatcher::from_config(&AppConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn routes_by_kind() {
        let dispatcher = test_dispatcher().with_extractors(vec![
            Box::new(FakeExtractor {
                kind: SourceKind::Repo,
                reply: "repo text",
            }),
            Box::new(FakeExtractor {
                kind: SourceKind::Issue,
                reply: "issue text",
            }),
        ]);

        let outcome = dispatcher
            .dispatch("https://github.com/acme/widget", SourceKind::Repo)
            .await
            .unwrap();
        assert_eq!(outcome.text, "repo text");
        assert!(outcome.processed_urls.is_none());

        let outcome = dispatcher
            .dispatch("https://github.com/acme/widget/issues/1", SourceKind::Issue)
            .await
            .unwrap();
        assert_eq!(outcome.text, "issue text");
    }

    #[tokio::test]
    async fn unregistered_kind_is_a_source_error() {
        let dispatcher = test_dispatcher().with_extractors(vec![]);

        let err = dispatcher
            .dispatch("https://arxiv.org/abs/2401.14295", SourceKind::Arxiv)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FunnelError::Source {
                kind: SourceKind::Arxiv,
                ..
            }
        ));
        assert!(err.to_string().contains("no extractor registered"));
    }

    #[tokio::test]
    async fn webpage_kind_routes_to_the_crawler() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "<html><body><p>landing page</p></body></html>",
                "text/html",
            ))
            .mount(&server)
            .await;

        let crawler = Crawler::new(CrawlParams {
            max_depth: WEB_MAX_DEPTH,
            include_pdfs: WEB_INCLUDE_PDFS,
            ignore_epubs: WEB_IGNORE_EPUBS,
            timeout_secs: 5,
        })
        .unwrap()
        .allow_localhost();
        let dispatcher = test_dispatcher().with_crawler(crawler);

        let seed = format!("{}/", server.uri());
        let outcome = dispatcher.dispatch(&seed, SourceKind::WebPage).await.unwrap();

        assert!(outcome.text.contains("landing page"));
        assert_eq!(outcome.processed_urls, Some(vec![seed]));
    }

    #[tokio::test]
    async fn crawl_depth_is_fixed_at_two() {
        let server = MockServer::start().await;

        let page = |next: &str| {
            format!("<html><body><a href=\"{next}\">next</a></body></html>")
        };
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(page("/d1"), "text/html"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/d1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(page("/d2"), "text/html"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/d2"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(page("/d3"), "text/html"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/d3"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(page("/d4"), "text/html"))
            .mount(&server)
            .await;

        let crawler = Crawler::new(CrawlParams {
            max_depth: WEB_MAX_DEPTH,
            include_pdfs: WEB_INCLUDE_PDFS,
            ignore_epubs: WEB_IGNORE_EPUBS,
            timeout_secs: 5,
        })
        .unwrap()
        .allow_localhost();
        let dispatcher = test_dispatcher().with_crawler(crawler);

        let seed = format!("{}/", server.uri());
        let outcome = dispatcher.dispatch(&seed, SourceKind::WebPage).await.unwrap();

        // Depth 0, 1, and 2 are visited; the link found at depth 2 is not
        // followed.
        let processed = outcome.processed_urls.unwrap();
        assert_eq!(
            processed,
            vec![
                seed.clone(),
                format!("{}/d1", server.uri()),
                format!("{}/d2", server.uri()),
            ]
        );
    }

    #[tokio::test]
    async fn invalid_seed_is_a_source_error() {
        let dispatcher = test_dispatcher();

        let err = dispatcher
            .dispatch("ht!tp://broken", SourceKind::WebPage)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FunnelError::Source {
                kind: SourceKind::WebPage,
                ..
            }
        ));
    }
}
