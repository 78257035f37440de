//! Scholarly identifier extraction: DOIs via Crossref, PMIDs via the NCBI
//! efetch endpoint.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use contextfunnel_shared::{FunnelError, Result, ScholarlyConfig, SourceKind};

use crate::extractor::SourceExtractor;

/// Crossref abstracts arrive wrapped in JATS markup (`<jats:p>` and friends).
static JATS_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new("<[^>]+>").expect("valid regex"));

#[derive(Deserialize)]
struct CrossrefResponse {
    message: CrossrefWork,
}

#[derive(Deserialize)]
struct CrossrefWork {
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<CrossrefAuthor>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    #[serde(rename = "abstract", default)]
    summary: Option<String>,
    #[serde(rename = "DOI", default)]
    doi: Option<String>,
}

#[derive(Deserialize)]
struct CrossrefAuthor {
    #[serde(default)]
    given: Option<String>,
    #[serde(default)]
    family: Option<String>,
}

pub struct ScholarlyExtractor {
    client: Client,
    crossref_base: String,
    ncbi_base: String,
}

impl ScholarlyExtractor {
    pub fn new(client: Client, config: &ScholarlyConfig) -> Self {
        Self {
            client,
            crossref_base: config.crossref_base.trim_end_matches('/').to_string(),
            ncbi_base: config.ncbi_base.trim_end_matches('/').to_string(),
        }
    }

    async fn extract_doi(&self, doi: &str) -> Result<String> {
        let kind = SourceKind::ScholarlyId;
        let url = format!("{}/works/{doi}", self.crossref_base);
        debug!(%url, "querying Crossref");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FunnelError::source(kind, format!("{url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FunnelError::source(kind, format!("{url}: HTTP {status}")));
        }
        let payload: CrossrefResponse = response
            .json()
            .await
            .map_err(|e| FunnelError::source(kind, format!("{url}: malformed response: {e}")))?;

        Ok(render_crossref(doi, &payload.message))
    }

    async fn extract_pmid(&self, pmid: &str) -> Result<String> {
        let kind = SourceKind::ScholarlyId;
        let url = format!("{}/entrez/eutils/efetch.fcgi", self.ncbi_base);
        debug!(%url, pmid, "querying NCBI efetch");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("db", "pubmed"),
                ("id", pmid),
                ("rettype", "abstract"),
                ("retmode", "text"),
            ])
            .send()
            .await
            .map_err(|e| FunnelError::source(kind, format!("{url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FunnelError::source(kind, format!("{url}: HTTP {status}")));
        }
        let body = response
            .text()
            .await
            .map_err(|e| FunnelError::source(kind, format!("{url}: body read failed: {e}")))?;

        let text = body.trim();
        if text.is_empty() {
            return Err(FunnelError::source(
                kind,
                format!("no abstract returned for PMID {pmid}"),
            ));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl SourceExtractor for ScholarlyExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::ScholarlyId
    }

    fn name(&self) -> &str {
        "scholarly-id"
    }

    async fn extract(&self, reference: &str) -> Result<String> {
        let text = if reference.starts_with("10.") {
            self.extract_doi(reference).await?
        } else {
            self.extract_pmid(reference).await?
        };
        info!(reference, "scholarly record extracted");
        Ok(text)
    }
}

fn render_crossref(reference: &str, work: &CrossrefWork) -> String {
    let title = work
        .title
        .first()
        .map(String::as_str)
        .unwrap_or("(untitled)");
    let mut buffer = format!("# {title}\n\n");

    let authors: Vec<String> = work
        .author
        .iter()
        .filter_map(|author| {
            let name = [author.given.as_deref(), author.family.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            (!name.is_empty()).then_some(name)
        })
        .collect();
    if !authors.is_empty() {
        buffer.push_str(&format!("Authors: {}\n", authors.join(", ")));
    }
    if let Some(journal) = work.container_title.first() {
        buffer.push_str(&format!("Journal: {journal}\n"));
    }
    let doi = work.doi.as_deref().unwrap_or(reference);
    buffer.push_str(&format!("DOI: {doi}\n"));

    if let Some(summary) = &work.summary {
        let plain = JATS_TAG_RE.replace_all(summary, "");
        let plain = plain.trim();
        if !plain.is_empty() {
            buffer.push('\n');
            buffer.push_str(plain);
            buffer.push('\n');
        }
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_extractor(server: &MockServer) -> ScholarlyExtractor {
        let config = ScholarlyConfig {
            crossref_base: server.uri(),
            ncbi_base: server.uri(),
        };
        ScholarlyExtractor::new(Client::new(), &config)
    }

    #[test]
    fn crossref_rendering_strips_jats_markup() {
        let work = CrossrefWork {
            title: vec!["KDOQI Commentary".into()],
            author: vec![
                CrossrefAuthor {
                    given: Some("Ana".into()),
                    family: Some("Ortiz".into()),
                },
                CrossrefAuthor {
                    given: None,
                    family: Some("Chen".into()),
                },
            ],
            container_title: vec!["AJKD".into()],
            summary: Some("<jats:p>Plain abstract text.</jats:p>".into()),
            doi: Some("10.1053/j.ajkd.2017.08.002".into()),
        };
        let text = render_crossref("10.1053/j.ajkd.2017.08.002", &work);

        assert!(text.starts_with("# KDOQI Commentary\n\n"));
        assert!(text.contains("Authors: Ana Ortiz, Chen\n"));
        assert!(text.contains("Journal: AJKD\n"));
        assert!(text.contains("DOI: 10.1053/j.ajkd.2017.08.002\n"));
        assert!(text.contains("\nPlain abstract text.\n"));
        assert!(!text.contains("jats"));
    }

    #[tokio::test]
    async fn doi_references_query_crossref() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/works/10.1053/j.ajkd.2017.08.002"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {
                    "title": ["A Study"],
                    "author": [{"given": "Jo", "family": "Doe"}],
                    "container-title": ["Journal of Studies"],
                    "abstract": "<jats:p>Findings.</jats:p>",
                    "DOI": "10.1053/j.ajkd.2017.08.002"
                }
            })))
            .mount(&server)
            .await;

        let extractor = test_extractor(&server);
        let text = extractor.extract("10.1053/j.ajkd.2017.08.002").await.unwrap();

        assert!(text.contains("# A Study"));
        assert!(text.contains("Authors: Jo Doe"));
        assert!(text.contains("Findings."));
    }

    #[tokio::test]
    async fn pmid_references_query_ncbi() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/entrez/eutils/efetch.fcgi"))
            .and(query_param("db", "pubmed"))
            .and(query_param("id", "34557778"))
            .and(query_param("rettype", "abstract"))
            .and(query_param("retmode", "text"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("1. Journal. 2021.\n\nAbstract body.\n", "text/plain"),
            )
            .mount(&server)
            .await;

        let extractor = test_extractor(&server);
        let text = extractor.extract("34557778").await.unwrap();

        assert_eq!(text, "1. Journal. 2021.\n\nAbstract body.");
    }

    #[tokio::test]
    async fn empty_pubmed_body_is_a_source_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/entrez/eutils/efetch.fcgi"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("\n\n", "text/plain"))
            .mount(&server)
            .await;

        let extractor = test_extractor(&server);
        let err = extractor.extract("40000000").await.unwrap_err();

        assert!(matches!(
            err,
            FunnelError::Source {
                kind: SourceKind::ScholarlyId,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unknown_doi_is_a_source_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/works/10.9999/unknown"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let extractor = test_extractor(&server);
        let err = extractor.extract("10.9999/unknown").await.unwrap_err();

        assert!(err.to_string().contains("HTTP 404"));
    }
}
