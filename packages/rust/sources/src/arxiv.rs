//! arXiv paper extraction: abstract URLs are mapped to their PDF and the
//! PDF text is pulled out.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use contextfunnel_shared::{FunnelError, Result, SourceKind};
use contextfunnel_transform::PdfTextExtractor;

use crate::extractor::SourceExtractor;

pub struct ArxivExtractor {
    client: Client,
    pdf: Arc<dyn PdfTextExtractor>,
}

impl ArxivExtractor {
    pub fn new(client: Client, pdf: Arc<dyn PdfTextExtractor>) -> Self {
        Self { client, pdf }
    }
}

#[async_trait]
impl SourceExtractor for ArxivExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::Arxiv
    }

    fn name(&self) -> &str {
        "arxiv"
    }

    async fn extract(&self, reference: &str) -> Result<String> {
        let kind = self.kind();
        // Abstract pages live at /abs/<id>; the PDF is served at /pdf/<id>.
        let pdf_url = if reference.contains("/abs/") {
            reference.replace("/abs/", "/pdf/")
        } else {
            reference.to_string()
        };
        debug!(%pdf_url, "fetching arXiv PDF");

        let response = self
            .client
            .get(&pdf_url)
            .send()
            .await
            .map_err(|e| FunnelError::source(kind, format!("{pdf_url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FunnelError::source(
                kind,
                format!("{pdf_url}: HTTP {status}"),
            ));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FunnelError::source(kind, format!("{pdf_url}: body read failed: {e}")))?;

        let text = self
            .pdf
            .extract_text(&bytes)
            .map_err(|e| FunnelError::source(kind, e.to_string()))?;
        info!(%pdf_url, bytes = bytes.len(), "arXiv paper extracted");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StubPdf;

    impl PdfTextExtractor for StubPdf {
        fn extract_text(&self, _bytes: &[u8]) -> Result<String> {
            Ok("Stubbed paper body.".into())
        }
    }

    #[tokio::test]
    async fn abstract_urls_are_rewritten_to_pdf() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/pdf/2401.14295"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
            )
            .mount(&server)
            .await;

        let extractor = ArxivExtractor::new(Client::new(), Arc::new(StubPdf));
        let reference = format!("{}/abs/2401.14295", server.uri());
        let text = extractor.extract(&reference).await.unwrap();

        assert_eq!(text, "Stubbed paper body.");
    }

    #[tokio::test]
    async fn missing_paper_is_a_source_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/pdf/9999.00000"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let extractor = ArxivExtractor::new(Client::new(), Arc::new(StubPdf));
        let reference = format!("{}/pdf/9999.00000", server.uri());
        let err = extractor.extract(&reference).await.unwrap_err();

        assert!(matches!(
            err,
            FunnelError::Source {
                kind: SourceKind::Arxiv,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn unreadable_pdf_is_a_source_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/pdf/2401.14295"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"not a pdf".to_vec(), "application/pdf"),
            )
            .mount(&server)
            .await;

        let extractor = ArxivExtractor::new(
            Client::new(),
            Arc::new(contextfunnel_transform::PdfTextDefault),
        );
        let reference = format!("{}/abs/2401.14295", server.uri());
        let err = extractor.extract(&reference).await.unwrap_err();

        assert!(matches!(
            err,
            FunnelError::Source {
                kind: SourceKind::Arxiv,
                ..
            }
        ));
    }
}
