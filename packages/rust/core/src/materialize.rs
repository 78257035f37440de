//! Turns extracted text into the run's output artifacts.
//!
//! Every run gets the raw text verbatim plus a normalized copy, each with a
//! token count. Webpage runs additionally persist the visited-URL list.

use tracing::{debug, instrument};

use contextfunnel_artifacts::{
    ArtifactMeta, ArtifactStore, COMPRESSED_NAME, PROCESSED_URLS_NAME, UNCOMPRESSED_NAME,
};
use contextfunnel_shared::{Result, RunId};
use contextfunnel_transform::{TokenCounter, compress_text};

/// Artifact metadata and token counts for one materialized run.
#[derive(Debug)]
pub struct Materialized {
    pub uncompressed_tokens: usize,
    pub compressed_tokens: usize,
    pub artifacts: Vec<ArtifactMeta>,
}

/// Write the raw and compressed artifacts for `run` and count tokens for
/// each. The compression passes never grow the text, so the compressed count
/// is at most the uncompressed count.
#[instrument(skip_all, fields(run = %run, bytes = raw_text.len()))]
pub fn materialize(
    run: RunId,
    raw_text: &str,
    store: &ArtifactStore,
    counter: &dyn TokenCounter,
) -> Result<Materialized> {
    let compressed = compress_text(raw_text);

    let uncompressed_tokens = counter.count(raw_text);
    let compressed_tokens = counter.count(&compressed);

    let artifacts = vec![
        store.put(run, UNCOMPRESSED_NAME, raw_text.as_bytes())?,
        store.put(run, COMPRESSED_NAME, compressed.as_bytes())?,
    ];

    debug!(uncompressed_tokens, compressed_tokens, "artifacts written");

    Ok(Materialized {
        uncompressed_tokens,
        compressed_tokens,
        artifacts,
    })
}

/// Persist a crawl's visited URLs, newline-joined in visitation order.
pub fn write_url_list(run: RunId, urls: &[String], store: &ArtifactStore) -> Result<ArtifactMeta> {
    store.put(run, PROCESSED_URLS_NAME, urls.join("\n").as_bytes())
}
