//! YouTube transcript extraction.
//!
//! Scrapes the caption track list out of the watch page's embedded player
//! response, then pulls the first track's timedtext XML and flattens it to
//! plain lines.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use contextfunnel_shared::{FunnelError, Result, SourceKind};

use crate::extractor::SourceExtractor;

const CAPTION_MARKER: &str = "\"captionTracks\":";

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new("<[^>]+>").expect("valid regex"));

#[derive(Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: Option<String>,
}

pub struct VideoExtractor {
    client: Client,
}

impl VideoExtractor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FunnelError::source(SourceKind::Video, format!("{url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FunnelError::source(
                SourceKind::Video,
                format!("{url}: HTTP {status}"),
            ));
        }
        response.text().await.map_err(|e| {
            FunnelError::source(SourceKind::Video, format!("{url}: body read failed: {e}"))
        })
    }
}

#[async_trait]
impl SourceExtractor for VideoExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::Video
    }

    fn name(&self) -> &str {
        "youtube-transcript"
    }

    async fn extract(&self, reference: &str) -> Result<String> {
        let page = self.get_text(reference).await?;
        let tracks = parse_caption_tracks(&page)?;
        let track = tracks.first().ok_or_else(|| {
            FunnelError::source(SourceKind::Video, "no caption tracks for this video")
        })?;
        debug!(
            language = track.language_code.as_deref().unwrap_or("unknown"),
            "caption track selected"
        );

        let xml = self.get_text(&track.base_url).await?;
        let text = caption_xml_to_text(&xml);
        if text.is_empty() {
            return Err(FunnelError::source(
                SourceKind::Video,
                "caption track was empty",
            ));
        }
        info!(lines = text.lines().count(), "transcript extracted");
        Ok(text)
    }
}

/// Locate the caption track array inside the watch page. The player response
/// is a JS object literal, so the array is parsed as a single JSON value and
/// everything after its closing bracket is ignored.
fn parse_caption_tracks(page: &str) -> Result<Vec<CaptionTrack>> {
    let start = page.find(CAPTION_MARKER).ok_or_else(|| {
        FunnelError::source(SourceKind::Video, "no caption tracks for this video")
    })?;
    let rest = &page[start + CAPTION_MARKER.len()..];
    let mut deserializer = serde_json::Deserializer::from_str(rest);
    Vec::<CaptionTrack>::deserialize(&mut deserializer).map_err(|e| {
        FunnelError::source(SourceKind::Video, format!("malformed caption track list: {e}"))
    })
}

/// Flatten timedtext XML into one transcript line per cue.
fn caption_xml_to_text(xml: &str) -> String {
    let broken = xml.replace("</text>", "\n");
    let stripped = TAG_RE.replace_all(&broken, "");
    let decoded = decode_entities(&stripped);
    decoded
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Timedtext escapes entities twice (`&amp;#39;` for an apostrophe), so the
/// ampersand pass runs first.
fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}
