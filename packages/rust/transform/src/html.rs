//! Readable-text extraction from HTML pages.
//!
//! Converts fetched HTML to Markdown-flavored plain text using the `htmd`
//! crate, skipping page chrome, then tidies the result.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use contextfunnel_shared::{FunnelError, Result};

/// Extract readable text from an HTML document.
///
/// Scripts, styles, navigation, and similar chrome are skipped; the rest is
/// converted to Markdown-flavored text so structure (headings, lists, code)
/// survives for the language model.
pub fn html_to_text(html: &str) -> Result<String> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec![
            "script", "style", "nav", "header", "footer", "aside", "iframe", "noscript", "svg",
            "form",
        ])
        .build();

    let text = converter
        .convert(html)
        .map_err(|e| FunnelError::Transform(format!("html conversion failed: {e}")))?;

    debug!(raw_len = html.len(), text_len = text.len(), "html converted");

    Ok(tidy(&text))
}

/// Light tidy applied to converted text: trailing-space trim, blank-run
/// collapse, single trailing newline. The heavy normalization lives in
/// [`crate::compress_text`] and runs only on the compressed artifact.
fn tidy(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let trimmed_lines = text
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    let collapsed = MULTI_BLANK_RE.replace_all(&trimmed_lines, "\n\n");
    let body = collapsed.trim_matches('\n');

    if body.is_empty() {
        String::new()
    } else {
        format!("{body}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_body_text() {
        let html = "<html><body><h1>Hello World</h1><p>Some text.</p></body></html>";
        let text = html_to_text(html).unwrap();
        assert!(text.contains("Hello World"));
        assert!(text.contains("Some text."));
    }

    #[test]
    fn skips_scripts_and_styles() {
        let html = r#"<html><head><style>body { color: red; }</style></head><body>
            <script>console.log("tracking");</script>
            <p>Visible paragraph.</p>
        </body></html>"#;

        let text = html_to_text(html).unwrap();
        assert!(text.contains("Visible paragraph."));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn skips_nav_and_footer_chrome() {
        let html = r#"<html><body>
            <nav><a href="/">Home</a><a href="/docs">Docs</a></nav>
            <main><p>Important content.</p></main>
            <footer>Copyright 2025</footer>
        </body></html>"#;

        let text = html_to_text(html).unwrap();
        assert!(text.contains("Important content."));
        assert!(!text.contains("Copyright 2025"));
    }

    #[test]
    fn output_ends_with_single_newline() {
        let html = "<html><body><p>One.</p><p>Two.</p></body></html>";
        let text = html_to_text(html).unwrap();
        assert!(text.ends_with('\n'));
        assert!(!text.ends_with("\n\n"));
    }

    #[test]
    fn empty_document_yields_empty_text() {
        let text = html_to_text("<html><body></body></html>").unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn collapses_blank_runs() {
        let html = "<html><body><p>A</p><br><br><br><br><p>B</p></body></html>";
        let text = html_to_text(html).unwrap();
        assert!(!text.contains("\n\n\n"));
    }
}
