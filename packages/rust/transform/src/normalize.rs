//! Normalization pipeline producing the compressed artifact.
//!
//! Each pass is a function `&str -> String` applied in sequence. Every pass
//! is non-increasing in both character count and word count, so the
//! compressed text can never estimate to more tokens than its source.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full normalization pipeline on raw extracted text.
pub fn compress_text(text: &str) -> String {
    let mut result = normalize_newlines(text);

    result = strip_nonprinting(&result);
    result = collapse_inline_space(&result);
    result = trim_lines(&result);
    result = drop_decoration_lines(&result);
    result = dedupe_consecutive_lines(&result);
    result = collapse_blank_lines(&result);

    result.trim().to_string()
}

// ---------------------------------------------------------------------------
// Pass 1: Normalize line endings
// ---------------------------------------------------------------------------

/// Convert CRLF and bare CR line endings to LF.
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

// ---------------------------------------------------------------------------
// Pass 2: Strip non-printing characters
// ---------------------------------------------------------------------------

/// Remove control characters (except newline and tab) and zero-width marks.
fn strip_nonprinting(text: &str) -> String {
    text.chars()
        .filter(|c| {
            if *c == '\n' || *c == '\t' {
                return true;
            }
            if c.is_control() {
                return false;
            }
            !matches!(c, '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}')
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Pass 3: Collapse inline whitespace
// ---------------------------------------------------------------------------

/// Collapse runs of spaces and tabs within a line into a single space.
fn collapse_inline_space(text: &str) -> String {
    static INLINE_WS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));

    INLINE_WS_RE.replace_all(text, " ").to_string()
}

// ---------------------------------------------------------------------------
// Pass 4: Trim line edges
// ---------------------------------------------------------------------------

/// Strip leading and trailing whitespace from every line.
fn trim_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 5: Drop decoration lines
// ---------------------------------------------------------------------------

/// Drop lines with no alphanumeric content (separator rules, stray
/// punctuation rows). Blank lines survive to the blank-line pass.
fn drop_decoration_lines(text: &str) -> String {
    text.lines()
        .filter(|line| line.is_empty() || line.chars().any(char::is_alphanumeric))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 6: Dedupe consecutive lines
// ---------------------------------------------------------------------------

/// Remove immediate repeats of the same non-blank line (repeated nav labels,
/// duplicated headings from adjacent pages).
fn dedupe_consecutive_lines(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();

    for line in text.lines() {
        if !line.is_empty() && out.last() == Some(&line) {
            continue;
        }
        out.push(line);
    }

    out.join("\n")
}

// ---------------------------------------------------------------------------
// Pass 7: Collapse blank lines
// ---------------------------------------------------------------------------

/// Collapse every run of blank lines into a single newline.
fn collapse_blank_lines(text: &str) -> String {
    static BLANK_RUN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid regex"));

    BLANK_RUN_RE.replace_all(text, "\n").to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
