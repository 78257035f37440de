//! Input reference classification.
//!
//! A reference is an opaque string: a GitHub URL, an arXiv link, a DOI, a
//! bare PubMed id, a local path. Classification assigns exactly one
//! [`SourceKind`] by walking an ordered rule table, first match wins. The
//! matching is deliberately substring-based: a reference containing
//! `github.com` anywhere (even inside a query parameter) classifies as a
//! GitHub reference. The fired rule name is carried on the result so that
//! ambiguity stays auditable.

use tracing::debug;
use url::Url;

use contextfunnel_shared::SourceKind;

/// Result of classifying an input reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The kind the reference resolved to.
    pub kind: SourceKind,
    /// Name of the rule that fired.
    pub rule: &'static str,
}

/// One entry of the rule table: a predicate deciding whether the rule
/// claims the reference, and a resolver picking the kind within the rule.
struct Rule {
    name: &'static str,
    matches: fn(&str) -> bool,
    resolve: fn(&str) -> SourceKind,
}

/// Precedence-ordered rule table. Later rules never see a reference an
/// earlier rule claimed.
static RULES: &[Rule] = &[
    Rule {
        name: "github-host",
        matches: |reference| reference.contains("github.com"),
        resolve: |reference| {
            if reference.contains("/pull/") {
                SourceKind::PullRequest
            } else if reference.contains("/issues/") {
                SourceKind::Issue
            } else {
                SourceKind::Repo
            }
        },
    },
    Rule {
        name: "http-url",
        matches: is_http_url,
        resolve: |reference| {
            if reference.contains("youtube.com") || reference.contains("youtu.be") {
                SourceKind::Video
            } else if reference.contains("arxiv.org") {
                SourceKind::Arxiv
            } else {
                SourceKind::WebPage
            }
        },
    },
    Rule {
        name: "scholarly-id",
        matches: |reference| {
            (reference.starts_with("10.") && reference.contains('/'))
                || (!reference.is_empty() && reference.bytes().all(|b| b.is_ascii_digit()))
        },
        resolve: |_| SourceKind::ScholarlyId,
    },
];

/// Classify an input reference.
///
/// Total: every reference resolves to some kind, possibly the wrong one
/// when a substring match is ambiguous. Anything no rule claims is treated
/// as a local path.
pub fn classify(reference: &str) -> Classification {
    for rule in RULES {
        if (rule.matches)(reference) {
            let kind = (rule.resolve)(reference);
            debug!(rule = rule.name, kind = %kind, "classified reference");
            return Classification {
                kind,
                rule: rule.name,
            };
        }
    }

    debug!(rule = "local-path", "classified reference");
    Classification {
        kind: SourceKind::LocalPath,
        rule: "local-path",
    }
}

fn is_http_url(reference: &str) -> bool {
    match Url::parse(reference) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}
