//! Source detection.
//!
//! Maps a page URL (and, where the DOM is available, its meta tags) to one of
//! the closed set of [`SourceKind`]s. Classification never fails: anything
//! that cannot be recognised, including malformed URLs, is [`SourceKind::Generic`].

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use url::Url;

use crate::parse::Document;

const X_DOMAINS: &[&str] = &["x.com", "twitter.com"];
const MEDIUM_DOMAINS: &[&str] = &["medium.com"];

/// The kind of page being extracted. Derived once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// X (formerly Twitter) posts and articles.
    X,
    /// Medium stories, including custom-domain publications.
    Medium,
    /// Any other web page.
    Generic,
}

impl SourceKind {
    /// Human-readable label used in progress output.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::X => "X (Twitter)",
            SourceKind::Medium => "Medium",
            SourceKind::Generic => "Web",
        }
    }

    /// Short machine name, the inverse of [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::X => "x",
            SourceKind::Medium => "medium",
            SourceKind::Generic => "generic",
        }
    }

    /// Whether extraction needs a stored session.
    pub fn requires_session(&self) -> bool {
        matches!(self, SourceKind::X)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x" | "twitter" => Ok(Self::X),
            "medium" => Ok(Self::Medium),
            "generic" | "web" => Ok(Self::Generic),
            _ => Err(format!("Invalid source: {}. Valid options: x, medium, generic", s)),
        }
    }
}

/// Classify a page from its URL and, when given, its DOM.
///
/// Rules, first match wins:
/// 1. host is `x.com`/`twitter.com` or a subdomain → X
/// 2. host is `medium.com` or a subdomain → Medium
/// 3. with a DOM: a `generator` meta mentioning "medium", or the Medium
///    Android app-link meta → Medium
/// 4. otherwise → Generic
pub fn classify(url: &str, doc: Option<&Document>) -> SourceKind {
    let by_host = classify_url(url);
    if by_host != SourceKind::Generic {
        return by_host;
    }

    match doc {
        Some(doc) if has_medium_markers(doc) => SourceKind::Medium,
        _ => SourceKind::Generic,
    }
}

/// Classify from the URL alone.
pub fn classify_url(url: &str) -> SourceKind {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return SourceKind::Generic;
    };
    let Some(host) = parsed.host_str() else {
        return SourceKind::Generic;
    };
    let host = host.trim_end_matches('.').to_lowercase();

    if X_DOMAINS.iter().any(|domain| host_matches(&host, domain)) {
        SourceKind::X
    } else if MEDIUM_DOMAINS.iter().any(|domain| host_matches(&host, domain)) {
        SourceKind::Medium
    } else {
        SourceKind::Generic
    }
}

/// `host` equals `domain` or is one of its subdomains.
fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.strip_suffix(domain).is_some_and(|prefix| prefix.ends_with('.'))
}

fn has_medium_markers(doc: &Document) -> bool {
    let generator = doc
        .first_attr("meta[name=\"generator\"]", "content")
        .is_some_and(|content| content.to_lowercase().contains("medium"));

    generator || doc.exists("meta[property=\"al:android:package\"][content=\"com.medium.reader\"]")
}
