//! Per-source content selection.
//!
//! Each [`SourceKind`] maps to one [`Strategy`] variant. A strategy knows how
//! long to wait for its page to render, how to locate and clean the article
//! container in a snapshot, and which CSS overrides the final document needs.
//! Noise removal is data: every strategy keeps its strip list as a selector
//! array applied through [`crate::dom::strip`].

pub mod generic;
pub mod medium;
pub mod x;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::Result;
use crate::dom;
use crate::page::Page;
use crate::parse::Document;
use crate::readability::ArticleReader;
use crate::source::SourceKind;
use crate::theme::Theme;

pub use generic::GenericStrategy;
pub use medium::MediumStrategy;
pub use x::XStrategy;

/// The article as a strategy extracted it.
///
/// Only the image inliner changes it afterwards, and only the image
/// references inside `html`, `styles` and `featured_image`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionResult {
    /// Cleaned article markup.
    pub html: String,
    /// Captured page CSS, possibly empty.
    pub styles: String,
    pub title: String,
    /// Author name, empty when unknown.
    pub byline: String,
    pub site_name: String,
    pub theme: Theme,
    pub featured_image: Option<String>,
    /// Whether `html` already starts with a synthesized title/image/byline header.
    pub header_included: bool,
}

/// Timeouts for the render waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waits {
    /// Bound for waits whose failure aborts the run.
    pub essential: Duration,
    /// Bound for best-effort waits.
    pub soft: Duration,
    /// Overrides each strategy's own settle delay.
    pub settle: Option<Duration>,
}

impl Default for Waits {
    fn default() -> Self {
        Self { essential: Duration::from_secs(30), soft: Duration::from_secs(15), settle: None }
    }
}

impl Waits {
    fn settle_or(&self, default: Duration) -> Duration {
        self.settle.unwrap_or(default)
    }
}

/// Content selection strategy for one source kind.
#[derive(Debug, Clone)]
pub enum Strategy {
    X(XStrategy),
    Medium(MediumStrategy),
    Generic(GenericStrategy),
}

impl Strategy {
    /// The strategy for `kind`. `reader` replaces the bundled readability
    /// engine in the Generic strategy.
    pub fn for_source(kind: SourceKind, reader: Option<Arc<dyn ArticleReader>>) -> Self {
        match kind {
            SourceKind::X => Strategy::X(XStrategy),
            SourceKind::Medium => Strategy::Medium(MediumStrategy),
            SourceKind::Generic => Strategy::Generic(match reader {
                Some(reader) => GenericStrategy::with_reader(reader),
                None => GenericStrategy::new(),
            }),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Strategy::X(_) => SourceKind::X,
            Strategy::Medium(_) => SourceKind::Medium,
            Strategy::Generic(_) => SourceKind::Generic,
        }
    }

    /// Waits until the page has rendered enough to extract.
    ///
    /// # Errors
    ///
    /// Only essential waits fail, with [`crate::XtractorError::Timeout`].
    pub async fn wait_for_content(&self, page: &dyn Page, waits: &Waits) -> Result<()> {
        match self {
            Strategy::X(s) => s.wait_for_content(page, waits).await,
            Strategy::Medium(s) => {
                s.wait_for_content(page, waits).await;
                Ok(())
            }
            Strategy::Generic(s) => {
                s.wait_for_content(page, waits).await;
                Ok(())
            }
        }
    }

    /// Extracts the article from a snapshot.
    ///
    /// Relative links and image sources are resolved against the document URL.
    pub fn extract(&self, doc: &Document) -> Result<ExtractionResult> {
        let mut result = match self {
            Strategy::X(s) => s.extract(doc)?,
            Strategy::Medium(s) => s.extract(doc)?,
            Strategy::Generic(s) => s.extract(doc)?,
        };

        if let Some(base) = doc.base_url() {
            result.html = dom::absolutize_urls(&result.html, base);
        }

        tracing::debug!(
            source = %self.kind().as_str(),
            bytes = result.html.len(),
            styles = result.styles.len(),
            "content extracted"
        );
        Ok(result)
    }

    /// Source-specific overrides appended after the captured styles.
    pub fn extra_css(&self) -> &'static str {
        match self {
            Strategy::X(_) => x::EXTRA_CSS,
            Strategy::Medium(_) => medium::EXTRA_CSS,
            Strategy::Generic(_) => generic::EXTRA_CSS,
        }
    }

    /// Element whose computed style defines the theme.
    pub fn theme_selector(&self) -> &'static str {
        match self {
            Strategy::X(_) => x::TWEET_CONTAINER,
            Strategy::Medium(_) | Strategy::Generic(_) => "body",
        }
    }

    /// Whether the page's stylesheets are carried into the document.
    pub fn captures_stylesheets(&self) -> bool {
        matches!(self, Strategy::X(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::StaticPage;

    #[test]
    fn test_for_source_dispatch() {
        for kind in [SourceKind::X, SourceKind::Medium, SourceKind::Generic] {
            assert_eq!(Strategy::for_source(kind, None).kind(), kind);
        }
    }

    #[test]
    fn test_extra_css_per_source() {
        assert!(Strategy::for_source(SourceKind::X, None).extra_css().contains("max-width: 600px"));
        assert!(Strategy::for_source(SourceKind::Medium, None).extra_css().contains("figcaption"));
        assert!(Strategy::for_source(SourceKind::Generic, None).extra_css().contains(".x-tractor-byline"));
    }

    #[test]
    fn test_only_x_captures_stylesheets() {
        assert!(Strategy::for_source(SourceKind::X, None).captures_stylesheets());
        assert!(!Strategy::for_source(SourceKind::Medium, None).captures_stylesheets());
        assert!(!Strategy::for_source(SourceKind::Generic, None).captures_stylesheets());
        assert_eq!(Strategy::for_source(SourceKind::X, None).theme_selector(), "[data-testid=\"tweet\"]");
    }

    #[test]
    fn test_extract_resolves_relative_urls() {
        let html = r#"<html><body><article><p>Text</p><img src="/media/a.png"></article></body></html>"#;
        let doc = Document::parse_with_url(html, "https://medium.com/@a/post").unwrap();

        let result = Strategy::for_source(SourceKind::Medium, None).extract(&doc).unwrap();

        assert!(result.html.contains(r#"src="https://medium.com/media/a.png""#));
    }

    #[tokio::test]
    async fn test_soft_waits_never_fail() {
        let page = StaticPage::new("<html><body><p>No article</p></body></html>");
        let waits = Waits::default();

        assert!(Strategy::for_source(SourceKind::Medium, None).wait_for_content(&page, &waits).await.is_ok());
        assert!(Strategy::for_source(SourceKind::Generic, None).wait_for_content(&page, &waits).await.is_ok());
        assert!(Strategy::for_source(SourceKind::X, None).wait_for_content(&page, &waits).await.is_err());
    }
}
