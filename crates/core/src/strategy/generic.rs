//! Arbitrary web pages.
//!
//! Extraction runs a chain: the [`ArticleReader`] first, then a selector
//! heuristic when the reader is unavailable or finds nothing. The heuristic
//! is deliberately weak. Its last resort is the largest `div`/`section` with
//! at least two paragraphs, which can land on a comment thread or a link
//! farm on some layouts.

use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;

use crate::dom;
use crate::page::{Page, PageCondition, soft_wait};
use crate::parse::{Document, Element};
use crate::readability::{ArticleReader, Readability, ReadableArticle};
use crate::source::SourceKind;
use crate::strategy::{ExtractionResult, Waits};
use crate::theme::Theme;
use crate::{Result, XtractorError};

static LEADING_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^<h1[\s>]").expect("leading heading pattern should compile"));

/// Likely content roots, most specific first.
const CONTAINERS: &[&str] = &[
    "article",
    "[role=\"article\"]",
    "main article",
    "main",
    ".post-content",
    ".entry-content",
    ".article-content",
    ".article-body",
    ".post-body",
    ".story-body",
    "#content",
    ".content",
];

const NOISE: &[&str] = &[
    "nav",
    "header",
    "footer",
    ".sidebar",
    ".ad",
    ".advertisement",
    ".social-share",
    ".comments",
    ".comment-section",
    "[role=\"navigation\"]",
    "[role=\"banner\"]",
    "[role=\"contentinfo\"]",
    "script",
    "style",
    "iframe[src*=\"ad\"]",
    ".newsletter-signup",
    ".related-posts",
    ".recommended",
];

const SETTLE: Duration = Duration::from_secs(2);

const FALLBACK_TITLE: &str = "Article";

pub(crate) const EXTRA_CSS: &str = r#"
    /* Readable defaults */
    figure { margin: 2em 0; }
    figure img { display: block; margin: 0 auto; }
    figcaption {
      text-align: center;
      font-size: 0.875em;
      opacity: 0.7;
      margin-top: 0.5em;
    }
    pre, code {
      font-family: 'SFMono-Regular', Consolas, 'Liberation Mono', Menlo, monospace;
    }
    pre {
      background: rgba(128,128,128,0.1);
      padding: 1em;
      border-radius: 4px;
      overflow-x: auto;
    }
    blockquote {
      border-left: 3px solid currentColor;
      margin-left: 0;
      padding-left: 1.5em;
      opacity: 0.85;
    }
    table {
      border-collapse: collapse;
      width: 100%;
      margin: 1em 0;
    }
    th, td {
      border: 1px solid rgba(128,128,128,0.3);
      padding: 0.5em 1em;
      text-align: left;
    }
    a { color: #1d9bf0; }
    .x-tractor-featured { margin: 0 0 1.5em 0; text-align: center; }
    .x-tractor-featured img { max-width: 100%; height: auto; border-radius: 4px; }
    .x-tractor-title { margin: 0 0 0.3em 0; line-height: 1.2; }
    .x-tractor-byline {
      opacity: 0.6;
      font-size: 0.9em;
      margin-bottom: 1.5em;
      padding-bottom: 1em;
      border-bottom: 1px solid rgba(128,128,128,0.3);
    }
"#;

/// Whether `html` opens with an `<h1>`, ignoring leading whitespace.
pub fn starts_with_heading(html: &str) -> bool {
    LEADING_HEADING.is_match(html.trim_start())
}

#[derive(Clone)]
pub struct GenericStrategy {
    reader: Arc<dyn ArticleReader>,
}

impl fmt::Debug for GenericStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericStrategy").finish_non_exhaustive()
    }
}

impl Default for GenericStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl GenericStrategy {
    /// Uses the bundled [`Readability`] engine.
    pub fn new() -> Self {
        Self { reader: Arc::new(Readability::new()) }
    }

    pub fn with_reader(reader: Arc<dyn ArticleReader>) -> Self {
        Self { reader }
    }

    pub(crate) async fn wait_for_content(&self, page: &dyn Page, waits: &Waits) {
        page.settle(waits.settle_or(SETTLE)).await;

        let images = PageCondition::ImagesLoaded { scope: "body".to_string() };
        soft_wait("page images", waits.soft, page.wait_for(&images, waits.soft)).await;
    }

    pub(crate) fn extract(&self, doc: &Document) -> Result<ExtractionResult> {
        let og_title = doc.meta_content("og:title");
        let meta_author = doc.meta_content("author");
        let site_name = doc.site_name().unwrap_or_default();
        let featured_image = featured_image(doc);

        if let Some(article) = self.read(doc) {
            let title = og_title
                .or(article.title)
                .or_else(|| doc.title())
                .unwrap_or_else(|| FALLBACK_TITLE.to_string());
            let byline = meta_author.or(article.byline).unwrap_or_default();

            let header = synthesize_header(featured_image.as_deref(), &title, &byline, &article.content);
            return Ok(ExtractionResult {
                html: format!("{header}{}", article.content),
                styles: String::new(),
                title,
                byline,
                site_name,
                theme: Theme::light(),
                featured_image,
                header_included: true,
            });
        }

        let root = heuristic_root(doc)?.ok_or(XtractorError::NoMainContentFound { kind: SourceKind::Generic })?;
        tracing::debug!(tag = %root.tag_name(), "heuristic content root");

        Ok(ExtractionResult {
            html: dom::strip(&root, NOISE),
            styles: String::new(),
            title: og_title.or_else(|| doc.title()).unwrap_or_else(|| FALLBACK_TITLE.to_string()),
            byline: meta_author.unwrap_or_default(),
            site_name,
            theme: Theme::light(),
            featured_image,
            header_included: false,
        })
    }

    /// Runs the reader. Failures and empty results both fall through to the heuristic.
    fn read(&self, doc: &Document) -> Option<ReadableArticle> {
        match self.reader.parse(doc) {
            Ok(Some(article)) if !article.content.trim().is_empty() => Some(article),
            Ok(_) => {
                tracing::debug!("reader found no confident content");
                None
            }
            Err(err) => {
                let err = match err {
                    err @ XtractorError::ReadabilityUnavailable(_) => err,
                    other => XtractorError::ReadabilityUnavailable(other.to_string()),
                };
                tracing::debug!(%err, "falling back to heuristic selection");
                None
            }
        }
    }
}

/// [`Document::featured_image`], resolved against the document URL.
fn featured_image(doc: &Document) -> Option<String> {
    let image = doc.featured_image()?;
    match doc.base_url() {
        Some(base) => base.join(&image).ok().map(String::from),
        None => Some(image),
    }
}

/// First fixed container, else the text-heaviest block holding at least two paragraphs.
fn heuristic_root(doc: &Document) -> Result<Option<Element<'_>>> {
    for selector in CONTAINERS {
        if let Some(found) = doc.select_first(selector)? {
            return Ok(Some(found));
        }
    }

    let mut best = None;
    let mut best_len = 0;
    for block in doc.select("div, section")? {
        let len = block.text().chars().count();
        if len > best_len && block.select("p")?.len() >= 2 {
            best_len = len;
            best = Some(block);
        }
    }
    Ok(best)
}

/// Featured image figure, title heading and byline placed above reader output.
fn synthesize_header(featured_image: Option<&str>, title: &str, byline: &str, content: &str) -> String {
    let mut header = String::new();

    if let Some(src) = featured_image {
        header.push_str(&format!(
            "<figure class=\"x-tractor-featured\"><img src=\"{}\" alt=\"\"></figure>",
            html_escape::encode_double_quoted_attribute(src)
        ));
    }
    if !title.is_empty() && !starts_with_heading(content) {
        header.push_str(&format!(
            "<h1 class=\"x-tractor-title\">{}</h1>",
            html_escape::encode_quoted_attribute(title)
        ));
    }
    if !byline.is_empty() {
        header.push_str(&format!(
            "<div class=\"x-tractor-byline\">{}</div>",
            html_escape::encode_quoted_attribute(byline)
        ));
    }

    if header.is_empty() { header } else { format!("<div class=\"x-tractor-header\">{header}</div>") }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedReader(Option<ReadableArticle>);

    impl ArticleReader for FixedReader {
        fn parse(&self, _doc: &Document) -> Result<Option<ReadableArticle>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenReader;

    impl ArticleReader for BrokenReader {
        fn parse(&self, _doc: &Document) -> Result<Option<ReadableArticle>> {
            Err(XtractorError::ReadabilityUnavailable("engine not loaded".to_string()))
        }
    }

    fn reader_returning(content: &str, title: Option<&str>, byline: Option<&str>) -> GenericStrategy {
        GenericStrategy::with_reader(Arc::new(FixedReader(Some(ReadableArticle {
            content: content.to_string(),
            title: title.map(str::to_string),
            byline: byline.map(str::to_string),
        }))))
    }

    fn heuristic_only() -> GenericStrategy {
        GenericStrategy::with_reader(Arc::new(BrokenReader))
    }

    const PAGE: &str = r#"<html><head>
        <title>Page title</title>
        <meta property="og:title" content="Foo">
        <meta property="og:image" content="/cover.jpg">
        </head><body>
        <header>Site header</header>
        <main><p>First paragraph.</p><p>Second paragraph.</p><img src="http://host/a.png"></main>
        <footer>Footer</footer>
        </body></html>"#;

    #[test]
    fn test_reader_output_gets_header() {
        let doc = Document::parse_with_url(PAGE, "https://blog.example.com/post").unwrap();
        let strategy = reader_returning("<div><p>Body</p></div>", Some("Reader title"), Some("Sam <Writer>"));

        let result = strategy.extract(&doc).unwrap();

        assert_eq!(result.title, "Foo");
        assert_eq!(result.byline, "Sam <Writer>");
        assert!(result.header_included);
        assert!(result.html.starts_with("<div class=\"x-tractor-header\"><figure class=\"x-tractor-featured\">"));
        assert!(result.html.contains(r#"<img src="https://blog.example.com/cover.jpg" alt="">"#));
        assert!(result.html.contains("<h1 class=\"x-tractor-title\">Foo</h1>"));
        assert!(result.html.contains("<div class=\"x-tractor-byline\">Sam &lt;Writer&gt;</div>"));
        assert!(result.html.ends_with("<div><p>Body</p></div>"));
        assert_eq!(result.featured_image.as_deref(), Some("https://blog.example.com/cover.jpg"));
        assert_eq!(result.site_name, "blog.example.com");
    }

    #[test]
    fn test_featured_image_falls_back_to_twitter_card() {
        let html = r#"<html><head><meta name="twitter:image" content="/card.png"></head><body></body></html>"#;
        let doc = Document::parse_with_url(html, "https://blog.example.com/post").unwrap();

        let result = reader_returning("<p>Body</p>", None, None).extract(&doc).unwrap();

        assert_eq!(result.featured_image.as_deref(), Some("https://blog.example.com/card.png"));
        assert!(result.html.contains(r#"<img src="https://blog.example.com/card.png" alt="">"#));
    }

    #[test]
    fn test_header_skips_title_when_content_has_heading() {
        let doc = Document::parse("<html><head><title>T</title></head><body></body></html>").unwrap();
        let strategy = reader_returning("  <H1 class=\"t\">Already</H1><p>Body</p>", None, None);

        let result = strategy.extract(&doc).unwrap();

        assert!(!result.html.contains("x-tractor-title"));
        assert!(!result.html.contains("x-tractor-header"));
        assert_eq!(result.title, "T");
    }

    #[test]
    fn test_title_and_byline_fallbacks() {
        let html = r#"<html><head><meta name="author" content="Meta Author"></head><body></body></html>"#;
        let doc = Document::parse(html).unwrap();

        let result = reader_returning("<p>Body</p>", Some("Reader title"), Some("Reader byline")).extract(&doc).unwrap();
        assert_eq!(result.title, "Reader title");
        assert_eq!(result.byline, "Meta Author");

        let result = reader_returning("<p>Body</p>", None, None).extract(&doc).unwrap();
        assert_eq!(result.title, "Article");
    }

    #[test]
    fn test_heuristic_after_reader_failure() {
        let doc = Document::parse_with_url(PAGE, "https://blog.example.com/post").unwrap();

        let result = heuristic_only().extract(&doc).unwrap();

        assert!(!result.header_included);
        assert!(result.html.starts_with("<main>"));
        assert!(result.html.contains("<p>First paragraph.</p><p>Second paragraph.</p>"));
        assert!(!result.html.contains("Site header"));
        assert_eq!(result.title, "Foo");
    }

    #[test]
    fn test_heuristic_when_reader_finds_nothing() {
        let doc = Document::parse(PAGE).unwrap();
        let strategy = GenericStrategy::with_reader(Arc::new(FixedReader(None)));

        assert!(strategy.extract(&doc).unwrap().html.starts_with("<main>"));
    }

    #[test]
    fn test_heuristic_largest_block() {
        let html = r#"<html><body>
            <div id="short"><p>a</p><p>b</p></div>
            <section id="long"><p>A much longer paragraph of text.</p><p>And another one.</p></section>
            <div id="single"><p>One paragraph only but it is by far the longest text on the whole page.</p></div>
            </body></html>"#;
        let doc = Document::parse(html).unwrap();

        let result = heuristic_only().extract(&doc).unwrap();

        assert!(result.html.contains("id=\"long\""));
    }

    #[test]
    fn test_heuristic_strips_noise() {
        let html = r#"<html><body><article>
            <nav>Menu</nav><p>Text</p><div class="social-share">Share</div>
            <script>track()</script><iframe src="https://ads.example.com/x"></iframe>
            <div class="related-posts">More</div><footer>Foot</footer></article></body></html>"#;
        let doc = Document::parse(html).unwrap();

        let result = heuristic_only().extract(&doc).unwrap();

        assert!(result.html.contains("<p>Text</p>"));
        for noise in ["Menu", "Share", "track()", "ads.example.com", "More", "Foot"] {
            assert!(!result.html.contains(noise), "{noise} should be stripped");
        }
    }

    #[test]
    fn test_no_main_content() {
        let doc = Document::parse("<html><body><div><p>Lonely</p></div></body></html>").unwrap();

        let err = heuristic_only().extract(&doc).unwrap_err();

        assert!(matches!(err, XtractorError::NoMainContentFound { kind: SourceKind::Generic }));
    }

    #[test]
    fn test_starts_with_heading() {
        assert!(starts_with_heading("\n  <h1>Title</h1>"));
        assert!(starts_with_heading("<H1 id=\"x\">Title</H1>"));
        assert!(!starts_with_heading("<h2>Sub</h2>"));
        assert!(!starts_with_heading("<p><h1>Nested</h1></p>"));
        assert!(!starts_with_heading("<h1x>"));
    }
}
