//! Image inlining.
//!
//! [`ImageInliner`] turns every remote image reference in the extracted
//! markup and CSS into a `data:` URI so the final document is
//! self-contained. Discovery walks the markup with `lol_html`: `<img src>`
//! attributes and `url(...)` values in inline `style` attributes, then the
//! `url(...)` values of the CSS text. Each distinct URL is requested once,
//! and every whole occurrence of it is replaced in one pass after all
//! requests have resolved. A failed image keeps its remote URL; inlining
//! itself never fails.

pub mod canvas;
pub mod source;

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use futures::StreamExt;
use lol_html::{HtmlRewriter, Settings, element};
use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::XtractorError;
use crate::strategy::ExtractionResult;

pub use canvas::CanvasImageSource;
pub use source::{ChainedImageSource, EncodedImage, ImageSource, detect_mime};

#[cfg(feature = "fetch")]
pub use source::NetworkImageSource;

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:&quot;|["'])?(https?://[^"')\s]+)"#).expect("css url pattern should compile")
});

/// One image that stayed remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageFailure {
    pub url: String,
    pub reason: String,
}

/// Outcome counts of an inlining pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InlineReport {
    /// Distinct remote URLs discovered.
    pub found: usize,
    /// URLs replaced by data URIs.
    pub converted: usize,
    pub failures: Vec<ImageFailure>,
}

/// Rewritten markup and CSS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inlined {
    pub html: String,
    pub styles: String,
    pub report: InlineReport,
}

/// Distinct remote image URLs in `html` then `styles`, in discovery order.
///
/// URLs are returned exactly as written, entity encoding included.
pub fn collect_image_urls(html: &str, styles: &str) -> Vec<String> {
    let mut literals = markup_image_refs(html);
    literals.extend(css_urls(styles));

    let mut seen = HashSet::new();
    literals.retain(|literal| is_remote(literal) && seen.insert(literal.clone()));
    literals
}

/// `<img src>` values and inline-style `url(...)` values, in element order.
fn markup_image_refs(html: &str) -> Vec<String> {
    let mut refs = Vec::new();
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!("img[src], [style]", |el| {
                if el.tag_name() == "img"
                    && let Some(src) = el.get_attribute("src")
                {
                    refs.push(src.trim().to_string());
                }
                if let Some(style) = el.get_attribute("style") {
                    refs.extend(css_urls(&style));
                }
                Ok(())
            })],
            ..Settings::default()
        },
        |_: &[u8]| {},
    );

    let walked = rewriter.write(html.as_bytes()).and_then(|()| rewriter.end());
    if let Err(err) = walked {
        tracing::warn!(%err, "could not scan markup for images");
    }
    refs
}

fn css_urls(css: &str) -> Vec<String> {
    CSS_URL
        .captures_iter(css)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches("&quot;").to_string())
        .collect()
}

/// Replaces whole occurrences of `literal` with `data_uri`.
///
/// An occurrence counts only when it is delimited like an attribute value,
/// a `url(...)` argument or a `srcset` entry, so a URL that merely starts
/// with `literal` is left alone.
fn replace_reference(text: &str, literal: &str, data_uri: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut last = 0;
    for (start, _) in text.match_indices(literal) {
        let end = start + literal.len();
        if opens_reference(&text[..start]) && closes_reference(&text[end..]) {
            output.push_str(&text[last..start]);
            output.push_str(data_uri);
            last = end;
        }
    }
    output.push_str(&text[last..]);
    output
}

fn opens_reference(before: &str) -> bool {
    match before.chars().next_back() {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, '"' | '\'' | '(' | ',' | ';'),
    }
}

fn closes_reference(after: &str) -> bool {
    match after.chars().next() {
        None => true,
        Some('&') => after.starts_with("&quot;") || after.starts_with("&#39;"),
        Some(c) => c.is_whitespace() || matches!(c, '"' | '\'' | ')' | ','),
    }
}

/// Whether a literal, once entity-decoded, is an absolute http(s) URL.
fn is_remote(literal: &str) -> bool {
    Url::parse(&html_escape::decode_html_entities(literal))
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Replaces remote image references with data URIs.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use xtractor_core::fetch::FetchConfig;
/// use xtractor_core::inline::{ImageInliner, NetworkImageSource};
///
/// # async fn run() -> xtractor_core::Result<()> {
/// let source = NetworkImageSource::new(&FetchConfig::default())?;
/// let inliner = ImageInliner::new(Arc::new(source)).with_concurrency(8);
///
/// let inlined = inliner.inline(r#"<img src="https://example.com/a.png">"#, "").await;
/// println!("{}/{} images inlined", inlined.report.converted, inlined.report.found);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ImageInliner {
    source: Arc<dyn ImageSource>,
    concurrency: usize,
    timeout: Duration,
}

impl ImageInliner {
    pub fn new(source: Arc<dyn ImageSource>) -> Self {
        Self { source, concurrency: 4, timeout: Duration::from_secs(30) }
    }

    /// Maximum requests in flight (default: 4).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Bound for a single image attempt (default: 30 s).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn inline(&self, html: &str, styles: &str) -> Inlined {
        let urls = collect_image_urls(html, styles);
        let (converted, report) = self.convert(urls).await;

        let mut inlined = Inlined { html: html.to_string(), styles: styles.to_string(), report };
        for (literal, data_uri) in &converted {
            inlined.html = replace_reference(&inlined.html, literal, data_uri);
            inlined.styles = replace_reference(&inlined.styles, literal, data_uri);
        }
        inlined
    }

    /// Inlines an extraction in place, its featured image included.
    pub async fn inline_result(&self, result: &mut ExtractionResult) -> InlineReport {
        let mut urls = collect_image_urls(&result.html, &result.styles);
        if let Some(featured) = &result.featured_image
            && is_remote(featured)
            && !urls.contains(featured)
        {
            urls.push(featured.clone());
        }

        let (converted, report) = self.convert(urls).await;
        for (literal, data_uri) in &converted {
            result.html = replace_reference(&result.html, literal, data_uri);
            result.styles = replace_reference(&result.styles, literal, data_uri);
            if result.featured_image.as_deref() == Some(literal.as_str()) {
                result.featured_image = Some(data_uri.clone());
            }
        }
        report
    }

    /// Attempts every URL once. Returns `(literal, data URI)` pairs, longest
    /// literal first.
    async fn convert(&self, urls: Vec<String>) -> (Vec<(String, String)>, InlineReport) {
        let found = urls.len();
        if found == 0 {
            return (Vec::new(), InlineReport::default());
        }

        let attempts: Vec<(String, Result<String, XtractorError>)> = futures::stream::iter(urls)
            .map(|literal| async move {
                let outcome = self.attempt(&literal).await;
                (literal, outcome)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut converted = Vec::new();
        let mut failures = Vec::new();
        for (literal, outcome) in attempts {
            match outcome {
                Ok(data_uri) => converted.push((literal, data_uri)),
                Err(err) => {
                    tracing::warn!(%err, "image left remote");
                    failures.push(ImageFailure { url: literal, reason: err.to_string() });
                }
            }
        }
        converted.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let report = InlineReport { found, converted: converted.len(), failures };
        tracing::info!(converted = report.converted, found, "images converted {}/{}", report.converted, found);
        (converted, report)
    }

    async fn attempt(&self, literal: &str) -> Result<String, XtractorError> {
        let url = html_escape::decode_html_entities(literal);
        let failed = |reason: String| XtractorError::ImageConversionFailed { url: url.to_string(), reason };

        match tokio::time::timeout(self.timeout, self.source.fetch_image(&url)).await {
            Ok(Ok(image)) => Ok(image.to_data_uri()),
            Ok(Err(err)) => Err(failed(err.to_string())),
            Err(_) => Err(failed(format!("timed out after {} ms", self.timeout.as_millis()))),
        }
    }
}
