//! The extraction run: classify, authenticate, navigate, wait, select,
//! inline images, assemble.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use xtractor_core::{ChainedImageSource, Extractor, ExtractorConfig, OutputFormat, StaticPage};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let html = r#"<html><head><meta property="og:title" content="Hello"></head>
//!     <body><main><p>One.</p><p>Two.</p></main></body></html>"#;
//! let page = StaticPage::new(html).landing_at("https://blog.example.com/hello");
//!
//! let config = ExtractorConfig::builder().format(OutputFormat::Markdown).inline_images(false).build();
//! let extraction = Extractor::new(config)
//!     .run_snapshot(&page, Arc::new(ChainedImageSource::new()))
//!     .await
//!     .unwrap();
//!
//! assert!(extraction.artifact.starts_with("# Hello"));
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::Result;
use crate::assemble::{OutputFormat, assemble};
use crate::inline::{CanvasImageSource, ChainedImageSource, ImageInliner, ImageSource, InlineReport};
use crate::page::Page;
use crate::parse::Document;
use crate::readability::{ArticleReader, Readability, ReadabilityConfig};
use crate::session::{SessionStore, is_login_surface, require_session, session_expired};
use crate::source::{SourceKind, classify, classify_url};
use crate::strategy::{ExtractionResult, Strategy, Waits};

/// Settings for an [`Extractor`].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use xtractor_core::ExtractorConfig;
///
/// let config = ExtractorConfig::builder()
///     .soft_timeout(Duration::from_secs(5))
///     .image_concurrency(8)
///     .build();
/// assert_eq!(config.essential_timeout, Duration::from_secs(30));
/// assert!(config.inline_images);
/// ```
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Bound for waits that abort the run (default: 30 s).
    pub essential_timeout: Duration,

    /// Bound for best-effort waits (default: 15 s).
    pub soft_timeout: Duration,

    /// Overrides every strategy's settle delay.
    pub settle_delay: Option<Duration>,

    /// Image requests in flight (default: 4).
    pub image_concurrency: usize,

    /// Bound for one image attempt (default: 30 s).
    pub image_timeout: Duration,

    /// Whether to inline images at all (default: true).
    pub inline_images: bool,

    /// Try the page's decoded bitmaps when a network fetch fails (default: false).
    pub canvas_fallback: bool,

    /// Forces a strategy instead of classifying the URL.
    pub source: Option<SourceKind>,

    pub format: OutputFormat,

    /// Settings for the bundled readability engine.
    pub readability: ReadabilityConfig,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            essential_timeout: Duration::from_secs(30),
            soft_timeout: Duration::from_secs(15),
            settle_delay: None,
            image_concurrency: 4,
            image_timeout: Duration::from_secs(30),
            inline_images: true,
            canvas_fallback: false,
            source: None,
            format: OutputFormat::Html,
            readability: ReadabilityConfig::default(),
        }
    }
}

impl ExtractorConfig {
    pub fn builder() -> ExtractorConfigBuilder {
        ExtractorConfigBuilder::default()
    }

    fn waits(&self) -> Waits {
        Waits { essential: self.essential_timeout, soft: self.soft_timeout, settle: self.settle_delay }
    }
}

/// Builder for [`ExtractorConfig`].
#[derive(Debug, Default)]
pub struct ExtractorConfigBuilder {
    config: ExtractorConfig,
}

impl ExtractorConfigBuilder {
    pub fn essential_timeout(mut self, value: Duration) -> Self {
        self.config.essential_timeout = value;
        self
    }

    pub fn soft_timeout(mut self, value: Duration) -> Self {
        self.config.soft_timeout = value;
        self
    }

    pub fn settle_delay(mut self, value: Duration) -> Self {
        self.config.settle_delay = Some(value);
        self
    }

    pub fn image_concurrency(mut self, value: usize) -> Self {
        self.config.image_concurrency = value;
        self
    }

    pub fn image_timeout(mut self, value: Duration) -> Self {
        self.config.image_timeout = value;
        self
    }

    pub fn inline_images(mut self, value: bool) -> Self {
        self.config.inline_images = value;
        self
    }

    pub fn canvas_fallback(mut self, value: bool) -> Self {
        self.config.canvas_fallback = value;
        self
    }

    pub fn source(mut self, value: SourceKind) -> Self {
        self.config.source = Some(value);
        self
    }

    pub fn format(mut self, value: OutputFormat) -> Self {
        self.config.format = value;
        self
    }

    pub fn readability(mut self, value: ReadabilityConfig) -> Self {
        self.config.readability = value;
        self
    }

    pub fn build(self) -> ExtractorConfig {
        self.config
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    /// The assembled document.
    pub artifact: String,
    pub format: String,
    pub source: SourceKind,
    pub title: String,
    pub byline: String,
    pub site_name: String,
    pub images: InlineReport,
}

/// Runs extractions. Holds no per-run state, so one extractor can serve
/// any number of concurrent runs.
#[derive(Clone)]
pub struct Extractor {
    config: ExtractorConfig,
    reader: Option<Arc<dyn ArticleReader>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config, reader: None }
    }

    /// Replaces the readability engine used by the Generic strategy.
    pub fn with_reader(mut self, reader: Arc<dyn ArticleReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Navigates `page` to `url` and extracts it.
    ///
    /// # Errors
    ///
    /// - [`crate::XtractorError::SessionRequired`] when the source needs a
    ///   session and `store` holds none.
    /// - [`crate::XtractorError::SessionExpired`] when an authenticated
    ///   navigation lands on a login page.
    /// - [`crate::XtractorError::Timeout`] when an essential wait expires.
    /// - [`crate::XtractorError::NoArticleFound`] or
    ///   [`crate::XtractorError::NoMainContentFound`] when selection fails.
    ///
    /// Image failures never fail the run; they are listed in the report.
    pub async fn run(
        &self,
        url: &str,
        page: &mut dyn Page,
        store: &dyn SessionStore,
        images: Arc<dyn ImageSource>,
    ) -> Result<Extraction> {
        let mut kind = self.config.source.unwrap_or_else(|| classify_url(url));
        tracing::info!(url, source = kind.label(), "source detected");

        if let Some(cookies) = require_session(kind, store)? {
            page.add_cookies(&cookies).await?;
            tracing::debug!(cookies = cookies.len(), "session installed");
        }

        page.goto(url).await?;
        let location = page.url();
        if kind.requires_session() && is_login_surface(&location) {
            return Err(session_expired());
        }

        if self.config.source.is_none() && kind == SourceKind::Generic {
            let snapshot = page.content().await?;
            kind = refine(&snapshot, &location);
        }

        let strategy = self.strategy(kind);
        strategy.wait_for_content(page, &self.config.waits()).await?;

        self.extract_loaded(&strategy, page, images).await
    }

    /// Extracts a page that is already loaded, without session handling or
    /// render waits. Used for saved snapshots.
    pub async fn run_snapshot(&self, page: &dyn Page, images: Arc<dyn ImageSource>) -> Result<Extraction> {
        let kind = match self.config.source {
            Some(kind) => kind,
            None => refine(&page.content().await?, &page.url()),
        };
        tracing::info!(source = kind.label(), "source detected");

        let strategy = self.strategy(kind);
        self.extract_loaded(&strategy, page, images).await
    }

    fn strategy(&self, kind: SourceKind) -> Strategy {
        let reader = self
            .reader
            .clone()
            .unwrap_or_else(|| Arc::new(Readability::with_config(self.config.readability.clone())));
        Strategy::for_source(kind, Some(reader))
    }

    async fn extract_loaded(&self, strategy: &Strategy, page: &dyn Page, images: Arc<dyn ImageSource>) -> Result<Extraction> {
        let html = page.content().await?;
        let location = page.url();
        let mut result = select(strategy, &html, &location)?;

        match page.computed_theme(strategy.theme_selector()).await {
            Ok(Some(live)) => result.theme = live.or(result.theme),
            Ok(None) => {}
            Err(err) => tracing::debug!(%err, "computed theme unavailable"),
        }

        if strategy.captures_stylesheets() {
            match page.stylesheets().await {
                Ok(sheets) if !sheets.is_empty() => result.styles = sheets.join("\n"),
                Ok(_) => {}
                Err(err) => tracing::debug!(%err, "stylesheets unavailable, keeping inline styles"),
            }
        }

        let report = if self.config.inline_images {
            let source = self.image_source(page, images).await;
            ImageInliner::new(source)
                .with_concurrency(self.config.image_concurrency)
                .with_timeout(self.config.image_timeout)
                .inline_result(&mut result)
                .await
        } else {
            InlineReport::default()
        };

        let artifact = assemble(&result, self.config.format, strategy.extra_css())?;
        tracing::info!(bytes = artifact.len(), format = %self.config.format, "document assembled");

        Ok(Extraction {
            artifact,
            format: self.config.format.to_string(),
            source: strategy.kind(),
            title: result.title,
            byline: result.byline,
            site_name: result.site_name,
            images: report,
        })
    }

    /// `images`, followed by canvas capture when enabled.
    async fn image_source(&self, page: &dyn Page, images: Arc<dyn ImageSource>) -> Arc<dyn ImageSource> {
        if !self.config.canvas_fallback {
            return images;
        }

        match page.rendered_images().await {
            Ok(rendered) if !rendered.is_empty() => {
                Arc::new(ChainedImageSource::new().then(images).then(Arc::new(CanvasImageSource::new(rendered))))
            }
            Ok(_) => images,
            Err(err) => {
                tracing::debug!(%err, "rendered images unavailable");
                images
            }
        }
    }
}

/// Classification with DOM access, for custom-domain publications.
fn refine(html: &str, location: &str) -> SourceKind {
    let kind = match Document::parse(html) {
        Ok(doc) => classify(location, Some(&doc)),
        Err(_) => classify_url(location),
    };
    if kind != SourceKind::Generic {
        tracing::info!(source = kind.label(), "source refined from page markup");
    }
    kind
}

/// Parses the snapshot and runs the strategy on it.
fn select(strategy: &Strategy, html: &str, location: &str) -> Result<ExtractionResult> {
    let doc = match Document::parse_with_url(html, location) {
        Ok(doc) => doc,
        Err(_) => Document::parse(html)?,
    };
    strategy.extract(&doc)
}
