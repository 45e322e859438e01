//! Page provider contract.
//!
//! The extraction pipeline drives a [`Page`]: it navigates, waits for the
//! content to render, snapshots the markup and reads a few live properties
//! (computed theme, readable stylesheets, decoded image bitmaps). Browser
//! lifecycle stays with whoever implements the trait.
//!
//! [`StaticPage`] is a provider over an HTML snapshot. It backs file and
//! stdin input, the HTTP provider, and tests.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::parse::Document;
use crate::session::SessionCookies;
use crate::theme::Theme;
use crate::{Result, XtractorError};

/// A condition a page can be asked to reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCondition {
    /// No `[role="progressbar"]` element is present.
    NoProgressIndicators,
    /// Every `img` under `scope` has finished loading.
    ImagesLoaded { scope: String },
}

/// A decoded image as the rendering engine holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    /// The `src` the element was loaded from.
    pub src: String,
    /// Whether loading has finished.
    pub complete: bool,
    pub natural_width: u32,
    pub natural_height: u32,
    /// False when the pixels came from another origin without permission.
    pub origin_clean: bool,
    /// RGBA8 pixels, row-major, `natural_width * natural_height * 4` bytes.
    pub pixels: Vec<u8>,
}

/// A navigable, observable page.
#[async_trait]
pub trait Page: Send + Sync {
    /// Current location, after redirects.
    fn url(&self) -> String;

    /// Serialized markup of the current document.
    async fn content(&self) -> Result<String>;

    async fn goto(&mut self, url: &str) -> Result<()>;

    /// Installs session cookies for subsequent navigations and requests.
    async fn add_cookies(&mut self, cookies: &SessionCookies) -> Result<()>;

    /// Resolves once `selector` matches. Fails with [`XtractorError::Timeout`]
    /// if it does not within `timeout`.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Resolves once `condition` holds, under the same timeout rules.
    async fn wait_for(&self, condition: &PageCondition, timeout: Duration) -> Result<()>;

    /// Lets late rendering finish.
    async fn settle(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Computed background, text color and font of the first element matching `selector`.
    async fn computed_theme(&self, selector: &str) -> Result<Option<Theme>>;

    /// Text of every stylesheet the page can read. Cross-origin sheets are skipped.
    async fn stylesheets(&self) -> Result<Vec<String>>;

    /// Live image bitmaps, for canvas capture.
    async fn rendered_images(&self) -> Result<Vec<RenderedImage>> {
        Ok(Vec::new())
    }
}

/// Runs an essential wait. A timeout aborts the run.
pub async fn hard_wait<F>(what: &str, timeout: Duration, wait: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    match tokio::time::timeout(timeout, wait).await {
        Ok(result) => result,
        Err(_) => Err(timeout_error(what, timeout)),
    }
}

/// Runs a best-effort wait. Any failure is logged and swallowed.
pub async fn soft_wait<F>(what: &str, timeout: Duration, wait: F)
where
    F: Future<Output = Result<()>>,
{
    match hard_wait(what, timeout, wait).await {
        Ok(()) => tracing::debug!(what, "wait satisfied"),
        Err(err) => tracing::warn!(what, %err, "soft wait gave up, continuing"),
    }
}

fn timeout_error(what: &str, timeout: Duration) -> XtractorError {
    XtractorError::Timeout { what: what.to_string(), timeout_ms: timeout.as_millis() as u64 }
}

/// A page backed by a fixed HTML snapshot.
///
/// Waits are evaluated once against the snapshot since it cannot change:
/// an unmet condition fails straight away with [`XtractorError::Timeout`].
/// `goto` keeps the landing URL when one was set, which lets tests model
/// redirects.
#[derive(Debug, Clone, Default)]
pub struct StaticPage {
    html: String,
    location: Option<String>,
    extra_stylesheets: Vec<String>,
    images: Vec<RenderedImage>,
    cookies: Option<SessionCookies>,
}

impl StaticPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into(), ..Default::default() }
    }

    /// The URL the page reports after any navigation.
    pub fn landing_at(mut self, url: impl Into<String>) -> Self {
        self.location = Some(url.into());
        self
    }

    /// Additional readable stylesheets, e.g. fetched `<link>` sheets.
    pub fn with_stylesheets(mut self, sheets: Vec<String>) -> Self {
        self.extra_stylesheets = sheets;
        self
    }

    pub fn with_rendered_images(mut self, images: Vec<RenderedImage>) -> Self {
        self.images = images;
        self
    }

    /// Cookies installed through [`Page::add_cookies`].
    pub fn cookies(&self) -> Option<&SessionCookies> {
        self.cookies.as_ref()
    }

    fn selector_present(&self, selector: &str) -> Result<bool> {
        let doc = Document::parse(&self.html)?;
        Ok(doc.select_first(selector)?.is_some())
    }

    fn images_complete(&self, scope: &str) -> Result<bool> {
        let doc = Document::parse(&self.html)?;
        let srcs: Vec<String> = doc
            .select(&format!("{scope} img"))?
            .iter()
            .filter_map(|img| img.attr("src").map(str::to_string))
            .collect();

        Ok(self
            .images
            .iter()
            .filter(|image| srcs.contains(&image.src))
            .all(|image| image.complete))
    }
}

#[async_trait]
impl Page for StaticPage {
    fn url(&self) -> String {
        self.location.clone().unwrap_or_else(|| "about:blank".to_string())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.html.clone())
    }

    async fn goto(&mut self, url: &str) -> Result<()> {
        self.location.get_or_insert_with(|| url.to_string());
        Ok(())
    }

    async fn add_cookies(&mut self, cookies: &SessionCookies) -> Result<()> {
        self.cookies = Some(cookies.clone());
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        if self.selector_present(selector)? { Ok(()) } else { Err(timeout_error(selector, timeout)) }
    }

    async fn wait_for(&self, condition: &PageCondition, timeout: Duration) -> Result<()> {
        let satisfied = match condition {
            PageCondition::NoProgressIndicators => !self.selector_present("[role=\"progressbar\"]")?,
            PageCondition::ImagesLoaded { scope } => self.images_complete(scope)?,
        };

        if satisfied { Ok(()) } else { Err(timeout_error(&format!("{condition:?}"), timeout)) }
    }

    async fn settle(&self, _duration: Duration) {}

    async fn computed_theme(&self, selector: &str) -> Result<Option<Theme>> {
        let doc = Document::parse(&self.html)?;
        let theme = doc.select_first(selector)?.map(|el| Theme::from_element(&el));
        Ok(theme.filter(|theme| !theme.is_empty()))
    }

    async fn stylesheets(&self) -> Result<Vec<String>> {
        let doc = Document::parse(&self.html)?;
        let mut sheets: Vec<String> = doc
            .select("style")?
            .iter()
            .map(|style| style.text())
            .filter(|css| !css.trim().is_empty())
            .collect();
        sheets.extend(self.extra_stylesheets.iter().cloned());
        Ok(sheets)
    }

    async fn rendered_images(&self) -> Result<Vec<RenderedImage>> {
        Ok(self.images.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"<html><head><style>body { margin: 0 }</style><style> </style></head>
        <body><div data-testid="tweet" style="background-color: #15202b"><article><img src="https://img/a.png"></article></div>
        <div role="progressbar"></div></body></html>"#;

    fn image(src: &str, complete: bool) -> RenderedImage {
        RenderedImage {
            src: src.to_string(),
            complete,
            natural_width: 1,
            natural_height: 1,
            origin_clean: true,
            pixels: vec![0, 0, 0, 255],
        }
    }

    #[tokio::test]
    async fn test_static_page_navigation() {
        let mut page = StaticPage::new(HTML);
        assert_eq!(page.url(), "about:blank");
        page.goto("https://x.com/a/status/1").await.unwrap();
        assert_eq!(page.url(), "https://x.com/a/status/1");

        let mut redirected = StaticPage::new(HTML).landing_at("https://x.com/i/flow/login");
        redirected.goto("https://x.com/a/status/1").await.unwrap();
        assert_eq!(redirected.url(), "https://x.com/i/flow/login");
    }

    #[tokio::test]
    async fn test_static_page_waits() {
        let page = StaticPage::new(HTML).with_rendered_images(vec![image("https://img/a.png", false)]);
        let timeout = Duration::from_millis(10);

        assert!(page.wait_for_selector("article", timeout).await.is_ok());
        assert!(matches!(
            page.wait_for_selector("main", timeout).await,
            Err(XtractorError::Timeout { .. })
        ));
        assert!(page.wait_for(&PageCondition::NoProgressIndicators, timeout).await.is_err());
        assert!(
            page.wait_for(&PageCondition::ImagesLoaded { scope: "article".to_string() }, timeout)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_soft_wait_swallows_and_hard_wait_propagates() {
        let page = StaticPage::new(HTML);
        let timeout = Duration::from_millis(10);

        soft_wait("main", timeout, page.wait_for_selector("main", timeout)).await;
        let err = hard_wait("main", timeout, page.wait_for_selector("main", timeout)).await.unwrap_err();
        assert!(matches!(err, XtractorError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_hard_wait_times_out_pending_future() {
        let err = hard_wait("article", Duration::from_millis(5), std::future::pending::<Result<()>>())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("article"));
    }

    #[tokio::test]
    async fn test_static_page_theme_and_styles() {
        let page = StaticPage::new(HTML).with_stylesheets(vec!["p { color: red }".to_string()]);

        let theme = page.computed_theme("[data-testid=\"tweet\"]").await.unwrap().unwrap();
        assert_eq!(theme.background_color.as_deref(), Some("#15202b"));
        assert!(page.computed_theme("article").await.unwrap().is_none());

        let sheets = page.stylesheets().await.unwrap();
        assert_eq!(sheets, vec!["body { margin: 0 }".to_string(), "p { color: red }".to_string()]);
    }
}
