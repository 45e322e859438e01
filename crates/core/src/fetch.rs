//! Page loading over HTTP, plus file and stdin input.
//!
//! [`HttpPage`] is the network [`Page`] provider: it navigates with a
//! `reqwest` client whose cookie jar carries the session, and exposes the
//! same client so image requests go out with the same credentials.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::cookie::Jar;
use url::Url;

use crate::page::{Page, PageCondition, RenderedImage, StaticPage};
use crate::parse::Document;
use crate::session::SessionCookies;
use crate::theme::Theme;
use crate::{Result, XtractorError};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// HTTP client configuration shared by page and image requests.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36 xtractor/1.0"
                .to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Builds a client that stores and sends cookies through `jar`.
pub fn build_client(config: &FetchConfig, jar: Arc<Jar>) -> Result<Client> {
    Client::builder()
        .timeout(config.timeout_duration())
        .user_agent(&config.user_agent)
        .cookie_provider(jar)
        .build()
        .map_err(XtractorError::HttpError)
}

/// Validates that `url` is an absolute http(s) URL.
pub fn parse_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| XtractorError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(XtractorError::InvalidUrl(format!(
            "unsupported scheme {other:?}, expected http:// or https://"
        ))),
    }
}

pub(crate) fn map_send_error(err: reqwest::Error, what: &str, config: &FetchConfig) -> XtractorError {
    if err.is_timeout() {
        XtractorError::Timeout { what: what.to_string(), timeout_ms: config.timeout * 1000 }
    } else {
        XtractorError::HttpError(err)
    }
}

/// GETs `url`, returning the final URL after redirects and the body.
async fn get_html(client: &Client, url: &str, config: &FetchConfig) -> Result<(String, String)> {
    let parsed = parse_http_url(url)?;

    let response = client
        .get(parsed)
        .header("Accept", ACCEPT_HTML)
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .map_err(|e| map_send_error(e, url, config))?;

    let status = response.status();
    if !status.is_success() {
        return Err(XtractorError::HttpStatus { url: url.to_string(), status: status.as_u16() });
    }

    let final_url = response.url().to_string();
    let body = response.text().await?;
    Ok((final_url, body))
}

/// Reads HTML content from a local file.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(XtractorError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(XtractorError::from)
    }
}

/// Reads HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(XtractorError::from)?;

    Ok(buffer)
}

/// A [`Page`] that loads documents over HTTP.
///
/// Scripts are not executed, so waits resolve against the downloaded
/// markup exactly like a [`StaticPage`].
pub struct HttpPage {
    client: Client,
    jar: Arc<Jar>,
    config: FetchConfig,
    snapshot: StaticPage,
}

impl HttpPage {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = build_client(config, Arc::clone(&jar))?;
        Ok(Self { client, jar, config: config.clone(), snapshot: StaticPage::default() })
    }

    /// The page's HTTP client. Clones share the cookie jar.
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// Same-origin `<link rel="stylesheet">` targets of the current snapshot.
    fn linked_stylesheets(&self, html: &str) -> Vec<Url> {
        let location = self.snapshot.url();
        let (Ok(doc), Ok(base)) = (Document::parse(html), Url::parse(&location)) else {
            return Vec::new();
        };

        doc.select("link[rel~=\"stylesheet\"][href]")
            .unwrap_or_default()
            .iter()
            .filter_map(|link| link.attr("href").and_then(|href| base.join(href).ok()))
            .filter(|url| url.origin() == base.origin())
            .collect()
    }
}

#[async_trait]
impl Page for HttpPage {
    fn url(&self) -> String {
        self.snapshot.url()
    }

    async fn content(&self) -> Result<String> {
        self.snapshot.content().await
    }

    async fn goto(&mut self, url: &str) -> Result<()> {
        let (final_url, body) = get_html(&self.client, url, &self.config).await?;
        tracing::debug!(requested = url, landed = %final_url, bytes = body.len(), "page loaded");
        self.snapshot = StaticPage::new(body).landing_at(final_url);
        Ok(())
    }

    async fn add_cookies(&mut self, cookies: &SessionCookies) -> Result<()> {
        let mut added = 0usize;
        for cookie in cookies.live() {
            if let Some(url) = cookie.origin_url() {
                self.jar.add_cookie_str(&cookie.to_set_cookie(), &url);
                added += 1;
            }
        }
        tracing::debug!(added, "session cookies installed");
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.snapshot.wait_for_selector(selector, timeout).await
    }

    async fn wait_for(&self, condition: &PageCondition, timeout: Duration) -> Result<()> {
        self.snapshot.wait_for(condition, timeout).await
    }

    async fn settle(&self, _duration: Duration) {}

    async fn computed_theme(&self, selector: &str) -> Result<Option<Theme>> {
        self.snapshot.computed_theme(selector).await
    }

    async fn stylesheets(&self) -> Result<Vec<String>> {
        let mut sheets = self.snapshot.stylesheets().await?;
        let html = self.snapshot.content().await?;

        for url in self.linked_stylesheets(&html) {
            let fetched = match self.client.get(url.clone()).send().await {
                Ok(response) if response.status().is_success() => response.text().await.ok(),
                _ => None,
            };
            match fetched {
                Some(css) => sheets.push(css),
                None => tracing::debug!(%url, "skipping unreadable stylesheet"),
            }
        }

        Ok(sheets)
    }

    async fn rendered_images(&self) -> Result<Vec<RenderedImage>> {
        Ok(Vec::new())
    }
}
