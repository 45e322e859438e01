//! Cleanup applied to the cloned document before scoring.

use std::sync::LazyLock;

use lol_html::{HtmlRewriter, Settings, element};
use regex::Regex;
use url::Url;

use crate::dom;

static UNLIKELY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup)",
    )
    .expect("unlikely pattern should compile")
});

static MAYBE_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(and|article|body|column|content|main|shadow|story)").expect("candidate pattern should compile")
});

static HIDDEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").expect("hidden pattern should compile")
});

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern should compile"));

/// Tags dropped wholesale, content included.
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "svg", "canvas", "template"];

/// Options for [`preprocess_html`].
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Unwrap elements whose class or id looks like page chrome.
    pub remove_unlikely: bool,
    /// Drop elements hidden with inline styles.
    pub remove_hidden: bool,
    /// Base URL for making links and images absolute.
    pub base_url: Option<Url>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { remove_unlikely: true, remove_hidden: true, base_url: None }
    }
}

/// Prepares markup for scoring. Returns the input unchanged if rewriting fails.
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let without_comments = COMMENT.replace_all(html, "");

    let mut handlers: Vec<_> = NON_CONTENT_TAGS
        .iter()
        .map(|tag| {
            element!(tag, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect();

    let mut output = String::with_capacity(without_comments.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                config.remove_hidden.then(|| {
                    element!("[style]", |el| {
                        if el.get_attribute("style").is_some_and(|style| HIDDEN.is_match(&style)) {
                            el.remove();
                        }
                        Ok(())
                    })
                }),
                config.remove_unlikely.then(|| {
                    element!("*", |el| {
                        if el.removed() || matches!(el.tag_name().as_str(), "html" | "body" | "a" | "article" | "main") {
                            return Ok(());
                        }
                        let names = format!(
                            "{} {}",
                            el.get_attribute("id").unwrap_or_default(),
                            el.get_attribute("class").unwrap_or_default()
                        );
                        if UNLIKELY.is_match(&names) && !MAYBE_CANDIDATE.is_match(&names) {
                            el.remove_and_keep_content();
                        }
                        Ok(())
                    })
                }),
            ]
            .into_iter()
            .flatten()
            .chain(handlers.drain(..))
            .collect(),
            ..Settings::default()
        },
        |chunk: &[u8]| output.push_str(&String::from_utf8_lossy(chunk)),
    );

    if rewriter.write(without_comments.as_bytes()).is_err() {
        return html.to_string();
    }
    if rewriter.end().is_err() {
        return html.to_string();
    }

    match &config.base_url {
        Some(base) => dom::absolutize_urls(&output, base),
        None => output,
    }
}
