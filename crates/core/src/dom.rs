//! Declarative noise removal.
//!
//! Every strategy describes its cleanup as a list of selectors. [`strip`]
//! applies such a list to a deep copy of an element and returns the cleaned
//! markup, leaving the source document untouched.

use lol_html::{HtmlRewriter, Settings, element};
use scraper::Html;
use url::Url;

use crate::parse::{Element, parse_selector};

/// Deep-copies `root` and removes every descendant matching any of `selectors`.
///
/// Returns the serialized copy, root element included.
pub fn strip(root: &Element<'_>, selectors: &[&str]) -> String {
    strip_fragment(&root.outer_html(), selectors)
}

/// Removes every element matching any of `selectors` from an HTML fragment.
///
/// Selectors that fail to parse are logged and skipped so one unsupported
/// rule never disables the rest of the list.
pub fn strip_fragment(html: &str, selectors: &[&str]) -> String {
    let mut fragment = Html::parse_fragment(html);

    let mut doomed = Vec::new();
    for selector in selectors {
        match parse_selector(selector) {
            Ok(sel) => doomed.extend(fragment.select(&sel).map(|el| el.id())),
            Err(err) => tracing::warn!(selector, %err, "skipping strip selector"),
        }
    }

    let removed = doomed.len();
    for id in doomed {
        if let Some(mut node) = fragment.tree.get_mut(id) {
            node.detach();
        }
    }
    tracing::trace!(removed, "stripped noise elements");

    fragment.root_element().inner_html()
}

/// Resolves relative `a[href]` and `img[src]` values against `base`.
///
/// Returns the input unchanged if rewriting fails.
pub fn absolutize_urls(html: &str, base: &Url) -> String {
    let mut output = String::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("a[href]", |el| {
                    if let Some(href) = el.get_attribute("href")
                        && !href.starts_with('#')
                        && let Ok(absolute) = base.join(&href)
                    {
                        el.set_attribute("href", absolute.as_str()).ok();
                    }
                    Ok(())
                }),
                element!("img[src]", |el| {
                    if let Some(src) = el.get_attribute("src")
                        && let Ok(absolute) = base.join(&src)
                    {
                        el.set_attribute("src", absolute.as_str()).ok();
                    }
                    Ok(())
                }),
            ],
            ..Settings::default()
        },
        |chunk: &[u8]| output.push_str(&String::from_utf8_lossy(chunk)),
    );

    if rewriter.write(html.as_bytes()).is_err() {
        return html.to_string();
    }
    if rewriter.end().is_err() {
        return html.to_string();
    }

    output
}
