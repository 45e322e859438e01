//! Page metadata lookups shared by the strategies and the readability engine.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::parse::Document;

static TITLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s[|\-\\/>»–—:]\s").expect("title separator pattern should compile"));

const BYLINE_SELECTORS: &[&str] = &[
    "[rel=\"author\"]",
    "[itemprop=\"author\"]",
    "[class*=\"byline\"]",
    "[class*=\"author\"]",
    "[id*=\"byline\"]",
    "[id*=\"author\"]",
];

impl Document {
    /// First parseable JSON-LD block.
    pub fn json_ld(&self) -> Option<Value> {
        self.select("script[type=\"application/ld+json\"]")
            .ok()?
            .iter()
            .find_map(|el| serde_json::from_str::<Value>(el.text().trim()).ok())
    }

    /// The document title with a trailing site-name segment removed.
    ///
    /// `"How Rust works | Some Blog"` becomes `"How Rust works"`, unless the
    /// remaining part would be shorter than three words. Falls back to the
    /// first `<h1>`.
    pub fn article_title(&self) -> Option<String> {
        let Some(title) = self.title() else {
            return self.first_heading();
        };

        let cut = TITLE_SEPARATOR
            .find_iter(&title)
            .last()
            .map(|sep| title[..sep.start()].trim().to_string())
            .filter(|head| head.split_whitespace().count() >= 3);

        Some(cut.unwrap_or(title))
    }

    fn first_heading(&self) -> Option<String> {
        let h1 = self.select_first("h1").ok().flatten()?.text();
        let h1 = h1.trim();
        if h1.is_empty() { None } else { Some(h1.to_string()) }
    }

    /// Author name from JSON-LD, then author markup in the body.
    pub fn extract_byline(&self) -> Option<String> {
        if let Some(json_ld) = self.json_ld()
            && let Some(author) = json_ld.get("author")
            && let Some(name) = author_name(author)
        {
            return Some(name);
        }

        BYLINE_SELECTORS.iter().find_map(|selector| {
            self.select(selector).ok()?.iter().take(3).find_map(|el| {
                let text = el.text();
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                (!text.is_empty() && text.chars().count() < 100).then_some(text)
            })
        })
    }

    /// Social-sharing image: `og:image`, then `twitter:image`.
    pub fn featured_image(&self) -> Option<String> {
        self.meta_content("og:image").or_else(|| self.meta_content("twitter:image"))
    }

    /// Publisher name: `og:site_name`, then the hostname.
    pub fn site_name(&self) -> Option<String> {
        self.meta_content("og:site_name").or_else(|| self.hostname())
    }
}

/// Author name from a JSON-LD `author` value: a string, an object with a
/// `name`, or an array of either.
fn author_name(author: &Value) -> Option<String> {
    match author {
        Value::String(name) => Some(name.clone()),
        Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
        Value::Array(items) => items.first().and_then(author_name),
        _ => None,
    }
}
