//! Cleanup of the extracted content markup.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static CONDITIONAL_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--\[if[^\]]*\]>.*?<!\[endif\]-->").expect("conditional comment pattern should compile")
});

static CLASS_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s+class=("[^"]*"|'[^']*')"#).expect("class pattern should compile"));

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern should compile"));

static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<a(?:\s[^>]*)?>(.*?)</a>").expect("link pattern should compile"));

const EMPTY_CANDIDATES: &[&str] = &["div", "p", "span", "section", "aside", "header", "footer"];
const LINK_HEAVY_CANDIDATES: &[&str] = &["div", "section", "aside", "ul", "ol"];

static EMPTY_NODES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    EMPTY_CANDIDATES
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"<{tag}(?:\s[^>]*)?>(?:\s|&nbsp;|<br\s*/?>)*</{tag}>"))
                .expect("empty node pattern should compile")
        })
        .collect()
});

static LINK_HEAVY_NODES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    LINK_HEAVY_CANDIDATES
        .iter()
        .map(|tag| Regex::new(&format!(r"(?s)<{tag}(?:\s[^>]*)?>(.*?)</{tag}\s*>")).expect("node pattern should compile"))
        .collect()
});

/// Options for [`postprocess_html`].
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    pub keep_classes: bool,
    /// Blocks whose link text exceeds this share of their text are dropped.
    pub max_link_density: f64,
    pub max_empty_node_passes: usize,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self { keep_classes: false, max_link_density: 0.5, max_empty_node_passes: 10 }
    }
}

pub fn postprocess_html(html: &str, config: &PostProcessConfig) -> String {
    let mut processed = CONDITIONAL_COMMENT.replace_all(html, "").into_owned();

    if !config.keep_classes {
        processed = CLASS_ATTR.replace_all(&processed, "").into_owned();
    }

    processed = remove_high_link_density_nodes(&processed, config.max_link_density);
    remove_empty_nodes(processed, config.max_empty_node_passes)
}

/// Removes empty blocks until nothing changes, since removing a child can
/// empty its parent.
fn remove_empty_nodes(mut html: String, max_passes: usize) -> String {
    for _ in 0..max_passes {
        let before = html.len();
        for pattern in EMPTY_NODES.iter() {
            html = pattern.replace_all(&html, "").into_owned();
        }
        if html.len() == before {
            break;
        }
    }
    html
}

fn remove_high_link_density_nodes(html: &str, max_density: f64) -> String {
    let mut result = html.to_string();

    for pattern in LINK_HEAVY_NODES.iter() {
        result = pattern
            .replace_all(&result, |caps: &Captures| {
                let whole = caps.get(0).map_or("", |m| m.as_str());
                let inner = caps.get(1).map_or("", |m| m.as_str());

                let text_length = strip_tags(inner).trim().chars().count();
                if text_length == 0 {
                    return whole.to_string();
                }

                let link_length: usize = LINK
                    .captures_iter(inner)
                    .filter_map(|link| link.get(1))
                    .map(|text| strip_tags(text.as_str()).trim().chars().count())
                    .sum();

                if link_length as f64 / text_length as f64 > max_density { String::new() } else { whole.to_string() }
            })
            .into_owned();
    }

    result
}

fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_classes_unless_kept() {
        let html = r#"<p class="lead">Text</p>"#;

        assert_eq!(postprocess_html(html, &PostProcessConfig::default()), "<p>Text</p>");
        let keep = PostProcessConfig { keep_classes: true, ..Default::default() };
        assert_eq!(postprocess_html(html, &keep), html);
    }

    #[test]
    fn test_removes_nested_empty_nodes() {
        let html = "<div><section><p> </p><span><br></span></section></div><p>Body</p>";
        assert_eq!(postprocess_html(html, &PostProcessConfig::default()), "<p>Body</p>");
    }

    #[test]
    fn test_keeps_images_in_otherwise_empty_paragraphs() {
        let html = r#"<p><img src="https://host/a.png"></p>"#;
        assert_eq!(postprocess_html(html, &PostProcessConfig::default()), html);
    }

    #[test]
    fn test_removes_link_heavy_blocks() {
        let html = r##"<ul><li><a href="#">Home</a></li><li><a href="#">About</a></li></ul><p>Prose stays</p>"##;

        let result = postprocess_html(html, &PostProcessConfig::default());

        assert!(!result.contains("Home"));
        assert!(result.contains("Prose stays"));
    }

    #[test]
    fn test_removes_conditional_comments() {
        let html = "<p>A</p><!--[if IE]><p>Old browser</p><![endif]-->";
        assert_eq!(postprocess_html(html, &PostProcessConfig::default()), "<p>A</p>");
    }
}
