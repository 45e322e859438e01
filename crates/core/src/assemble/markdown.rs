//! Markdown output.
//!
//! The document opens with a title heading, the featured image and, when
//! there is an author or source, a metadata line closed by a rule. The
//! converted content follows.
//! Figures become an image line followed by an italic caption line.

use std::sync::LazyLock;

use lol_html::html_content::ContentType;
use lol_html::{HtmlRewriter, Settings, element};
use regex::Regex;
use scraper::Html;

use crate::Result;
use crate::dom;
use crate::parse::parse_selector;
use crate::strategy::ExtractionResult;

static EXTRA_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank line pattern should compile"));

/// Markup that never reaches the Markdown body. The synthesized header is
/// rebuilt from the result fields instead.
const DROPPED: &[&str] = &["script", "style", "noscript", "template", ".x-tractor-header"];

const FIGURE_TOKEN: &str = "XTRACTORFIGURE";

pub fn render(result: &ExtractionResult) -> Result<String> {
    let mut lines = Vec::new();

    let title = if result.title.is_empty() { "Article" } else { result.title.as_str() };
    lines.push(format!("# {title}"));
    lines.push(String::new());

    if let Some(src) = &result.featured_image {
        lines.push(format!("![]({src})"));
        lines.push(String::new());
    }

    let mut meta = Vec::new();
    if !result.byline.is_empty() {
        meta.push(format!("**Author** : {}", result.byline));
    }
    if !result.site_name.is_empty() {
        meta.push(format!("**Source** : {}", result.site_name));
    }
    if !meta.is_empty() {
        lines.push(meta.join(" | "));
        lines.push(String::new());
        lines.push("---".to_string());
        lines.push(String::new());
    }

    lines.push(content_to_markdown(&result.html)?);

    Ok(lines.join("\n"))
}

/// Converts content markup, with figures rendered as image plus caption.
pub fn content_to_markdown(html: &str) -> Result<String> {
    let cleaned = dom::strip_fragment(html, DROPPED);
    let (marked, figures) = mark_figures(&cleaned);

    let mut markdown = html_to_markdown(&marked)?;
    for (index, figure) in figures.iter().enumerate() {
        if let Some(figure) = figure {
            markdown = markdown.replace(&figure_token(index), figure);
        }
    }

    Ok(EXTRA_BLANK_LINES.replace_all(markdown.trim(), "\n\n").into_owned())
}

fn figure_token(index: usize) -> String {
    format!("{FIGURE_TOKEN}{index}X")
}

/// Replaces each `<figure>` holding an image with a placeholder paragraph.
///
/// Returns the rewritten markup and, per figure in document order, the
/// Markdown the placeholder stands for (`None` for figures without images).
fn mark_figures(html: &str) -> (String, Vec<Option<String>>) {
    let figures = figure_markdown(html);
    if figures.iter().all(Option::is_none) {
        return (html.to_string(), figures);
    }

    let mut index = 0usize;
    let mut output = String::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!("figure", |el| {
                if figures.get(index).is_some_and(Option::is_some) {
                    el.replace(&format!("<p>{}</p>", figure_token(index)), ContentType::Html);
                }
                index += 1;
                Ok(())
            })],
            ..Settings::default()
        },
        |chunk: &[u8]| output.push_str(&String::from_utf8_lossy(chunk)),
    );

    if rewriter.write(html.as_bytes()).is_err() {
        return (html.to_string(), Vec::new());
    }
    if rewriter.end().is_err() {
        return (html.to_string(), Vec::new());
    }

    (output, figures)
}

/// `![alt](src)` plus an `_caption_` line for every figure with an image.
///
/// The alt text is the caption when there is one, else the image's own alt.
fn figure_markdown(html: &str) -> Vec<Option<String>> {
    let (Ok(figure_sel), Ok(img_sel), Ok(caption_sel)) =
        (parse_selector("figure"), parse_selector("img"), parse_selector("figcaption"))
    else {
        return Vec::new();
    };

    let fragment = Html::parse_fragment(html);
    fragment
        .select(&figure_sel)
        .map(|figure| {
            let img = figure.select(&img_sel).next()?;
            let src = img.value().attr("src").unwrap_or_default();
            let caption = figure
                .select(&caption_sel)
                .next()
                .map(|caption| caption.text().collect::<String>().trim().to_string());

            let alt = caption.clone().unwrap_or_else(|| img.value().attr("alt").unwrap_or_default().to_string());
            let caption_line = caption.map(|caption| format!("_{caption}_")).unwrap_or_default();
            Some(format!("\n\n![{alt}]({src})\n{caption_line}\n\n"))
        })
        .collect()
}

#[cfg(feature = "markdown")]
fn html_to_markdown(html: &str) -> Result<String> {
    use htmd::HtmlToMarkdown;
    use htmd::options::{BulletListMarker, CodeBlockStyle, HeadingStyle, Options};

    let converter = HtmlToMarkdown::builder()
        .options(Options {
            heading_style: HeadingStyle::Atx,
            code_block_style: CodeBlockStyle::Fenced,
            bullet_list_marker: BulletListMarker::Dash,
            ..Default::default()
        })
        .skip_tags(vec!["script", "style", "noscript"])
        .build();

    converter
        .convert(html)
        .map_err(|e| crate::XtractorError::HtmlParseError(format!("Markdown conversion failed: {e}")))
}

/// Plain text, one block per line, when the `markdown` feature is disabled.
#[cfg(not(feature = "markdown"))]
fn html_to_markdown(html: &str) -> Result<String> {
    let fragment = Html::parse_fragment(html);
    let text: Vec<String> = fragment
        .root_element()
        .text()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    Ok(text.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(html: &str) -> ExtractionResult {
        ExtractionResult {
            html: html.to_string(),
            title: "Title".to_string(),
            byline: "Ada".to_string(),
            site_name: "Medium".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_preamble() {
        let mut result = result("<p>Body</p>");
        result.featured_image = Some("data:image/png;base64,AAAA".to_string());

        let markdown = render(&result).unwrap();

        assert!(markdown.starts_with(
            "# Title\n\n![](data:image/png;base64,AAAA)\n\n**Author** : Ada | **Source** : Medium\n\n---\n\n"
        ));
        assert!(markdown.contains("Body"));
    }

    #[test]
    fn test_preamble_without_meta() {
        let result = ExtractionResult { html: "<p>Body</p>".to_string(), ..Default::default() };

        let markdown = render(&result).unwrap();

        assert!(markdown.starts_with("# Article\n\nBody"));
        assert!(!markdown.contains("---"));
    }

    #[test]
    fn test_drops_script_and_style() {
        let markdown =
            render(&result("<p>Visible</p><script>var leaked = 1;</script><style>.leak { color: red }</style>")).unwrap();

        assert!(markdown.contains("Visible"));
        assert!(!markdown.contains("leaked"));
        assert!(!markdown.contains(".leak"));
    }

    #[test]
    fn test_drops_synthesized_header() {
        let html = r#"<div class="x-tractor-header"><h1 class="x-tractor-title">Title</h1></div><p>Body</p>"#;

        let markdown = render(&result(html)).unwrap();

        assert_eq!(markdown.matches("Title").count(), 1);
    }

    #[test]
    fn test_figure_with_caption() {
        let html = r#"<p>Before</p><figure><img src="https://host/a.png" alt="ignored"><figcaption> A cat </figcaption></figure><p>After</p>"#;

        let markdown = content_to_markdown(html).unwrap();

        assert!(markdown.contains("![A cat](https://host/a.png)\n_A cat_"));
        assert!(!markdown.contains(FIGURE_TOKEN));
        assert!(markdown.find("Before").unwrap() < markdown.find("![A cat]").unwrap());
        assert!(markdown.find("![A cat]").unwrap() < markdown.find("After").unwrap());
    }

    #[test]
    fn test_figure_without_caption_uses_alt() {
        let html = r#"<figure><img src="https://host/b.png" alt="Diagram"></figure><figure><p>Quote</p></figure>"#;

        let markdown = content_to_markdown(html).unwrap();

        assert!(markdown.contains("![Diagram](https://host/b.png)"));
        assert!(markdown.contains("Quote"));
        assert!(!markdown.contains(FIGURE_TOKEN));
    }

    #[cfg(feature = "markdown")]
    #[test]
    fn test_conversion_options() {
        let markdown = content_to_markdown("<h2>Section</h2><ul><li>One</li></ul><pre><code>let x = 1;</code></pre>").unwrap();

        assert!(markdown.contains("## Section"));
        assert!(markdown.contains("- One") || markdown.contains("-   One"));
        assert!(markdown.contains("```"));
    }
}
