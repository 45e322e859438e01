//! Standalone HTML output.

use std::sync::LazyLock;

use regex::Regex;

use crate::assemble::escape;
use crate::dom;
use crate::strategy::ExtractionResult;
use crate::strategy::generic::starts_with_heading;

const FALLBACK_FONT: &str = r#"-apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif"#;

static STYLE_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</style").expect("style close pattern should compile"));

static TITLE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<title[\s>]").expect("title tag pattern should compile"));

const BASE_CSS: &str = r#"
    * {
      box-sizing: border-box;
    }

    .article-container {
      max-width: 100%;
      margin: 0 auto;
      padding: 20px 40px;
    }

    .x-tractor-featured {
      margin: 0 0 1.5em 0;
      text-align: center;
    }
    .x-tractor-featured img {
      max-width: 100%;
      height: auto;
      border-radius: 4px;
    }

    .x-tractor-title {
      margin: 0 0 0.3em 0;
      line-height: 1.2;
    }

    .article-meta {
      margin-bottom: 1.5em;
      padding-bottom: 1em;
      border-bottom: 1px solid rgba(128,128,128,0.3);
      font-size: 0.9em;
      opacity: 0.7;
    }
    .article-source {
      font-weight: bold;
      margin-right: 1em;
    }

    img {
      max-width: 100%;
      height: auto;
    }
"#;

/// Renders the full document.
///
/// Layout: reset and container rules, body rules from the theme, the
/// captured page CSS, then `extra_css`. Title, byline and site name are
/// escaped wherever they are interpolated.
pub fn render(result: &ExtractionResult, extra_css: &str) -> String {
    let theme = &result.theme;
    let background = css_value(theme.background_color.as_deref().unwrap_or("#fff"));
    let color = css_value(theme.color.as_deref().unwrap_or("#000"));
    let font = css_value(theme.font_family.as_deref().unwrap_or(FALLBACK_FONT));

    let content = without_title_elements(&result.html);
    let header = if result.header_included { String::new() } else { header(result, &content) };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title} - {site}</title>
  <style>{BASE_CSS}
    body {{
      margin: 0;
      padding: 20px;
      background-color: {background};
      color: {color};
      font-family: {font};
      line-height: 1.6;
    }}

    /* Page styles */
    {styles}

    /* Source overrides */
    {extra_css}
  </style>
</head>
<body>
  <div class="article-container">
    {header}
    {content}
  </div>
</body>
</html>
"#,
        title = escape(&result.title),
        site = escape(&result.site_name),
        styles = contain_css(&result.styles),
        extra_css = contain_css(extra_css),
    )
}

/// Featured image, title heading and the source/author line.
fn header(result: &ExtractionResult, content: &str) -> String {
    let mut header = String::new();

    if let Some(src) = &result.featured_image {
        header.push_str(&format!(r#"<figure class="x-tractor-featured"><img src="{}" alt=""></figure>"#, escape(src)));
    }
    if !result.title.is_empty() && !starts_with_heading(content) {
        header.push_str(&format!(r#"<h1 class="x-tractor-title">{}</h1>"#, escape(&result.title)));
    }
    if !result.byline.is_empty() {
        header.push_str(&format!(
            r#"<div class="article-meta"><span class="article-source">{}</span><span class="article-author">{}</span></div>"#,
            escape(&result.site_name),
            escape(&result.byline)
        ));
    }

    header
}

/// Keeps captured CSS from closing the `<style>` element early.
fn contain_css(css: &str) -> String {
    STYLE_CLOSE.replace_all(css, r"<\/style").into_owned()
}

/// Drops characters that would end a declaration or the style block.
fn css_value(value: &str) -> String {
    value.chars().filter(|c| !matches!(c, ';' | '{' | '}' | '<' | '>')).collect()
}

/// Removes `<title>` elements embedded in content, e.g. inside inline SVG icons.
fn without_title_elements(html: &str) -> String {
    if TITLE_TAG.is_match(html) { dom::strip_fragment(html, &["title"]) } else { html.to_string() }
}
