//! Final document assembly.
//!
//! Turns an [`ExtractionResult`] into the artifact the caller writes out: a
//! standalone HTML page styled with the captured theme, or a Markdown file.

pub mod html;
pub mod markdown;

use std::fmt;
use std::str::FromStr;

use crate::Result;
use crate::strategy::ExtractionResult;

/// Artifact formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Self-contained HTML document.
    #[default]
    Html,
    /// Markdown with a title/byline preamble.
    Markdown,
}

impl OutputFormat {
    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "md",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Html => "html",
            OutputFormat::Markdown => "markdown",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(OutputFormat::Html),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown format {other:?}, expected html or markdown")),
        }
    }
}

/// Renders `result` as `format`. `extra_css` is only used by HTML output.
pub fn assemble(result: &ExtractionResult, format: OutputFormat, extra_css: &str) -> Result<String> {
    match format {
        OutputFormat::Html => Ok(html::render(result, extra_css)),
        OutputFormat::Markdown => markdown::render(result),
    }
}

/// Escapes `& < > " '` for use in element text and quoted attributes.
pub(crate) fn escape(text: &str) -> String {
    html_escape::encode_quoted_attribute(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("HTML".parse::<OutputFormat>(), Ok(OutputFormat::Html));
        assert_eq!("md".parse::<OutputFormat>(), Ok(OutputFormat::Markdown));
        assert_eq!("markdown".parse::<OutputFormat>(), Ok(OutputFormat::Markdown));
        assert!("pdf".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Markdown.extension(), "md");
    }

    #[test]
    fn test_escape_five_characters() {
        let escaped = escape(r#"<a href="x">Tom & Jerry's</a>"#);

        assert!(escaped.starts_with("&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry"));
        assert!(escaped.ends_with("s&lt;/a&gt;"));
        for raw in ['<', '>', '"', '\''] {
            assert!(!escaped.contains(raw), "{raw} left unescaped");
        }
    }

    #[test]
    fn test_assemble_dispatch() {
        let result = ExtractionResult {
            html: "<p>Body</p>".to_string(),
            title: "Title".to_string(),
            site_name: "Site".to_string(),
            ..Default::default()
        };

        assert!(assemble(&result, OutputFormat::Html, "").unwrap().starts_with("<!DOCTYPE html>"));
        assert!(assemble(&result, OutputFormat::Markdown, "").unwrap().starts_with("# Title"));
    }
}
