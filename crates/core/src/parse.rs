//! HTML parsing and DOM querying.
//!
//! This module provides the [`Document`] and [`Element`] types used by every
//! strategy to query a page snapshot with CSS selectors.
//!
//! # Example
//!
//! ```rust
//! use xtractor_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <head><meta property="og:title" content="Hello"></head>
//!         <body><main><p class="content">Paragraph</p></main></body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html).unwrap();
//! assert_eq!(doc.meta_content("og:title"), Some("Hello".to_string()));
//! assert_eq!(doc.select("p.content").unwrap().len(), 1);
//! ```

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::{Result, XtractorError};

/// Parse a CSS selector, mapping failures to [`XtractorError::HtmlParseError`].
pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| XtractorError::HtmlParseError(format!("Invalid selector {selector:?}: {e}")))
}

/// A parsed page snapshot.
///
/// A Document is immutable: strategies read from it and produce new markup
/// strings, so the page it was taken from is never touched.
///
/// # Example
///
/// ```rust
/// use xtractor_core::parse::Document;
///
/// let doc = Document::parse("<title> Saved story </title><article><p>Body</p></article>").unwrap();
/// assert_eq!(doc.title().as_deref(), Some("Saved story"));
/// assert!(doc.exists("article"));
/// ```
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML from a string.
    pub fn parse(html: &str) -> Result<Self> {
        let html = Html::parse_document(html);
        Ok(Self { html, base_url: None })
    }

    /// Parses HTML that was served from `url`.
    ///
    /// # Errors
    ///
    /// Returns [`XtractorError::InvalidUrl`] if the URL cannot be parsed.
    pub fn parse_with_url(html: &str, url: &str) -> Result<Self> {
        let base_url = Url::parse(url).map_err(|e| XtractorError::InvalidUrl(e.to_string()))?;
        let html = Html::parse_document(html);
        Ok(Self { html, base_url: Some(base_url) })
    }

    /// Gets the URL the document was loaded from.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Gets the underlying `scraper::Html`.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Serializes the entire document.
    pub fn as_string(&self) -> String {
        self.html.html()
    }

    /// All elements matching a CSS selector, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`XtractorError::HtmlParseError`] if the selector is invalid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use xtractor_core::parse::Document;
    ///
    /// let doc = Document::parse(r#"<figure><img src="a.png"></figure><img src="b.png">"#).unwrap();
    /// let images = doc.select("img[src]").unwrap();
    /// assert_eq!(images.len(), 2);
    /// assert_eq!(images[1].attr("src"), Some("b.png"));
    /// ```
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).map(Element::new).collect())
    }

    /// Selects the first element matching a CSS selector, in document order.
    pub fn select_first(&'_ self, selector: &str) -> Result<Option<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).next().map(Element::new))
    }

    /// Whether any element matches. Invalid selectors match nothing.
    pub fn exists(&self, selector: &str) -> bool {
        matches!(self.select_first(selector), Ok(Some(_)))
    }

    /// Attribute value of the first element matching `selector`.
    pub fn first_attr(&self, selector: &str, attr: &str) -> Option<String> {
        self.select_first(selector)
            .ok()
            .flatten()
            .and_then(|el| el.attr(attr).map(str::to_string))
    }

    /// Content of a `<meta>` tag looked up by `name`, then by `property`.
    ///
    /// Blank values count as absent.
    pub fn meta_content(&self, key: &str) -> Option<String> {
        ["name", "property"].iter().find_map(|attr| {
            self.first_attr(&format!("meta[{attr}=\"{key}\"]"), "content")
                .map(|content| content.trim().to_string())
                .filter(|content| !content.is_empty())
        })
    }

    /// Gets the trimmed text of the `<title>` element, if present and non-blank.
    pub fn title(&self) -> Option<String> {
        let title = self.select_first("title").ok().flatten()?.text();
        let title = title.trim();
        if title.is_empty() { None } else { Some(title.to_string()) }
    }

    /// Hostname of the document URL.
    pub fn hostname(&self) -> Option<String> {
        self.base_url.as_ref()?.host_str().map(str::to_string)
    }

    /// Concatenated text of the whole document.
    pub fn text_content(&self) -> String {
        self.html.root_element().text().collect()
    }
}

/// A node of a [`Document`], borrowed from it.
///
/// # Example
///
/// ```rust
/// use xtractor_core::parse::Document;
///
/// let doc = Document::parse(r#"<div data-testid="tweet"><article>Post</article></div>"#).unwrap();
/// let article = doc.select_first("article").unwrap().unwrap();
///
/// let root = article.closest(r#"[data-testid="tweet"]"#).unwrap().unwrap();
/// assert_eq!(root.tag_name(), "div");
/// assert_eq!(article.text(), "Post");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    pub(crate) fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    pub(crate) fn element_ref(&self) -> ElementRef<'a> {
        self.element
    }

    /// Gets the HTML inside this element.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Gets the HTML of this element including its own tags.
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Gets the concatenated text of this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Number of characters of trimmed text.
    pub fn text_len(&self) -> usize {
        self.text().trim().chars().count()
    }

    /// Attribute value, borrowed from the document.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Gets the lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Parent element, if any.
    pub fn parent(&self) -> Option<Element<'a>> {
        self.element.parent().and_then(ElementRef::wrap).map(Element::new)
    }

    /// Element children, skipping text and comment nodes.
    pub fn children(&self) -> Vec<Element<'a>> {
        self.element.child_elements().map(Element::new).collect()
    }

    /// Nearest inclusive ancestor matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`XtractorError::HtmlParseError`] if the selector is invalid.
    pub fn closest(&self, selector: &str) -> Result<Option<Element<'a>>> {
        let sel = parse_selector(selector)?;
        if sel.matches(&self.element) {
            return Ok(Some(*self));
        }

        Ok(self
            .element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|ancestor| sel.matches(ancestor))
            .map(Element::new))
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`XtractorError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = parse_selector(selector)?;
        Ok(self.element.select(&sel).map(Element::new).collect())
    }
}
