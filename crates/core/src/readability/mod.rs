//! Boilerplate removal.
//!
//! The Generic strategy depends only on the [`ArticleReader`] contract: given
//! a document, return the main content with its title and byline, or `None`
//! when no confident extraction is possible. [`Readability`] is the bundled
//! implementation, a density-based scorer that works on a cleaned copy of
//! the document.
//!
//! # Example
//!
//! ```rust
//! use xtractor_core::parse::Document;
//! use xtractor_core::readability::{ArticleReader, Readability, ReadabilityConfig};
//!
//! let html = "<html><body><nav><a href='/'>Home</a></nav></body></html>";
//! let doc = Document::parse(html).unwrap();
//!
//! let reader = Readability::with_config(ReadabilityConfig::builder().min_score(25.0).build());
//! assert!(reader.parse(&doc).unwrap().is_none());
//! ```

pub mod postprocess;
pub mod preprocess;
pub mod scoring;

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::Result;
use crate::parse::{Document, Element};
use postprocess::{PostProcessConfig, postprocess_html};
use preprocess::{PreprocessConfig, preprocess_html};
use scoring::{ScoreConfig, calculate_score, link_density};

/// Tags that can hold the main content.
const CANDIDATE_SELECTOR: &str = "div, article, section, main, p, td, pre, blockquote";

/// Content found by an [`ArticleReader`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReadableArticle {
    /// Cleaned content markup.
    pub content: String,
    pub title: Option<String>,
    pub byline: Option<String>,
}

/// A boilerplate-removal capability.
///
/// Implementations must not modify `doc`. `Ok(None)` means "nothing
/// confident"; errors are treated the same way by callers.
pub trait ArticleReader: Send + Sync {
    fn parse(&self, doc: &Document) -> Result<Option<ReadableArticle>>;
}

/// Configuration for [`Readability`].
///
/// # Example
///
/// ```rust
/// use xtractor_core::readability::ReadabilityConfig;
///
/// let config = ReadabilityConfig::builder()
///     .min_score(25.0)
///     .char_threshold(500)
///     .build();
/// assert_eq!(config.nb_top_candidates, 5);
/// ```
#[derive(Debug, Clone)]
pub struct ReadabilityConfig {
    /// Minimum score the top candidate needs (default: 20.0).
    pub min_score: f64,

    /// Candidates other than article/section/main need a tenth of this many
    /// characters to be scored (default: 500).
    pub char_threshold: usize,

    /// Candidates kept when comparing (default: 5).
    pub nb_top_candidates: usize,

    /// Maximum candidates to score; 0 means unlimited (default: 0).
    pub max_elems_to_parse: usize,

    /// Whether to unwrap chrome-looking elements before scoring (default: true).
    pub remove_unlikely: bool,

    /// Whether to keep class attributes in the output (default: false).
    pub keep_classes: bool,

    /// Siblings scoring at least this share of the top score are merged in (default: 0.2).
    pub sibling_threshold: f64,
}

impl Default for ReadabilityConfig {
    fn default() -> Self {
        Self {
            min_score: 20.0,
            char_threshold: 500,
            nb_top_candidates: 5,
            max_elems_to_parse: 0,
            remove_unlikely: true,
            keep_classes: false,
            sibling_threshold: 0.2,
        }
    }
}

impl ReadabilityConfig {
    pub fn builder() -> ReadabilityConfigBuilder {
        ReadabilityConfigBuilder::new()
    }
}

/// Builder for [`ReadabilityConfig`].
#[derive(Debug, Default)]
pub struct ReadabilityConfigBuilder {
    config: ReadabilityConfig,
}

impl ReadabilityConfigBuilder {
    pub fn new() -> Self {
        Self { config: ReadabilityConfig::default() }
    }

    pub fn min_score(mut self, value: f64) -> Self {
        self.config.min_score = value;
        self
    }

    pub fn char_threshold(mut self, value: usize) -> Self {
        self.config.char_threshold = value;
        self
    }

    pub fn nb_top_candidates(mut self, value: usize) -> Self {
        self.config.nb_top_candidates = value;
        self
    }

    pub fn max_elems_to_parse(mut self, value: usize) -> Self {
        self.config.max_elems_to_parse = value;
        self
    }

    pub fn remove_unlikely(mut self, value: bool) -> Self {
        self.config.remove_unlikely = value;
        self
    }

    pub fn keep_classes(mut self, value: bool) -> Self {
        self.config.keep_classes = value;
        self
    }

    pub fn sibling_threshold(mut self, value: f64) -> Self {
        self.config.sibling_threshold = value;
        self
    }

    pub fn build(self) -> ReadabilityConfig {
        self.config
    }
}

/// Density-based [`ArticleReader`].
#[derive(Debug, Clone, Default)]
pub struct Readability {
    config: ReadabilityConfig,
}

struct Candidate<'a> {
    element: Element<'a>,
    score: f64,
    order: usize,
}

impl Readability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReadabilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReadabilityConfig {
        &self.config
    }

    /// Scores every candidate and propagates half of each score to the
    /// parent and a third to the grandparent.
    fn score_candidates<'a>(&self, doc: &'a Document) -> Result<Vec<Candidate<'a>>> {
        let score_config = ScoreConfig::default();
        let limit = match self.config.max_elems_to_parse {
            0 => usize::MAX,
            n => n,
        };
        let min_chars = self.config.char_threshold / 10;

        let mut scored: HashMap<_, Candidate<'a>> = HashMap::new();
        let ensure = |element: Element<'a>, scored: &mut HashMap<_, Candidate<'a>>| -> f64 {
            let next = scored.len();
            scored
                .entry(element.element_ref().id())
                .or_insert_with(|| Candidate { element, score: calculate_score(&element, &score_config), order: next })
                .score
        };

        for element in doc.select(CANDIDATE_SELECTOR)?.into_iter().take(limit) {
            let structural = matches!(element.tag_name().as_str(), "article" | "section" | "main");
            if !structural && element.text_len() < min_chars {
                continue;
            }

            let score = ensure(element, &mut scored);

            let parent = element.parent();
            let grandparent = parent.and_then(|p| p.parent());
            for (ancestor, divisor) in [(parent, 2.0), (grandparent, 3.0)] {
                let Some(ancestor) = ancestor.filter(|a| !matches!(a.tag_name().as_str(), "html" | "body")) else {
                    continue;
                };
                ensure(ancestor, &mut scored);
                if let Some(candidate) = scored.get_mut(&ancestor.element_ref().id()) {
                    candidate.score += score / divisor;
                }
            }
        }

        let mut candidates: Vec<Candidate<'a>> = scored.into_values().collect();
        candidates.sort_by(|a, b| compare_candidates(b, a));
        candidates.truncate(self.config.nb_top_candidates.max(1));
        Ok(candidates)
    }

    /// Top candidate plus qualifying siblings, in document order.
    fn gather_content(&self, top: &Candidate<'_>, candidates: &[Candidate<'_>]) -> String {
        let Some(parent) = top.element.parent() else {
            return top.element.outer_html();
        };
        let threshold = (top.score * self.config.sibling_threshold).max(10.0);

        let mut content = String::new();
        for sibling in parent.children() {
            let include = if sibling == top.element {
                true
            } else if let Some(candidate) = candidates.iter().find(|c| c.element == sibling) {
                candidate.score >= threshold
            } else if sibling.tag_name() == "p" {
                sibling.text_len() > 80 && link_density(&sibling) < 0.25
            } else {
                false
            };

            if include {
                content.push_str(&sibling.outer_html());
            }
        }
        content
    }
}

impl ArticleReader for Readability {
    fn parse(&self, doc: &Document) -> Result<Option<ReadableArticle>> {
        let cleaned = preprocess_html(
            &doc.as_string(),
            &PreprocessConfig {
                remove_unlikely: self.config.remove_unlikely,
                base_url: doc.base_url().cloned(),
                ..Default::default()
            },
        );
        let copy = Document::parse(&cleaned)?;

        let candidates = self.score_candidates(&copy)?;
        let Some(top) = candidates.first() else {
            tracing::debug!("readability found no candidates");
            return Ok(None);
        };
        if top.score < self.config.min_score {
            tracing::debug!(score = top.score, threshold = self.config.min_score, "readability candidate too weak");
            return Ok(None);
        }

        let content = postprocess_html(
            &self.gather_content(top, &candidates),
            &PostProcessConfig { keep_classes: self.config.keep_classes, ..Default::default() },
        );
        if Document::parse(&content)?.text_content().trim().is_empty() {
            return Ok(None);
        }

        tracing::debug!(tag = %top.element.tag_name(), score = top.score, "readability selected content");
        Ok(Some(ReadableArticle { content, title: doc.article_title(), byline: doc.extract_byline() }))
    }
}

/// Orders by score, then container priority, then text length, then
/// earlier discovery.
fn compare_candidates(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    a.score
        .partial_cmp(&b.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| candidate_priority(&a.element).cmp(&candidate_priority(&b.element)))
        .then_with(|| a.element.text_len().cmp(&b.element.text_len()))
        .then_with(|| b.order.cmp(&a.order))
}

fn candidate_priority(element: &Element<'_>) -> u8 {
    match element.tag_name().as_str() {
        "article" | "main" | "section" => 3,
        "div" => 2,
        _ => 1,
    }
}
