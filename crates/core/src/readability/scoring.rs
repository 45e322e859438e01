//! Content scoring for readability candidates.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::Element;

static POSITIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story)")
        .expect("positive pattern should compile")
});

static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|share|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup|promo|newsletter)",
    )
    .expect("negative pattern should compile")
});

/// Weights used by [`calculate_score`].
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    pub positive_weight: f64,
    pub negative_weight: f64,
    /// Cap on the score earned from text length.
    pub max_char_density_score: f64,
    /// Cap on the score earned from commas.
    pub max_comma_density_score: f64,
    pub chars_per_point: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            positive_weight: 25.0,
            negative_weight: -25.0,
            max_char_density_score: 3.0,
            max_comma_density_score: 3.0,
            chars_per_point: 100,
        }
    }
}

/// Base score from the tag name.
pub fn base_tag_score(element: &Element<'_>) -> f64 {
    match element.tag_name().as_str() {
        "article" => 10.0,
        "section" => 8.0,
        "div" => 5.0,
        "td" | "blockquote" => 3.0,
        "form" | "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" | "footer" | "nav" => -5.0,
        _ => 0.0,
    }
}

/// Adjustment from `id` and `class` names. The id is checked first; a
/// positive match wins over a negative one on the same name.
pub fn class_id_weight(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let names = element
        .attr("id")
        .into_iter()
        .chain(element.attr("class").into_iter().flat_map(str::split_whitespace));

    for name in names {
        if POSITIVE.is_match(name) {
            return config.positive_weight;
        }
        if NEGATIVE.is_match(name) {
            return config.negative_weight;
        }
    }

    0.0
}

/// Score from text length and comma count, each capped.
pub fn content_density_score(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let text = element.text();
    let char_score = ((text.chars().count() / config.chars_per_point) as f64).min(config.max_char_density_score);
    let comma_score = (text.matches(',').count() as f64).min(config.max_comma_density_score);

    char_score + comma_score
}

/// Share of the element's text that sits inside links, from 0.0 to 1.0.
pub fn link_density(element: &Element<'_>) -> f64 {
    let text_length = element.text().chars().count();
    if text_length == 0 {
        return 0.0;
    }

    let link_length: usize = element
        .select("a")
        .unwrap_or_default()
        .iter()
        .map(|link| link.text().chars().count())
        .sum();

    link_length as f64 / text_length as f64
}

/// Final score: tag, class and density scores, damped by link density.
///
/// Link-heavy elements keep half the penalty when they carry a positive
/// name or more than 500 characters of text.
pub fn calculate_score(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let class_weight = class_id_weight(element, config);
    let raw = base_tag_score(element) + class_weight + content_density_score(element, config);

    let density = link_density(element);
    let lenient = class_weight > 0.0 || element.text().chars().count() > 500;
    let link_penalty = if lenient { 1.0 - density * 0.5 } else { 1.0 - density };

    raw * link_penalty
}
