//! Medium stories, on medium.com and on custom publication domains.

use std::time::Duration;

use crate::dom;
use crate::page::{Page, PageCondition, soft_wait};
use crate::parse::Document;
use crate::source::SourceKind;
use crate::strategy::{ExtractionResult, Waits};
use crate::theme::Theme;
use crate::{Result, XtractorError};

/// Story containers, current layout first.
const CONTAINERS: &[&str] = &[
    "article",
    "[data-testid=\"storyContent\"]",
    ".meteredContent",
    ".postArticle-content",
];

const NOISE: &[&str] = &[
    "nav",
    "header:not(article header)",
    "[data-testid=\"headerSocialActions\"]",
    "[data-testid=\"postSidebarActions\"]",
    "[data-testid=\"audioPlayButton\"]",
    "[role=\"tooltip\"]",
    "[data-testid=\"popover\"]",
    "button[data-testid=\"headerFollowButton\"]",
    "[data-testid=\"post-end-cta\"]",
    "[data-testid=\"belowPostTagsPrompt\"]",
    "[data-testid=\"recommendedPosts\"]",
    "[aria-label=\"recommendations\"]",
    "[data-testid=\"responses\"]",
    "[data-testid=\"metered-paywall\"]",
];

const SETTLE: Duration = Duration::from_millis(1500);

pub(crate) const EXTRA_CSS: &str = r#"
    /* Medium story layout */
    article { max-width: 100% !important; }
    figure { margin: 2em 0; }
    figure img { display: block; margin: 0 auto; }
    figcaption {
      text-align: center;
      font-size: 0.875em;
      opacity: 0.7;
      margin-top: 0.5em;
    }
    pre {
      background: rgba(128,128,128,0.1);
      padding: 1em;
      border-radius: 4px;
      overflow-x: auto;
    }
    blockquote {
      border-left: 3px solid currentColor;
      margin-left: 0;
      padding-left: 1.5em;
      opacity: 0.85;
    }
"#;

#[derive(Debug, Clone, Copy, Default)]
pub struct MediumStrategy;

impl MediumStrategy {
    pub(crate) async fn wait_for_content(&self, page: &dyn Page, waits: &Waits) {
        soft_wait("article", waits.essential, page.wait_for_selector("article", waits.essential)).await;

        let images = PageCondition::ImagesLoaded { scope: "article".to_string() };
        soft_wait("article images", waits.soft, page.wait_for(&images, waits.soft)).await;
        page.settle(waits.settle_or(SETTLE)).await;
    }

    pub(crate) fn extract(&self, doc: &Document) -> Result<ExtractionResult> {
        let mut container = None;
        for selector in CONTAINERS {
            if let Some(found) = doc.select_first(selector)? {
                tracing::debug!(selector, "medium container matched");
                container = Some(found);
                break;
            }
        }
        let container = container.ok_or(XtractorError::NoArticleFound { kind: SourceKind::Medium })?;

        let title = doc
            .meta_content("og:title")
            .or_else(|| doc.title())
            .unwrap_or_else(|| "Medium Article".to_string());
        let byline = doc
            .meta_content("author")
            .or_else(|| doc.extract_byline())
            .unwrap_or_default();

        Ok(ExtractionResult {
            html: dom::strip(&container, NOISE),
            styles: String::new(),
            title,
            byline,
            site_name: "Medium".to_string(),
            theme: Theme::light(),
            featured_image: None,
            header_included: false,
        })
    }
}
