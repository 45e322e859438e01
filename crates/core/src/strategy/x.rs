//! X (Twitter) status pages.

use std::time::Duration;

use crate::dom;
use crate::page::{Page, PageCondition, hard_wait, soft_wait};
use crate::parse::Document;
use crate::source::SourceKind;
use crate::strategy::{ExtractionResult, Waits};
use crate::theme::Theme;
use crate::{Result, XtractorError};

pub(crate) const TWEET_CONTAINER: &str = "[data-testid=\"tweet\"]";

const AUTHOR_NAME: &str = "[data-testid=\"User-Name\"]";

const SETTLE: Duration = Duration::from_secs(2);

/// Action bars and their buttons.
const NOISE: &[&str] = &[
    "[data-testid=\"reply\"]",
    "[data-testid=\"retweet\"]",
    "[data-testid=\"like\"]",
    "[data-testid=\"bookmark\"]",
    "[data-testid=\"share\"]",
    "[role=\"group\"]",
];

pub(crate) const EXTRA_CSS: &str = r#"
    /* Lift X's narrow column limits */
    [style*="max-width: 600px"],
    [style*="max-width:600px"],
    [style*="max-width: 598px"],
    [style*="max-width:598px"] {
      max-width: 100% !important;
    }
    article, article > div {
      max-width: 100% !important;
      width: 100% !important;
    }
"#;

#[derive(Debug, Clone, Copy, Default)]
pub struct XStrategy;

impl XStrategy {
    pub(crate) async fn wait_for_content(&self, page: &dyn Page, waits: &Waits) -> Result<()> {
        hard_wait("article", waits.essential, page.wait_for_selector("article", waits.essential)).await?;
        soft_wait("progress indicators", waits.soft, page.wait_for(&PageCondition::NoProgressIndicators, waits.soft))
            .await;
        page.settle(waits.settle_or(SETTLE)).await;

        let images = PageCondition::ImagesLoaded { scope: "article".to_string() };
        soft_wait("article images", waits.soft, page.wait_for(&images, waits.soft)).await;
        Ok(())
    }

    /// Captures the status around the first `article`.
    ///
    /// The capture root is the enclosing tweet container, or the article
    /// itself when there is none.
    pub(crate) fn extract(&self, doc: &Document) -> Result<ExtractionResult> {
        let article = doc
            .select_first("article")?
            .ok_or(XtractorError::NoArticleFound { kind: SourceKind::X })?;

        let root = match article.closest(TWEET_CONTAINER)? {
            Some(container) => container,
            None => {
                tracing::debug!("no tweet container, capturing the article itself");
                article
            }
        };

        let byline = article
            .select(AUTHOR_NAME)?
            .first()
            .map(|name| name.text().trim().to_string())
            .unwrap_or_default();

        let styles = doc
            .select("style")?
            .iter()
            .map(|style| style.text())
            .filter(|css| !css.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ExtractionResult {
            html: dom::strip(&root, NOISE),
            styles,
            title: doc.meta_content("og:title").or_else(|| doc.title()).unwrap_or_default(),
            byline,
            site_name: "X".to_string(),
            theme: Theme::from_element(&root).or(Theme::dark()),
            featured_image: None,
            header_included: false,
        })
    }
}
