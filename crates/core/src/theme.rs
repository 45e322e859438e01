//! Captured visual theme of the source page.

use serde::{Deserialize, Serialize};

use crate::parse::Element;

/// Background color, text color and font of the article body.
///
/// Fields are `None` when the page did not set them; the assembler falls
/// back to defaults for anything still missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub background_color: Option<String>,
    pub color: Option<String>,
    pub font_family: Option<String>,
}

impl Theme {
    /// White text on black, as X renders by default.
    pub fn dark() -> Self {
        Self { background_color: Some("#000".to_string()), color: Some("#fff".to_string()), font_family: None }
    }

    /// Black text on white.
    pub fn light() -> Self {
        Self { background_color: Some("#fff".to_string()), color: Some("#000".to_string()), font_family: None }
    }

    /// Reads the theme from an inline `style` declaration list.
    pub fn from_style_attr(style: &str) -> Self {
        let mut theme = Theme::default();

        for declaration in style.split(';') {
            let Some((property, value)) = declaration.split_once(':') else {
                continue;
            };
            let value = value.trim().trim_end_matches("!important").trim();
            if is_unset(value) {
                continue;
            }

            match property.trim().to_ascii_lowercase().as_str() {
                "background-color" | "background" => theme.background_color = Some(value.to_string()),
                "color" => theme.color = Some(value.to_string()),
                "font-family" => theme.font_family = Some(value.to_string()),
                _ => {}
            }
        }

        theme
    }

    /// Theme declared inline on `element`.
    pub fn from_element(element: &Element<'_>) -> Self {
        element.attr("style").map(Self::from_style_attr).unwrap_or_default()
    }

    /// Fills every missing field from `fallback`.
    pub fn or(self, fallback: Theme) -> Theme {
        Theme {
            background_color: self.background_color.or(fallback.background_color),
            color: self.color.or(fallback.color),
            font_family: self.font_family.or(fallback.font_family),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.background_color.is_none() && self.color.is_none() && self.font_family.is_none()
    }
}

/// Values a computed style reports for "nothing set".
fn is_unset(value: &str) -> bool {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    compact.is_empty()
        || compact.eq_ignore_ascii_case("transparent")
        || compact.eq_ignore_ascii_case("initial")
        || compact.eq_ignore_ascii_case("inherit")
        || compact == "rgba(0,0,0,0)"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_style_attr() {
        let theme = Theme::from_style_attr("color: rgb(231, 233, 234); background-color:#15202b; font-family: \"TwitterChirp\", sans-serif");

        assert_eq!(theme.color.as_deref(), Some("rgb(231, 233, 234)"));
        assert_eq!(theme.background_color.as_deref(), Some("#15202b"));
        assert_eq!(theme.font_family.as_deref(), Some("\"TwitterChirp\", sans-serif"));
    }

    #[test]
    fn test_transparent_counts_as_unset() {
        let theme = Theme::from_style_attr("background-color: rgba(0, 0, 0, 0); color: red !important");
        assert_eq!(theme.background_color, None);
        assert_eq!(theme.color.as_deref(), Some("red"));
    }

    #[test]
    fn test_or_fills_missing_fields() {
        let theme = Theme { color: Some("#333".to_string()), ..Default::default() }.or(Theme::dark());

        assert_eq!(theme.background_color.as_deref(), Some("#000"));
        assert_eq!(theme.color.as_deref(), Some("#333"));
        assert!(theme.font_family.is_none());
        assert!(Theme::default().is_empty());
    }
}
