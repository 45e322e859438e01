//! Error types for extraction runs.
//!
//! [`XtractorError`] covers every failure the pipeline can report. Most
//! variants abort a run; two of them ([`XtractorError::ImageConversionFailed`]
//! and [`XtractorError::ReadabilityUnavailable`]) are produced and consumed
//! internally and never reach the caller as the result of a run.
//!
//! # Example
//!
//! ```rust
//! use xtractor_core::{SourceKind, XtractorError};
//!
//! let err = XtractorError::NoArticleFound { kind: SourceKind::Medium };
//! assert!(err.is_fatal());
//! assert!(err.to_string().contains("Medium"));
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::source::SourceKind;

/// Main error type for extraction operations.
#[derive(Error, Debug)]
pub enum XtractorError {
    /// The source-specific selector found no article container.
    #[error("No article found on this {kind} page")]
    NoArticleFound { kind: SourceKind },

    /// Neither readability nor the selector heuristic found a content root.
    #[error("No main content found on this {kind} page")]
    NoMainContentFound { kind: SourceKind },

    /// An authenticated session is needed but none is stored.
    #[error("SESSION_REQUIRED: no saved session for this source. {hint}")]
    SessionRequired { hint: String },

    /// The stored session no longer authenticates; the page redirected to a login surface.
    #[error("SESSION_EXPIRED: the saved session has expired. {hint}")]
    SessionExpired { hint: String },

    /// A single image could not be inlined. Never aborts a run.
    #[error("Could not convert image {url}: {reason}")]
    ImageConversionFailed { url: String, reason: String },

    /// The readability engine produced nothing usable. Triggers the selector heuristic.
    #[error("Readability unavailable: {0}")]
    ReadabilityUnavailable(String),

    /// HTTP request errors from reqwest.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Non-2xx HTTP status.
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// An essential wait or a request exceeded its time budget.
    #[error("Timed out after {timeout_ms} ms waiting for {what}")]
    Timeout { what: String, timeout_ms: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML parsing errors, usually an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// Bitmap export failed during canvas capture.
    #[error("Failed to encode image: {0}")]
    ImageEncodeError(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File I/O errors.
    #[error("Failed to write to file: {0}")]
    WriteError(#[from] std::io::Error),

    /// The credential store could not be read or written.
    #[error("Session store error: {0}")]
    SessionStoreError(String),
}

impl XtractorError {
    /// Whether this error aborts an extraction run.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            XtractorError::ImageConversionFailed { .. } | XtractorError::ReadabilityUnavailable(_)
        )
    }

    /// Source kind attached to selection failures, if any.
    pub fn source_kind(&self) -> Option<SourceKind> {
        match self {
            XtractorError::NoArticleFound { kind } | XtractorError::NoMainContentFound { kind } => Some(*kind),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for XtractorError {
    fn from(err: serde_json::Error) -> Self {
        XtractorError::SessionStoreError(err.to_string())
    }
}

/// Result type alias for XtractorError.
pub type Result<T> = std::result::Result<T, XtractorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = XtractorError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_selection_errors_carry_source() {
        let err = XtractorError::NoMainContentFound { kind: SourceKind::Generic };
        assert_eq!(err.source_kind(), Some(SourceKind::Generic));
        assert!(err.to_string().contains("Web"));
    }

    #[test]
    fn test_non_fatal_errors() {
        let image = XtractorError::ImageConversionFailed {
            url: "https://host/a.png".to_string(),
            reason: "HTTP 404".to_string(),
        };
        assert!(!image.is_fatal());
        assert!(!XtractorError::ReadabilityUnavailable("no candidate".to_string()).is_fatal());
        assert!(XtractorError::SessionRequired { hint: String::new() }.is_fatal());
    }

    #[test]
    fn test_session_messages_have_markers() {
        let required = XtractorError::SessionRequired { hint: "run --import-cookies".to_string() };
        assert!(required.to_string().starts_with("SESSION_REQUIRED"));
        assert!(required.to_string().contains("--import-cookies"));

        let expired = XtractorError::SessionExpired { hint: String::new() };
        assert!(expired.to_string().starts_with("SESSION_EXPIRED"));
    }

    #[test]
    fn test_timeout_error() {
        let err = XtractorError::Timeout { what: "article".to_string(), timeout_ms: 30_000 };
        assert!(err.to_string().contains("30000"));
        assert!(err.to_string().contains("article"));
    }
}
