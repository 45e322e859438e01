pub mod assemble;
pub mod dom;
pub mod error;
#[cfg(feature = "fetch")]
pub mod fetch;
pub mod inline;
pub mod metadata;
pub mod page;
pub mod parse;
pub mod pipeline;
pub mod readability;
pub mod session;
pub mod source;
pub mod strategy;
pub mod theme;

pub use assemble::{OutputFormat, assemble};
pub use error::{Result, XtractorError};
#[cfg(feature = "fetch")]
pub use fetch::{FetchConfig, HttpPage, fetch_file, fetch_stdin};
#[cfg(feature = "fetch")]
pub use inline::NetworkImageSource;
pub use inline::{
    CanvasImageSource, ChainedImageSource, EncodedImage, ImageFailure, ImageInliner, ImageSource, InlineReport,
    Inlined, collect_image_urls,
};
pub use page::{Page, PageCondition, RenderedImage, StaticPage};
pub use parse::{Document, Element};
pub use pipeline::{Extraction, Extractor, ExtractorConfig, ExtractorConfigBuilder};
pub use readability::{ArticleReader, Readability, ReadabilityConfig, ReadabilityConfigBuilder, ReadableArticle};
pub use session::{MemorySessionStore, SessionCookie, SessionCookies, SessionStore, is_login_surface, require_session};
pub use source::{SourceKind, classify, classify_url};
pub use strategy::{ExtractionResult, Strategy, Waits};
pub use theme::Theme;
