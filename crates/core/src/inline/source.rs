//! Image byte sources.
//!
//! The inliner only asks "give me the bytes behind this URL". Which source
//! answers depends on where the run happens: [`NetworkImageSource`] issues a
//! credentialed GET, [`super::CanvasImageSource`] re-encodes a bitmap the
//! page already decoded, and [`ChainedImageSource`] tries several in turn.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::{Result, XtractorError};

/// Image bytes with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { mime: mime.into(), bytes }
    }

    /// `data:<mime>;base64,<payload>`
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

/// Something that can produce the bytes of an image URL.
///
/// Each call is a single attempt; sources never retry.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_image(&self, url: &str) -> Result<EncodedImage>;
}

/// MIME type for image bytes: the declared `image/*` content type, else the
/// sniffed format, else `application/octet-stream`.
pub fn detect_mime(content_type: Option<&str>, bytes: &[u8]) -> String {
    let declared = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| value.starts_with("image/"));

    declared
        .or_else(|| image::guess_format(bytes).ok().map(|format| format.to_mime_type().to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Tries each source in order and returns the first success.
///
/// Fails with the last source's error when all of them fail.
#[derive(Clone, Default)]
pub struct ChainedImageSource {
    sources: Vec<Arc<dyn ImageSource>>,
}

impl ChainedImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, source: Arc<dyn ImageSource>) -> Self {
        self.sources.push(source);
        self
    }
}

#[async_trait]
impl ImageSource for ChainedImageSource {
    async fn fetch_image(&self, url: &str) -> Result<EncodedImage> {
        let mut last_error = XtractorError::ImageConversionFailed {
            url: url.to_string(),
            reason: "no image source configured".to_string(),
        };

        for source in &self.sources {
            match source.fetch_image(url).await {
                Ok(image) => return Ok(image),
                Err(err) => {
                    tracing::debug!(url, %err, "image source failed, trying next");
                    last_error = err;
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(feature = "fetch")]
pub use network::NetworkImageSource;

#[cfg(feature = "fetch")]
mod network {
    use std::sync::Arc;

    use async_trait::async_trait;
    use reqwest::Client;
    use reqwest::cookie::Jar;
    use reqwest::header::CONTENT_TYPE;

    use super::{EncodedImage, ImageSource, detect_mime};
    use crate::fetch::{FetchConfig, build_client, map_send_error};
    use crate::{Result, XtractorError};

    /// Fetches images over HTTP with the page's credentials.
    #[derive(Debug, Clone)]
    pub struct NetworkImageSource {
        client: Client,
        config: FetchConfig,
    }

    impl NetworkImageSource {
        /// Uses `client` as is, so cookies in its jar go out with every request.
        pub fn with_client(client: Client, config: &FetchConfig) -> Self {
            Self { client, config: config.clone() }
        }

        /// A source with its own empty cookie jar.
        pub fn new(config: &FetchConfig) -> Result<Self> {
            let client = build_client(config, Arc::new(Jar::default()))?;
            Ok(Self::with_client(client, config))
        }
    }

    #[async_trait]
    impl ImageSource for NetworkImageSource {
        async fn fetch_image(&self, url: &str) -> Result<EncodedImage> {
            let response = self
                .client
                .get(url)
                .header("Accept", "image/avif,image/webp,image/*,*/*;q=0.8")
                .send()
                .await
                .map_err(|e| map_send_error(e, url, &self.config))?;

            let status = response.status();
            if !status.is_success() {
                return Err(XtractorError::HttpStatus { url: url.to_string(), status: status.as_u16() });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let bytes = response.bytes().await?;

            Ok(EncodedImage::new(detect_mime(content_type.as_deref(), &bytes), bytes.to_vec()))
        }
    }
}
