//! Canvas capture: re-encode bitmaps the page already decoded.
//!
//! Used where network fetches are blocked but the rendered `<img>` elements
//! are available. An image can only be captured once it finished loading,
//! has a non-zero natural size, and its pixels are not tainted by another
//! origin.

use std::io::Cursor;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::inline::source::{EncodedImage, ImageSource};
use crate::page::RenderedImage;
use crate::{Result, XtractorError};

/// An [`ImageSource`] over live image bitmaps, exported as PNG.
#[derive(Debug, Clone, Default)]
pub struct CanvasImageSource {
    images: Vec<RenderedImage>,
}

impl CanvasImageSource {
    pub fn new(images: Vec<RenderedImage>) -> Self {
        Self { images }
    }

    fn rendered(&self, url: &str) -> Option<&RenderedImage> {
        self.images.iter().find(|image| image.src == url)
    }
}

#[async_trait]
impl ImageSource for CanvasImageSource {
    async fn fetch_image(&self, url: &str) -> Result<EncodedImage> {
        let failed = |reason: &str| XtractorError::ImageConversionFailed { url: url.to_string(), reason: reason.to_string() };

        let image = self.rendered(url).ok_or_else(|| failed("no rendered image element"))?;
        if !image.complete {
            return Err(failed("image has not finished loading"));
        }
        if image.natural_width == 0 || image.natural_height == 0 {
            return Err(failed("image has zero natural size"));
        }
        if !image.origin_clean {
            return Err(failed("bitmap is tainted by cross-origin data"));
        }

        Ok(EncodedImage::new("image/png", encode_png(image)?))
    }
}

fn encode_png(image: &RenderedImage) -> Result<Vec<u8>> {
    let bitmap = RgbaImage::from_raw(image.natural_width, image.natural_height, image.pixels.clone()).ok_or_else(|| {
        XtractorError::ImageEncodeError(format!(
            "{} bytes do not fill a {}x{} RGBA bitmap",
            image.pixels.len(),
            image.natural_width,
            image.natural_height
        ))
    })?;

    let mut png = Vec::new();
    DynamicImage::ImageRgba8(bitmap)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| XtractorError::ImageEncodeError(e.to_string()))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(src: &str) -> RenderedImage {
        RenderedImage {
            src: src.to_string(),
            complete: true,
            natural_width: 2,
            natural_height: 1,
            origin_clean: true,
            pixels: vec![255, 0, 0, 255, 0, 0, 255, 255],
        }
    }

    #[tokio::test]
    async fn test_exports_png() {
        let source = CanvasImageSource::new(vec![rendered("https://host/a.png")]);

        let image = source.fetch_image("https://host/a.png").await.unwrap();

        assert_eq!(image.mime, "image/png");
        assert_eq!(&image.bytes[..4], &[0x89, b'P', b'N', b'G']);
        assert!(image.to_data_uri().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[tokio::test]
    async fn test_refuses_unusable_bitmaps() {
        let pending = RenderedImage { complete: false, ..rendered("https://host/pending.png") };
        let empty = RenderedImage { natural_width: 0, pixels: vec![], ..rendered("https://host/empty.png") };
        let tainted = RenderedImage { origin_clean: false, ..rendered("https://cdn.other/t.png") };
        let source = CanvasImageSource::new(vec![pending, empty, tainted]);

        for url in [
            "https://host/pending.png",
            "https://host/empty.png",
            "https://cdn.other/t.png",
            "https://host/missing.png",
        ] {
            let err = source.fetch_image(url).await.unwrap_err();
            assert!(matches!(err, XtractorError::ImageConversionFailed { .. }), "{url}");
        }
    }

    #[tokio::test]
    async fn test_short_pixel_buffer() {
        let broken = RenderedImage { pixels: vec![0; 3], ..rendered("https://host/a.png") };
        let source = CanvasImageSource::new(vec![broken]);

        let err = source.fetch_image("https://host/a.png").await.unwrap_err();

        assert!(matches!(err, XtractorError::ImageEncodeError(_)));
    }
}
