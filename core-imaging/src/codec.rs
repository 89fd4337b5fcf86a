//! Image codec
//!
//! Turns arbitrary image bytes into a bounded, embeddable `data:` URL:
//!
//! 1. Decode
//! 2. Scale down to `max_width` (aspect ratio kept), never up
//! 3. PNG when the image really uses transparency, otherwise flatten onto the
//!    background colour and encode JPEG at the configured quality
//!
//! Decoding and encoding run on the blocking pool.

use crate::data_url::{decode_data_url, encode_data_url};
use crate::error::{ImagingError, Result};
use core_runtime::config::CodecSettings;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodecOptions {
    pub max_width: u32,
    /// Lossy quality factor in `(0, 1]`
    pub quality: f32,
    /// Colour that transparent pixels are composited onto before JPEG encoding
    pub background: [u8; 3],
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            max_width: 800,
            quality: 0.85,
            background: [255, 255, 255],
        }
    }
}

impl From<&CodecSettings> for CodecOptions {
    fn from(settings: &CodecSettings) -> Self {
        Self {
            max_width: settings.max_width,
            quality: settings.quality,
            ..Self::default()
        }
    }
}

impl CodecOptions {
    /// JPEG quality on the 1..=100 scale
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data_url: String,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ImageCodec {
    options: CodecOptions,
}

impl ImageCodec {
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    /// Output size for a `width × height` source.
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        let max_width = self.options.max_width;
        if width <= max_width {
            return (width, height);
        }

        let scaled = (height as f64 * max_width as f64 / width as f64).round();
        (max_width, (scaled as u32).max(1))
    }

    /// Encode raw image bytes on the calling thread.
    pub fn encode_blocking(&self, bytes: &[u8]) -> Result<EncodedImage> {
        let source =
            image::load_from_memory(bytes).map_err(|e| ImagingError::Decode(e.to_string()))?;

        let (width, height) = self.target_dimensions(source.width(), source.height());
        let resized = if (width, height) == (source.width(), source.height()) {
            source
        } else {
            source.resize_exact(width, height, FilterType::Lanczos3)
        };

        let (format, encoded) = if has_transparency(&resized) {
            (OutputFormat::Png, encode_png(resized.to_rgba8())?)
        } else {
            let flattened = flatten(&resized, self.options.background);
            (
                OutputFormat::Jpeg,
                encode_jpeg(&flattened, self.options.jpeg_quality())?,
            )
        };

        debug!(
            width,
            height,
            format = format.mime_type(),
            input_bytes = bytes.len(),
            output_bytes = encoded.len(),
            "Encoded image"
        );

        Ok(EncodedImage {
            data_url: encode_data_url(format.mime_type(), &encoded),
            format,
            width,
            height,
        })
    }

    /// Encode raw image bytes on the blocking pool.
    pub async fn encode(&self, bytes: Vec<u8>) -> Result<EncodedImage> {
        let codec = self.clone();
        tokio::task::spawn_blocking(move || codec.encode_blocking(&bytes))
            .await
            .map_err(|e| ImagingError::Task(e.to_string()))?
    }

    /// Re-encode an image that is already stored as a `data:` URL.
    pub async fn recompress(&self, data_url: &str) -> Result<EncodedImage> {
        let decoded = decode_data_url(data_url)?;
        self.encode(decoded.data).await
    }
}

/// True when the colour type has an alpha channel and at least one pixel uses it.
fn has_transparency(image: &DynamicImage) -> bool {
    image.color().has_alpha() && image.to_rgba8().pixels().any(|pixel| pixel[3] < 255)
}

/// Composite onto an opaque background.
fn flatten(image: &DynamicImage, background: [u8; 3]) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let pixel = rgba.get_pixel(x, y);
        let alpha = pixel[3] as u32;
        let mut out = [0u8; 3];
        for channel in 0..3 {
            let blended =
                pixel[channel] as u32 * alpha + background[channel] as u32 * (255 - alpha);
            out[channel] = ((blended + 127) / 255) as u8;
        }
        image::Rgb(out)
    })
}

fn encode_png(image: RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| ImagingError::Encode(e.to_string()))?;
    Ok(buffer)
}

fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .encode_image(image)
        .map_err(|e| ImagingError::Encode(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_url::decode_data_url;
    use image::{GenericImageView, Rgb, Rgba};

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn opaque_png(width: u32, height: u32) -> Vec<u8> {
        png_bytes(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([30, 120, 200, 255]),
        )))
    }

    fn decode_output(encoded: &EncodedImage) -> DynamicImage {
        let payload = decode_data_url(&encoded.data_url).unwrap();
        image::load_from_memory(&payload.data).unwrap()
    }

    #[tokio::test]
    async fn test_wide_opaque_png_becomes_bounded_jpeg() {
        let codec = ImageCodec::default();

        let encoded = codec.encode(opaque_png(2000, 1000)).await.unwrap();

        assert_eq!(encoded.format, OutputFormat::Jpeg);
        assert!(encoded.data_url.starts_with("data:image/jpeg;base64,"));
        assert_eq!((encoded.width, encoded.height), (800, 400));
        assert_eq!(decode_output(&encoded).dimensions(), (800, 400));
    }

    #[tokio::test]
    async fn test_transparent_png_keeps_alpha() {
        let mut image = RgbaImage::from_pixel(2000, 1000, Rgba([10, 10, 10, 255]));
        for x in 0..200 {
            for y in 0..200 {
                image.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
        let codec = ImageCodec::default();

        let encoded = codec
            .encode(png_bytes(DynamicImage::ImageRgba8(image)))
            .await
            .unwrap();

        assert_eq!(encoded.format, OutputFormat::Png);
        assert!(encoded.data_url.starts_with("data:image/png;base64,"));
        let output = decode_output(&encoded);
        assert_eq!(output.dimensions(), (800, 400));
        assert_eq!(output.to_rgba8().get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_small_image_is_not_upscaled() {
        let codec = ImageCodec::default();
        let encoded = codec.encode_blocking(&opaque_png(320, 240)).unwrap();

        assert_eq!((encoded.width, encoded.height), (320, 240));
        assert_eq!(encoded.format, OutputFormat::Jpeg);
    }

    #[test]
    fn test_output_width_is_bounded() {
        let codec = ImageCodec::new(CodecOptions {
            max_width: 100,
            ..CodecOptions::default()
        });

        for (width, height) in [(101, 50), (1000, 3), (333, 777), (4096, 4096)] {
            let (w, h) = codec.target_dimensions(width, height);
            assert!(w <= 100);
            assert!(h >= 1);
            let expected = height as f64 * w as f64 / width as f64;
            assert!((h as f64 - expected).abs() <= 1.0);
        }
    }

    #[test]
    fn test_rgb_source_is_never_png() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([1, 2, 3])));
        let encoded = ImageCodec::default()
            .encode_blocking(&png_bytes(image))
            .unwrap();
        assert_eq!(encoded.format, OutputFormat::Jpeg);
    }

    #[test]
    fn test_flatten_onto_background() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0])));
        let flattened = flatten(&image, [255, 255, 255]);
        assert_eq!(flattened.get_pixel(0, 0), &Rgb([255, 255, 255]));

        let half = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128])));
        let flattened = flatten(&half, [255, 255, 255]);
        assert_eq!(flattened.get_pixel(0, 0)[0], 127);
    }

    #[test]
    fn test_jpeg_quality_scale() {
        assert_eq!(CodecOptions::default().jpeg_quality(), 85);
        let low = CodecOptions {
            quality: 0.001,
            ..CodecOptions::default()
        };
        assert_eq!(low.jpeg_quality(), 1);
    }

    #[tokio::test]
    async fn test_garbage_bytes_fail_to_decode() {
        let result = ImageCodec::default().encode(vec![0, 1, 2, 3]).await;
        assert!(matches!(result, Err(ImagingError::Decode(_))));
    }

    #[tokio::test]
    async fn test_recompress_existing_data_url() {
        let codec = ImageCodec::default();
        let original = encode_data_url("image/png", &opaque_png(1600, 400));

        let encoded = codec.recompress(&original).await.unwrap();
        assert_eq!((encoded.width, encoded.height), (800, 200));
    }
}
