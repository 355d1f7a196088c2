//! Best-effort image compression.
//!
//! Normalizes a receipt photo to JPEG, bounded by a maximum dimension and a
//! maximum output size. Compression is an optimization, not a correctness
//! requirement: any internal failure falls back to the original bytes.

use anyhow::Result;
use bytes::Bytes;
use image::DynamicImage;

/// Bounds for the compression pass.
#[derive(Debug, Clone, Copy)]
pub struct CompressionSettings {
    /// Longest edge of the output, in pixels.
    pub max_dimension: u32,
    /// Target ceiling for the encoded output.
    pub max_bytes: usize,
    /// JPEG quality to start from (0-100).
    pub base_quality: u8,
    /// Quality floor; below this we stop stepping down and keep the result.
    pub floor_quality: u8,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        CompressionSettings {
            max_dimension: 1600,
            max_bytes: 1024 * 1024,
            base_quality: 80,
            floor_quality: 40,
        }
    }
}

/// Output of a compression pass.
#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub data: Bytes,
    pub content_type: &'static str,
    /// False when the pass fell back to the original bytes.
    pub was_compressed: bool,
}

/// Main compression service
pub struct ImageCompressor {
    settings: CompressionSettings,
}

impl Default for ImageCompressor {
    fn default() -> Self {
        ImageCompressor::new(CompressionSettings::default())
    }
}

impl ImageCompressor {
    pub fn new(settings: CompressionSettings) -> Self {
        ImageCompressor { settings }
    }

    /// Compress an image payload, falling back to the original bytes on any
    /// failure or when the re-encoded result would be larger.
    pub fn compress(&self, original: &[u8], content_type: &str) -> CompressedImage {
        match self.try_compress(original) {
            Ok(data) if data.len() < original.len() => {
                tracing::debug!(
                    original_bytes = original.len(),
                    compressed_bytes = data.len(),
                    "Receipt image compressed"
                );
                CompressedImage {
                    data,
                    content_type: "image/jpeg",
                    was_compressed: true,
                }
            }
            Ok(_) => CompressedImage {
                data: Bytes::copy_from_slice(original),
                content_type: leak_content_type(content_type),
                was_compressed: false,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Image re-encode failed, keeping original bytes");
                CompressedImage {
                    data: Bytes::copy_from_slice(original),
                    content_type: leak_content_type(content_type),
                    was_compressed: false,
                }
            }
        }
    }

    fn try_compress(&self, original: &[u8]) -> Result<Bytes> {
        let img = image::load_from_memory(original)?;
        let img = self.bounded_resize(img);

        let mut quality = self.settings.base_quality;
        let mut encoded = Self::encode_jpeg(&img, quality)?;

        while encoded.len() > self.settings.max_bytes && quality > self.settings.floor_quality {
            quality = quality.saturating_sub(10).max(self.settings.floor_quality);
            encoded = Self::encode_jpeg(&img, quality)?;
        }

        Ok(encoded)
    }

    fn bounded_resize(&self, img: DynamicImage) -> DynamicImage {
        let max = self.settings.max_dimension;
        if img.width() > max || img.height() > max {
            img.resize(max, max, image::imageops::FilterType::Lanczos3)
        } else {
            img
        }
    }

    /// Encode to JPEG using mozjpeg.
    fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Bytes> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality as f32);
        comp.set_progressive_mode();
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new())?;
        comp.write_scanlines(&rgb_img)?;
        let jpeg_data = comp.finish()?;

        Ok(Bytes::from(jpeg_data))
    }
}

/// The fallback path keeps the caller's declared content type; the known
/// image types map to static strings without allocation.
fn leak_content_type(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "image/jpeg",
        "image/png" => "image/png",
        "image/webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let mut img = RgbImage::new(width, height);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8]);
        }
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_compress_normalizes_to_jpeg() {
        let png = sample_png(400, 300);
        let out = ImageCompressor::default().compress(&png, "image/png");
        assert!(out.was_compressed);
        assert_eq!(out.content_type, "image/jpeg");
        // JPEG magic bytes
        assert_eq!(&out.data[..3], &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_compress_bounds_dimensions() {
        let png = sample_png(3200, 2400);
        let settings = CompressionSettings {
            max_dimension: 800,
            ..Default::default()
        };
        let out = ImageCompressor::new(settings).compress(&png, "image/png");
        assert!(out.was_compressed);
        let decoded = image::load_from_memory(&out.data).unwrap();
        assert!(decoded.width() <= 800);
        assert!(decoded.height() <= 800);
    }

    #[test]
    fn test_compress_falls_back_on_undecodable_input() {
        let garbage = vec![0xDEu8, 0xAD, 0xBE, 0xEF, 0x00, 0x01, 0x02];
        let out = ImageCompressor::default().compress(&garbage, "image/jpeg");
        assert!(!out.was_compressed);
        assert_eq!(&out.data[..], &garbage[..]);
        assert_eq!(out.content_type, "image/jpeg");
    }

    #[test]
    fn test_compress_keeps_original_when_not_smaller() {
        // A tiny solid-color PNG already beats the JPEG re-encode.
        let mut img = RgbImage::new(8, 8);
        for px in img.pixels_mut() {
            *px = Rgb([255, 255, 255]);
        }
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();

        let out = ImageCompressor::default().compress(&buf, "image/png");
        if !out.was_compressed {
            assert_eq!(&out.data[..], &buf[..]);
            assert_eq!(out.content_type, "image/png");
        }
    }
}
