// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page image encoding. JPEG-family sources stay JPEG, everything else
// becomes PNG.

use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::{ConversionConfig, EncodingFormat, PngCompression};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{Rgb, RgbImage, RgbaImage};
use tracing::{debug, instrument};

use super::rasterizer::RasterBuffer;

/// A raster buffer serialised to JPEG or PNG bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub format: EncodingFormat,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Encodes raster buffers with the configured quality settings.
#[derive(Debug, Clone, Copy)]
pub struct ImageEncoder {
    jpeg_quality: u8,
    png_compression: PngCompression,
}

impl Default for ImageEncoder {
    fn default() -> Self {
        Self::from_config(&ConversionConfig::default())
    }
}

impl ImageEncoder {
    pub fn new(jpeg_quality: u8, png_compression: PngCompression) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
            png_compression,
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(config.jpeg_quality, config.png_compression)
    }

    /// Consume `buffer` and encode it in `format`.
    #[instrument(skip(self, buffer), fields(width = buffer.width(), height = buffer.height()))]
    pub fn encode(&self, buffer: RasterBuffer, format: EncodingFormat) -> Result<EncodedImage> {
        let (width, height) = buffer.dimensions();
        let bytes = match format {
            EncodingFormat::Jpeg => self.to_jpeg_bytes(&buffer.into_rgba())?,
            EncodingFormat::Png => self.to_png_bytes(&buffer.into_rgba())?,
        };
        debug!(?format, encoded_len = bytes.len(), "Page image encoded");
        Ok(EncodedImage {
            format,
            bytes,
            width,
            height,
        })
    }

    /// JPEG has no alpha: pixels are composited over black first.
    fn to_jpeg_bytes(&self, rgba: &RgbaImage) -> Result<Vec<u8>> {
        let rgb = flatten_onto_black(rgba);
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, self.jpeg_quality);
        rgb.write_with_encoder(encoder)
            .map_err(|err| BildwerkError::Encode(format!("JPEG encoding failed: {err}")))?;
        Ok(buffer)
    }

    fn to_png_bytes(&self, rgba: &RgbaImage) -> Result<Vec<u8>> {
        let compression = match self.png_compression {
            PngCompression::Fast => CompressionType::Fast,
            PngCompression::Default => CompressionType::Default,
            PngCompression::Best => CompressionType::Best,
        };
        let mut buffer = Vec::new();
        let encoder = PngEncoder::new_with_quality(&mut buffer, compression, FilterType::Adaptive);
        rgba.write_with_encoder(encoder)
            .map_err(|err| BildwerkError::Encode(format!("PNG encoding failed: {err}")))?;
        Ok(buffer)
    }
}

fn flatten_onto_black(rgba: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let scale = |channel: u8| ((u16::from(channel) * u16::from(a) + 127) / 255) as u8;
        Rgb([scale(r), scale(g), scale(b)])
    })
}
