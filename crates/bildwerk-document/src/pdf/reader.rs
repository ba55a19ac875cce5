// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open image-per-page PDFs and inspect what each page holds,
// using the `lopdf` crate.

use std::path::Path;

use bildwerk_core::error::{BildwerkError, Result};
use image::{GrayImage, ImageFormat, RgbaImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument};

/// Read-only view over a PDF produced by the assembler.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            BildwerkError::PdfRead(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self { document })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            BildwerkError::PdfRead(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Width and height of a page (1-indexed) in points, from its MediaBox.
    pub fn page_size(&self, page_number: u32) -> Result<(f64, f64)> {
        let page = self.page_dictionary(page_number)?;
        let media_box = page
            .get(b"MediaBox")
            .and_then(Object::as_array)
            .map_err(|err| {
                BildwerkError::PdfRead(format!("page {} has no MediaBox: {}", page_number, err))
            })?;

        let numbers = media_box
            .iter()
            .map(number)
            .collect::<Option<Vec<f64>>>()
            .filter(|values| values.len() == 4)
            .ok_or_else(|| {
                BildwerkError::PdfRead(format!("page {} has a malformed MediaBox", page_number))
            })?;

        Ok((numbers[2] - numbers[0], numbers[3] - numbers[1]))
    }

    /// Decode the image drawn on a page (1-indexed) back to RGBA pixels.
    #[instrument(skip(self))]
    pub fn page_image(&self, page_number: u32) -> Result<RgbaImage> {
        let page = self.page_dictionary(page_number)?;
        let image_id = first_image_xobject(&self.document, page).ok_or_else(|| {
            BildwerkError::PdfRead(format!("page {} draws no image", page_number))
        })?;
        let stream = self.stream(image_id)?;

        let width = dimension(&stream.dict, b"Width")?;
        let height = dimension(&stream.dict, b"Height")?;

        let mut rgba = if has_filter(stream, b"DCTDecode") {
            image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
                .map_err(|err| BildwerkError::PdfRead(format!("bad DCT image data: {err}")))?
                .to_rgba8()
        } else {
            let samples = self.samples(stream)?;
            let gray = stream
                .dict
                .get(b"ColorSpace")
                .and_then(Object::as_name)
                .is_ok_and(|name| name == b"DeviceGray");
            raw_to_rgba(width, height, samples, gray)?
        };

        if rgba.dimensions() != (width, height) {
            return Err(BildwerkError::PdfRead(format!(
                "image data is {}x{}, dictionary says {}x{}",
                rgba.width(),
                rgba.height(),
                width,
                height
            )));
        }

        if let Ok(mask_id) = stream.dict.get(b"SMask").and_then(Object::as_reference) {
            let mask = self.stream(mask_id)?;
            let alpha = GrayImage::from_raw(width, height, self.samples(mask)?).ok_or_else(|| {
                BildwerkError::PdfRead("soft mask size does not match image".into())
            })?;
            for (pixel, a) in rgba.pixels_mut().zip(alpha.pixels()) {
                pixel.0[3] = a.0[0];
            }
        }

        Ok(rgba)
    }

    // -- Helpers --------------------------------------------------------------

    fn page_dictionary(&self, page_number: u32) -> Result<&Dictionary> {
        let pages = self.document.get_pages();
        let page_id = *pages.get(&page_number).ok_or_else(|| {
            BildwerkError::PdfRead(format!(
                "page {} not found (document has {} pages)",
                page_number,
                pages.len()
            ))
        })?;
        self.document.get_dictionary(page_id).map_err(|err| {
            BildwerkError::PdfRead(format!("cannot read page {}: {}", page_number, err))
        })
    }

    fn stream(&self, id: ObjectId) -> Result<&Stream> {
        self.document
            .get_object(id)
            .and_then(Object::as_stream)
            .map_err(|err| BildwerkError::PdfRead(format!("object {:?} is not a stream: {}", id, err)))
    }

    /// Stream data with any Flate encoding removed.
    fn samples(&self, stream: &Stream) -> Result<Vec<u8>> {
        if stream.dict.has(b"Filter") {
            stream
                .decompressed_content()
                .map_err(|err| BildwerkError::PdfRead(format!("cannot decompress image: {err}")))
        } else {
            Ok(stream.content.clone())
        }
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

fn dimension(dict: &Dictionary, key: &[u8]) -> Result<u32> {
    dict.get(key)
        .and_then(Object::as_i64)
        .ok()
        .and_then(|value| u32::try_from(value).ok())
        .ok_or_else(|| {
            BildwerkError::PdfRead(format!(
                "image has no valid /{}",
                String::from_utf8_lossy(key)
            ))
        })
}

fn has_filter(stream: &Stream, filter: &[u8]) -> bool {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == filter,
        Ok(Object::Array(names)) => names
            .iter()
            .any(|name| name.as_name().is_ok_and(|name| name == filter)),
        _ => false,
    }
}

fn first_image_xobject(document: &Document, page: &Dictionary) -> Option<ObjectId> {
    let resources = match page.get(b"Resources").ok()? {
        Object::Reference(id) => document.get_dictionary(*id).ok()?,
        Object::Dictionary(dict) => dict,
        _ => return None,
    };
    let xobjects = match resources.get(b"XObject").ok()? {
        Object::Reference(id) => document.get_dictionary(*id).ok()?,
        Object::Dictionary(dict) => dict,
        _ => return None,
    };
    xobjects
        .iter()
        .find_map(|(_, value)| value.as_reference().ok())
}

fn raw_to_rgba(width: u32, height: u32, samples: Vec<u8>, gray: bool) -> Result<RgbaImage> {
    let too_short = || BildwerkError::PdfRead("image data is shorter than its dimensions".into());
    if gray {
        Ok(image::DynamicImage::ImageLuma8(
            GrayImage::from_raw(width, height, samples).ok_or_else(too_short)?,
        )
        .to_rgba8())
    } else {
        Ok(image::DynamicImage::ImageRgb8(
            image::RgbImage::from_raw(width, height, samples).ok_or_else(too_short)?,
        )
        .to_rgba8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::RasterBuffer;
    use crate::pdf::assembler::{assemble_merged, assemble_single};
    use bildwerk_core::{ConversionConfig, EncodingFormat};
    use image::Rgba;

    fn solid(width: u32, height: u32, pixel: [u8; 4]) -> RasterBuffer {
        RasterBuffer::new(RgbaImage::from_pixel(width, height, Rgba(pixel)))
    }

    #[test]
    fn reports_page_sizes_in_points() {
        let bytes = assemble_merged(
            vec![
                (solid(11, 7, [0, 0, 0, 255]), EncodingFormat::Png),
                (solid(7, 11, [0, 0, 0, 255]), EncodingFormat::Jpeg),
            ],
            &ConversionConfig::default(),
        )
        .unwrap();
        let reader = PdfReader::from_bytes(&bytes).unwrap();
        assert_eq!(reader.page_count(), 2);
        assert_eq!(reader.page_size(1).unwrap(), (11.0, 7.0));
        assert_eq!(reader.page_size(2).unwrap(), (7.0, 11.0));
    }

    #[test]
    fn png_page_decodes_exactly() {
        let bytes = assemble_single(
            solid(5, 3, [12, 34, 56, 255]),
            EncodingFormat::Png,
            &ConversionConfig::default(),
        )
        .unwrap();
        let image = PdfReader::from_bytes(&bytes).unwrap().page_image(1).unwrap();
        assert_eq!(image.dimensions(), (5, 3));
        assert!(image.pixels().all(|p| *p == Rgba([12, 34, 56, 255])));
    }

    #[test]
    fn soft_mask_restores_alpha() {
        let bytes = assemble_single(
            solid(2, 2, [200, 100, 0, 64]),
            EncodingFormat::Png,
            &ConversionConfig::default(),
        )
        .unwrap();
        let image = PdfReader::from_bytes(&bytes).unwrap().page_image(1).unwrap();
        assert!(image.pixels().all(|p| p.0[3] == 64));
    }

    #[test]
    fn jpeg_page_decodes_to_the_right_size() {
        let bytes = assemble_single(
            solid(16, 16, [250, 250, 250, 255]),
            EncodingFormat::Jpeg,
            &ConversionConfig::default(),
        )
        .unwrap();
        let image = PdfReader::from_bytes(&bytes).unwrap().page_image(1).unwrap();
        assert_eq!(image.dimensions(), (16, 16));
        assert!(image.get_pixel(8, 8).0[0] > 240);
    }

    #[test]
    fn missing_page_is_an_error() {
        let bytes = assemble_single(
            solid(1, 1, [0, 0, 0, 255]),
            EncodingFormat::Png,
            &ConversionConfig::default(),
        )
        .unwrap();
        let reader = PdfReader::from_bytes(&bytes).unwrap();
        assert!(matches!(reader.page_size(2), Err(BildwerkError::PdfRead(_))));
        assert!(matches!(reader.page_image(0), Err(BildwerkError::PdfRead(_))));
    }

    #[test]
    fn garbage_is_not_a_pdf() {
        assert!(matches!(
            PdfReader::from_bytes(b"definitely not a pdf"),
            Err(BildwerkError::PdfRead(_))
        ));
    }
}
