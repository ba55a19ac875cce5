// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF page assembly with `lopdf`.
//
// Every page is exactly as large as its image (1 px = 1 pt) and the image is
// drawn over the full MediaBox. JPEG data is embedded untouched as a
// DCTDecode stream; PNG data is unpacked into raw RGB (plus a soft mask when
// any pixel is translucent) and left for the serializer to Flate-compress.

use std::io::Cursor;

use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::{ConversionConfig, EncodingFormat};
use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, ImageDecoder, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::{debug, info, instrument};

use crate::image::{EncodedImage, ImageEncoder, RasterBuffer};

const PRODUCER: &str = "Bildwerk";
const IMAGE_RESOURCE: &str = "Im0";

/// PDF text string: ASCII as a literal, anything else as UTF-16BE with a BOM.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Builds one PDF document page by page, then serializes it once.
pub struct PageAssembler {
    document: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    encoder: ImageEncoder,
    title: Option<String>,
}

impl PageAssembler {
    pub fn new(config: &ConversionConfig) -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        Self {
            document,
            pages_id,
            page_ids: Vec::new(),
            encoder: ImageEncoder::from_config(config),
            title: config.title.clone(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Encode `buffer` in `format` and append it as the next page.
    pub fn push_buffer(&mut self, buffer: RasterBuffer, format: EncodingFormat) -> Result<()> {
        let encoded = self.encoder.encode(buffer, format)?;
        self.push_encoded(&encoded)
    }

    /// Append an already-encoded image as the next page.
    #[instrument(skip(self, image), fields(format = ?image.format, width = image.width, height = image.height))]
    pub fn push_encoded(&mut self, image: &EncodedImage) -> Result<()> {
        let image_id = match image.format {
            EncodingFormat::Jpeg => self.embed_jpeg(image)?,
            EncodingFormat::Png => self.embed_png(image)?,
        };

        let (width, height) = (i64::from(image.width), i64::from(image.height));
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width.into(),
                        0.into(),
                        0.into(),
                        height.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content
            .encode()
            .map_err(|err| BildwerkError::Assembly(format!("page content: {err}")))?;
        let content_id = self
            .document
            .add_object(Stream::new(Dictionary::new(), content_bytes));

        let page_id = self.document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    IMAGE_RESOURCE => image_id,
                },
            },
            "Contents" => content_id,
        });
        self.page_ids.push(page_id);

        debug!(page = self.page_ids.len(), "Page appended");
        Ok(())
    }

    /// Close the page tree and serialize the document.
    #[instrument(skip(self), fields(pages = self.page_ids.len()))]
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if self.page_ids.is_empty() {
            return Err(BildwerkError::NothingToConvert);
        }

        let kids: Vec<Object> = self.page_ids.iter().copied().map(Object::Reference).collect();
        let count = kids.len() as i64;
        self.document.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.document.trailer.set("Root", catalog_id);

        let mut info_dict = dictionary! {
            "Producer" => Object::string_literal(PRODUCER),
        };
        if let Some(title) = &self.title {
            info_dict.set("Title", text_string(title));
        }
        let info_id = self.document.add_object(info_dict);
        self.document.trailer.set("Info", info_id);

        self.document.compress();

        let mut output = Vec::new();
        self.document
            .save_to(&mut output)
            .map_err(|err| BildwerkError::Assembly(format!("failed to serialise PDF: {err}")))?;

        info!(pages = count, output_bytes = output.len(), "PDF assembled");
        Ok(output)
    }

    fn embed_jpeg(&mut self, image: &EncodedImage) -> Result<ObjectId> {
        let decoder = JpegDecoder::new(Cursor::new(image.bytes.as_slice()))
            .map_err(|err| BildwerkError::Encode(format!("not a valid JPEG: {err}")))?;
        check_dimensions(decoder.dimensions(), image)?;
        let color_space = match decoder.color_type() {
            ColorType::L8 => "DeviceGray",
            ColorType::Rgb8 => "DeviceRGB",
            other => {
                return Err(BildwerkError::Encode(format!(
                    "JPEG colour type {other:?} cannot be embedded"
                )));
            }
        };

        let dict = image_dictionary(image.width, image.height, color_space);
        let mut stream = Stream::new(dict, image.bytes.clone()).with_compression(false);
        stream.dict.set("Filter", "DCTDecode");
        Ok(self.document.add_object(stream))
    }

    fn embed_png(&mut self, image: &EncodedImage) -> Result<ObjectId> {
        let rgba = image::load_from_memory_with_format(&image.bytes, ImageFormat::Png)
            .map_err(|err| BildwerkError::Encode(format!("not a valid PNG: {err}")))?
            .to_rgba8();
        check_dimensions(rgba.dimensions(), image)?;

        let pixel_count = rgba.as_raw().len() / 4;
        let mut rgb = Vec::with_capacity(pixel_count * 3);
        let mut alpha = Vec::with_capacity(pixel_count);
        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            rgb.extend_from_slice(&[r, g, b]);
            alpha.push(a);
        }

        let mut dict = image_dictionary(image.width, image.height, "DeviceRGB");
        if alpha.iter().any(|&a| a < u8::MAX) {
            let mask = Stream::new(image_dictionary(image.width, image.height, "DeviceGray"), alpha);
            let mask_id = self.document.add_object(mask);
            dict.set("SMask", mask_id);
        }
        Ok(self.document.add_object(Stream::new(dict, rgb)))
    }
}

fn image_dictionary(width: u32, height: u32, color_space: &str) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    }
}

fn check_dimensions(actual: (u32, u32), image: &EncodedImage) -> Result<()> {
    if actual != (image.width, image.height) {
        return Err(BildwerkError::Encode(format!(
            "encoded image is {}x{}, expected {}x{}",
            actual.0, actual.1, image.width, image.height
        )));
    }
    Ok(())
}

/// One buffer, one page.
pub fn assemble_single(
    buffer: RasterBuffer,
    format: EncodingFormat,
    config: &ConversionConfig,
) -> Result<Vec<u8>> {
    let mut assembler = PageAssembler::new(config);
    assembler.push_buffer(buffer, format)?;
    assembler.finish()
}

/// One page per buffer, in the given order.
pub fn assemble_merged(
    pages: Vec<(RasterBuffer, EncodingFormat)>,
    config: &ConversionConfig,
) -> Result<Vec<u8>> {
    let mut assembler = PageAssembler::new(config);
    for (buffer, format) in pages {
        assembler.push_buffer(buffer, format)?;
    }
    assembler.finish()
}
