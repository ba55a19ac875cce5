// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bildwerk-document: image → PDF conversion for Bildwerk.
//
// Decodes images (respecting EXIF orientation), draws them onto canvases of
// their own size and assembles one or many pages into a PDF with `lopdf`.

pub mod convert;
pub mod image;
pub mod input;
pub mod pdf;

// Re-export the primary entry points so callers can use `bildwerk_document::convert_batch` etc.
pub use crate::convert::{
    ConversionOutput, ItemFailure, ItemReport, convert_batch, convert_items, create_merged_pdf,
    create_single_pdf,
};
pub use crate::image::{EncodedImage, ImageEncoder, OrientationCode, RasterBuffer, Rasterizer};
pub use crate::pdf::{PageAssembler, PdfReader, assemble_merged, assemble_single};
