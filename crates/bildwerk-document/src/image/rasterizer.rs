// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Orientation-aware rasterizer: decode a source image (bitmap via `image`,
// SVG via `resvg`), apply its EXIF orientation as an affine warp through
// `imageproc`, and hand back an upright RGBA buffer.

use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::{ConversionConfig, ImageKind, ResampleFilter, SourceImage};
use image::{Limits, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, warp_into};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};
use tracing::{debug, info, instrument};

use super::orientation::{OrientationCode, orientation_or_default};
use super::transform::{Affine, Placement};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// An upright RGBA pixel grid, ready for encoding.
///
/// Width and height already reflect the orientation correction.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBuffer {
    pixels: RgbaImage,
}

impl RasterBuffer {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.pixels
    }
}

/// Turns [`SourceImage`]s into upright [`RasterBuffer`]s.
///
/// Holds no state beyond its settings, so one instance can be copied into
/// every worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rasterizer {
    resample: ResampleFilter,
}

impl Rasterizer {
    pub fn new(resample: ResampleFilter) -> Self {
        Self { resample }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(config.resample)
    }

    /// Decode `source`, correct its orientation and return the pixels.
    ///
    /// Fails with [`BildwerkError::Decode`] when the bytes are not an image.
    /// A missing or unreadable orientation is not an error.
    #[instrument(skip_all, fields(name = source.name(), bytes_len = source.bytes().len()))]
    pub fn rasterize(&self, source: &SourceImage) -> Result<RasterBuffer> {
        let (decoded, code) = if is_svg(source) {
            (decode_svg(source)?, OrientationCode::Normal)
        } else {
            let decoded = image::load_from_memory(source.bytes())
                .map_err(|err| BildwerkError::decode(source.name(), err))?
                .to_rgba8();
            (decoded, orientation_or_default(source.bytes()))
        };

        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(BildwerkError::decode(source.name(), "image has no pixels"));
        }
        debug!(width, height, orientation = code.value(), "Image decoded");

        let upright = self
            .orient(decoded, code)
            .ok_or_else(|| BildwerkError::decode(source.name(), "degenerate placement"))?;

        info!(
            width = upright.width(),
            height = upright.height(),
            "Image rasterised"
        );
        Ok(RasterBuffer::new(upright))
    }

    /// Draw `image` onto a canvas sized from the image, corrected for `code`.
    ///
    /// Returns `None` only if the placement matrix is singular.
    pub fn orient(&self, image: RgbaImage, code: OrientationCode) -> Option<RgbaImage> {
        let (width, height) = image.dimensions();
        let placement = Placement::for_image(code, width, height);
        self.draw(image, &placement)
    }

    /// Resample `image` through `placement` onto a fresh transparent canvas.
    pub fn draw(&self, image: RgbaImage, placement: &Placement) -> Option<RgbaImage> {
        let pixel_map = placement.transform.to_pixel_space();
        let exact = pixel_map.is_lattice_exact();

        if exact
            && pixel_map == Affine::IDENTITY
            && image.dimensions() == (placement.canvas_width, placement.canvas_height)
        {
            return Some(image);
        }

        let projection = pixel_map.to_projection()?;
        let interpolation = if exact {
            Interpolation::Nearest
        } else {
            interpolation_for(self.resample)
        };

        let mut canvas = RgbaImage::from_pixel(
            placement.canvas_width,
            placement.canvas_height,
            TRANSPARENT,
        );
        warp_into(&image, &projection, interpolation, TRANSPARENT, &mut canvas);
        Some(canvas)
    }
}

fn interpolation_for(filter: ResampleFilter) -> Interpolation {
    match filter {
        ResampleFilter::Nearest => Interpolation::Nearest,
        ResampleFilter::Bilinear => Interpolation::Bilinear,
        ResampleFilter::Bicubic => Interpolation::Bicubic,
    }
}

/// SVG by declared type/name, or by sniffing an XML/SVG prologue.
fn is_svg(source: &SourceImage) -> bool {
    if source.kind() == Some(ImageKind::Svg) {
        return true;
    }
    let head = &source.bytes()[..source.bytes().len().min(256)];
    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    trimmed.starts_with("<svg") || (trimmed.starts_with("<?xml") && text.contains("<svg"))
}

/// Rasterise an SVG at its intrinsic size, un-premultiplying into RGBA.
fn decode_svg(source: &SourceImage) -> Result<RgbaImage> {
    let tree = Tree::from_data(source.bytes(), &Options::default())
        .map_err(|err| BildwerkError::decode(source.name(), err))?;

    let width = tree.size().width().ceil() as u32;
    let height = tree.size().height().ceil() as u32;

    // Same ceiling the `image` decoders apply to bitmap sources.
    let budget = Limits::default().max_alloc.unwrap_or(u64::MAX);
    let needed = u64::from(width) * u64::from(height) * 4;
    if needed > budget {
        return Err(BildwerkError::decode(
            source.name(),
            format!("SVG size {width}x{height} needs {needed} bytes, limit is {budget}"),
        ));
    }

    let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
        BildwerkError::decode(
            source.name(),
            format!("SVG has unusable size {width}x{height}"),
        )
    })?;
    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());

    let mut rgba = RgbaImage::new(width, height);
    for (dst, src) in rgba.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    debug!(width, height, "SVG rendered");
    Ok(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::orientation::tests::{tiny_jpeg, with_exif_orientation};
    use image::ImageFormat;
    use std::io::Cursor;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    /// 3 wide, 2 tall, one colour per corner: TL red, TR green, BL blue, BR white.
    fn corner_image() -> RgbaImage {
        let mut img = RgbaImage::from_pixel(3, 2, Rgba([90, 90, 90, 255]));
        img.put_pixel(0, 0, RED);
        img.put_pixel(2, 0, GREEN);
        img.put_pixel(0, 1, BLUE);
        img.put_pixel(2, 1, WHITE);
        img
    }

    /// Corner colours of `img` as (TL, TR, BL, BR).
    fn corners(img: &RgbaImage) -> [Rgba<u8>; 4] {
        let (w, h) = img.dimensions();
        [
            *img.get_pixel(0, 0),
            *img.get_pixel(w - 1, 0),
            *img.get_pixel(0, h - 1),
            *img.get_pixel(w - 1, h - 1),
        ]
    }

    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn every_orientation_moves_corners_as_expected() {
        let expected = [
            (OrientationCode::Normal, (3, 2), [RED, GREEN, BLUE, WHITE]),
            (OrientationCode::MirrorHorizontal, (3, 2), [GREEN, RED, WHITE, BLUE]),
            (OrientationCode::Rotate180, (3, 2), [WHITE, BLUE, GREEN, RED]),
            (OrientationCode::MirrorVertical, (3, 2), [BLUE, WHITE, RED, GREEN]),
            (OrientationCode::Transpose, (2, 3), [RED, BLUE, GREEN, WHITE]),
            (OrientationCode::Rotate90, (2, 3), [BLUE, RED, WHITE, GREEN]),
            (OrientationCode::Transverse, (2, 3), [WHITE, GREEN, BLUE, RED]),
            (OrientationCode::Rotate270, (2, 3), [GREEN, WHITE, RED, BLUE]),
        ];

        let rasterizer = Rasterizer::default();
        for (code, dims, colours) in expected {
            let out = rasterizer.orient(corner_image(), code).unwrap();
            assert_eq!(out.dimensions(), dims, "{code:?}");
            assert_eq!(corners(&out), colours, "{code:?}");
        }
    }

    #[test]
    fn orientation_keeps_every_pixel() {
        let rasterizer = Rasterizer::default();
        let source = corner_image();
        let mut before: Vec<[u8; 4]> = source.pixels().map(|p| p.0).collect();
        before.sort();
        for code in OrientationCode::ALL {
            let out = rasterizer.orient(source.clone(), code).unwrap();
            let mut after: Vec<[u8; 4]> = out.pixels().map(|p| p.0).collect();
            after.sort();
            assert_eq!(before, after, "{code:?}");
        }
    }

    #[test]
    fn png_source_is_decoded_upright() {
        let source = SourceImage::new("corners.png", png_bytes(&corner_image()));
        let buffer = Rasterizer::default().rasterize(&source).unwrap();
        assert_eq!(buffer.dimensions(), (3, 2));
        assert_eq!(buffer.as_rgba(), &corner_image());
    }

    #[test]
    fn exif_rotation_swaps_jpeg_dimensions() {
        let jpeg = with_exif_orientation(&tiny_jpeg(), 6);
        let source = SourceImage::new("phone.jpg", jpeg);
        let buffer = Rasterizer::default().rasterize(&source).unwrap();
        assert_eq!(buffer.dimensions(), (2, 4));
    }

    #[test]
    fn invalid_orientation_tag_is_ignored() {
        let jpeg = with_exif_orientation(&tiny_jpeg(), 0);
        let source = SourceImage::new("odd.jpg", jpeg);
        let buffer = Rasterizer::default().rasterize(&source).unwrap();
        assert_eq!(buffer.dimensions(), (4, 2));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let source = SourceImage::new("notes.png", b"definitely not a png".to_vec());
        let err = Rasterizer::default().rasterize(&source).unwrap_err();
        match err {
            BildwerkError::Decode { name, .. } => assert_eq!(name, "notes.png"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn svg_is_rasterised_at_intrinsic_size() {
        let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="4">
            <rect width="8" height="4" fill="#0000ff"/>
        </svg>"##;
        let source = SourceImage::new("logo.svg", svg.to_vec());
        let buffer = Rasterizer::default().rasterize(&source).unwrap();
        assert_eq!(buffer.dimensions(), (8, 4));
        assert_eq!(*buffer.as_rgba().get_pixel(4, 2), BLUE);
    }

    #[test]
    fn svg_is_sniffed_without_extension() {
        let svg = br#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg" width="2" height="2"/>"#;
        let source = SourceImage::new("drawing", svg.to_vec());
        let buffer = Rasterizer::default().rasterize(&source).unwrap();
        assert_eq!(buffer.dimensions(), (2, 2));
    }

    #[test]
    fn oversized_svg_is_a_decode_error() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="12000" height="12000"/>"#;
        let source = SourceImage::new("poster.svg", svg.to_vec());
        let err = Rasterizer::default().rasterize(&source).unwrap_err();
        assert!(matches!(err, BildwerkError::Decode { ref name, .. } if name == "poster.svg"));
    }

    #[test]
    fn svg_within_the_allocation_limit_still_renders() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="1000" height="500"/>"#;
        let source = SourceImage::new("banner.svg", svg.to_vec());
        let buffer = Rasterizer::default().rasterize(&source).unwrap();
        assert_eq!(buffer.dimensions(), (1000, 500));
    }

    #[test]
    fn broken_svg_is_a_decode_error() {
        let source = SourceImage::new("bad.svg", b"<svg".to_vec());
        assert!(matches!(
            Rasterizer::default().rasterize(&source),
            Err(BildwerkError::Decode { .. })
        ));
    }

    #[test]
    fn letterboxed_draw_uses_resampling_and_stays_in_bounds() {
        let rasterizer = Rasterizer::new(ResampleFilter::Bilinear);
        let img = RgbaImage::from_pixel(4, 2, RED);
        let placement = Placement::onto_canvas(OrientationCode::Normal, 4, 2, 8, 8);
        let out = rasterizer.draw(img, &placement).unwrap();
        assert_eq!(out.dimensions(), (8, 8));
        // Top band is padding, centre row is image.
        assert_eq!(out.get_pixel(4, 0)[3], 0);
        assert_eq!(*out.get_pixel(4, 4), RED);
    }
}
