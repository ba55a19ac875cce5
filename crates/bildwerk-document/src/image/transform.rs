// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Orientation as plain affine math. Nothing here touches pixels; the
// rasterizer hands the final matrix to `imageproc` for resampling.

use imageproc::geometric_transformations::Projection;

use super::orientation::OrientationCode;

const EPSILON: f64 = 1e-9;

/// 2D affine map `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.
///
/// Coordinates are continuous with the origin at the top-left corner of the
/// top-left pixel, y pointing down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine {
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// `self` followed by `next`.
    pub fn then(self, next: Self) -> Self {
        Self {
            a: next.a * self.a + next.c * self.b,
            b: next.b * self.a + next.d * self.b,
            c: next.a * self.c + next.c * self.d,
            d: next.b * self.c + next.d * self.d,
            e: next.a * self.e + next.c * self.f + next.e,
            f: next.b * self.e + next.d * self.f + next.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Re-express a map between continuous coordinates as a map between
    /// pixel indices, where pixel `i` covers `[i, i + 1)` and is sampled at
    /// its centre.
    pub fn to_pixel_space(self) -> Self {
        Self::translate(0.5, 0.5)
            .then(self)
            .then(Self::translate(-0.5, -0.5))
    }

    /// True when every integer lattice point maps onto another one: a pure
    /// permutation of pixels, so nearest sampling reproduces them exactly.
    pub fn is_lattice_exact(&self) -> bool {
        let unit = |v: f64| [-1.0, 0.0, 1.0].iter().any(|u| (v - u).abs() < EPSILON);
        let integral = |v: f64| (v - v.round()).abs() < EPSILON;
        unit(self.a)
            && unit(self.b)
            && unit(self.c)
            && unit(self.d)
            && integral(self.e)
            && integral(self.f)
            && (self.determinant().abs() - 1.0).abs() < EPSILON
    }

    /// The matrix as an `imageproc` projection. `None` when singular.
    pub fn to_projection(&self) -> Option<Projection> {
        Projection::from_matrix([
            self.a as f32,
            self.c as f32,
            self.e as f32,
            self.b as f32,
            self.d as f32,
            self.f as f32,
            0.0,
            0.0,
            1.0,
        ])
    }
}

/// The orientation correction for an image laid out in a `width`×`height`
/// frame, mapping stored coordinates to display coordinates.
pub fn orientation_matrix(code: OrientationCode, width: f64, height: f64) -> Affine {
    match code {
        OrientationCode::Normal => Affine::IDENTITY,
        OrientationCode::MirrorHorizontal => Affine::new(-1.0, 0.0, 0.0, 1.0, width, 0.0),
        OrientationCode::Rotate180 => Affine::new(-1.0, 0.0, 0.0, -1.0, width, height),
        OrientationCode::MirrorVertical => Affine::new(1.0, 0.0, 0.0, -1.0, 0.0, height),
        OrientationCode::Transpose => Affine::new(0.0, 1.0, 1.0, 0.0, 0.0, 0.0),
        OrientationCode::Rotate90 => Affine::new(0.0, 1.0, -1.0, 0.0, height, 0.0),
        OrientationCode::Transverse => Affine::new(0.0, -1.0, -1.0, 0.0, height, width),
        OrientationCode::Rotate270 => Affine::new(0.0, -1.0, 1.0, 0.0, 0.0, width),
    }
}

/// Where a decoded image lands on its output canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Uniform scale applied before orientation.
    pub scale: f64,
    /// Source coordinates → canvas coordinates.
    pub transform: Affine,
}

impl Placement {
    /// Fit a `width`×`height` image onto a canvas sized from the image itself,
    /// swapping axes for quarter-turn orientations.
    pub fn for_image(code: OrientationCode, width: u32, height: u32) -> Self {
        let (canvas_width, canvas_height) = if code.swaps_dimensions() {
            (height, width)
        } else {
            (width, height)
        };
        Self::onto_canvas(code, width, height, canvas_width, canvas_height)
    }

    /// Fit an image onto an arbitrary canvas: uniform scale, centred, drawn
    /// in the canvas's un-rotated frame and then oriented.
    pub fn onto_canvas(
        code: OrientationCode,
        width: u32,
        height: u32,
        canvas_width: u32,
        canvas_height: u32,
    ) -> Self {
        let (local_w, local_h) = if code.swaps_dimensions() {
            (f64::from(canvas_height), f64::from(canvas_width))
        } else {
            (f64::from(canvas_width), f64::from(canvas_height))
        };
        let (w, h) = (f64::from(width), f64::from(height));

        let scale = (local_w / w).min(local_h / h);
        let dx = (local_w - w * scale) / 2.0;
        let dy = (local_h - h * scale) / 2.0;

        let transform = Affine::scale(scale, scale)
            .then(Affine::translate(dx, dy))
            .then(orientation_matrix(code, local_w, local_h));

        Self {
            canvas_width,
            canvas_height,
            scale,
            transform,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_maps(m: &Affine, from: (f64, f64), to: (f64, f64)) {
        let (x, y) = m.apply(from.0, from.1);
        assert!(
            (x - to.0).abs() < 1e-9 && (y - to.1).abs() < 1e-9,
            "{from:?} mapped to ({x}, {y}), expected {to:?}"
        );
    }

    #[test]
    fn composition_order() {
        let m = Affine::scale(2.0, 2.0).then(Affine::translate(1.0, 0.0));
        assert_maps(&m, (1.0, 1.0), (3.0, 2.0));
        let m = Affine::translate(1.0, 0.0).then(Affine::scale(2.0, 2.0));
        assert_maps(&m, (1.0, 1.0), (4.0, 2.0));
    }

    #[test]
    fn stored_top_left_lands_where_expected() {
        // 4 wide, 2 tall stored image.
        let cases = [
            (OrientationCode::Normal, (0.0, 0.0)),
            (OrientationCode::MirrorHorizontal, (4.0, 0.0)),
            (OrientationCode::Rotate180, (4.0, 2.0)),
            (OrientationCode::MirrorVertical, (0.0, 2.0)),
            (OrientationCode::Transpose, (0.0, 0.0)),
            (OrientationCode::Rotate90, (2.0, 0.0)),
            (OrientationCode::Transverse, (2.0, 4.0)),
            (OrientationCode::Rotate270, (0.0, 4.0)),
        ];
        for (code, expected) in cases {
            let m = orientation_matrix(code, 4.0, 2.0);
            assert_maps(&m, (0.0, 0.0), expected);
        }
    }

    #[test]
    fn every_orientation_covers_the_canvas_exactly() {
        for code in OrientationCode::ALL {
            let placement = Placement::for_image(code, 4, 2);
            let (cw, ch) = (
                f64::from(placement.canvas_width),
                f64::from(placement.canvas_height),
            );
            let corners = [(0.0, 0.0), (4.0, 0.0), (0.0, 2.0), (4.0, 2.0)];
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
            for (x, y) in corners {
                let (px, py) = placement.transform.apply(x, y);
                min_x = min_x.min(px);
                min_y = min_y.min(py);
                max_x = max_x.max(px);
                max_y = max_y.max(py);
            }
            assert!(min_x.abs() < 1e-9 && min_y.abs() < 1e-9, "{code:?}");
            assert!((max_x - cw).abs() < 1e-9 && (max_y - ch).abs() < 1e-9, "{code:?}");
        }
    }

    #[test]
    fn natural_canvas_means_unit_scale_no_offset() {
        for code in OrientationCode::ALL {
            let placement = Placement::for_image(code, 640, 480);
            assert_eq!(placement.scale, 1.0);
            assert!(placement.transform.to_pixel_space().is_lattice_exact(), "{code:?}");
        }
    }

    #[test]
    fn quarter_turns_swap_canvas() {
        let p = Placement::for_image(OrientationCode::Rotate90, 640, 480);
        assert_eq!((p.canvas_width, p.canvas_height), (480, 640));
        let p = Placement::for_image(OrientationCode::Rotate180, 640, 480);
        assert_eq!((p.canvas_width, p.canvas_height), (640, 480));
    }

    #[test]
    fn larger_canvas_letterboxes_generally() {
        let p = Placement::onto_canvas(OrientationCode::Normal, 100, 50, 200, 200);
        assert_eq!(p.scale, 2.0);
        assert_maps(&p.transform, (0.0, 0.0), (0.0, 50.0));
        assert_maps(&p.transform, (100.0, 50.0), (200.0, 150.0));
        assert!(!p.transform.to_pixel_space().is_lattice_exact());
    }

    #[test]
    fn pixel_space_mirror_maps_edges_to_edges() {
        let m = orientation_matrix(OrientationCode::MirrorHorizontal, 4.0, 2.0).to_pixel_space();
        assert_maps(&m, (0.0, 0.0), (3.0, 0.0));
        assert_maps(&m, (3.0, 1.0), (0.0, 1.0));
    }

    #[test]
    fn pixel_space_rotation_maps_corners() {
        // Stored 4x2, displayed 2x4.
        let m = orientation_matrix(OrientationCode::Rotate90, 4.0, 2.0).to_pixel_space();
        assert_maps(&m, (0.0, 0.0), (1.0, 0.0));
        assert_maps(&m, (3.0, 1.0), (0.0, 3.0));
    }

    #[test]
    fn singular_matrix_has_no_projection() {
        assert!(Affine::scale(0.0, 1.0).to_projection().is_none());
        assert!(Affine::IDENTITY.to_projection().is_some());
    }
}
