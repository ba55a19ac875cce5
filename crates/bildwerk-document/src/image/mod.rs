// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: decoding, EXIF orientation, affine placement and page encoding.

pub mod encode;
pub mod orientation;
pub mod rasterizer;
pub mod transform;

pub use encode::{EncodedImage, ImageEncoder};
pub use orientation::{OrientationCode, orientation_or_default, read_orientation};
pub use rasterizer::{RasterBuffer, Rasterizer};
pub use transform::{Affine, Placement, orientation_matrix};
