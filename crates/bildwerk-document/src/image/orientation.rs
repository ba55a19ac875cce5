// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// EXIF orientation lookup (tag 0x0112) via `kamadak-exif`.
//
// A failed lookup is never fatal: callers use `orientation_or_default`, which
// logs the reason and falls back to the identity orientation.

use std::io::Cursor;

use bildwerk_core::OrientationReadError;
use tracing::debug;

/// The eight EXIF orientations. The discriminant is the raw tag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrientationCode {
    /// 1: stored upright.
    #[default]
    Normal = 1,
    /// 2: mirrored left-right.
    MirrorHorizontal = 2,
    /// 3: upside down.
    Rotate180 = 3,
    /// 4: mirrored top-bottom.
    MirrorVertical = 4,
    /// 5: mirrored along the main diagonal.
    Transpose = 5,
    /// 6: needs a 90° clockwise turn.
    Rotate90 = 6,
    /// 7: mirrored along the anti-diagonal.
    Transverse = 7,
    /// 8: needs a 90° counter-clockwise turn.
    Rotate270 = 8,
}

impl OrientationCode {
    pub const ALL: [Self; 8] = [
        Self::Normal,
        Self::MirrorHorizontal,
        Self::Rotate180,
        Self::MirrorVertical,
        Self::Transpose,
        Self::Rotate90,
        Self::Transverse,
        Self::Rotate270,
    ];

    /// Raw EXIF value (1-8).
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Codes 5-8 turn the image a quarter, so width and height trade places.
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Self::Transpose | Self::Rotate90 | Self::Transverse | Self::Rotate270
        )
    }
}

impl TryFrom<u32> for OrientationCode {
    type Error = OrientationReadError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|code| u32::from(code.value()) == value)
            .ok_or(OrientationReadError::OutOfRange(value))
    }
}

/// Read the orientation tag from an image container (JPEG, TIFF, PNG, WebP, HEIF).
pub fn read_orientation(bytes: &[u8]) -> Result<OrientationCode, OrientationReadError> {
    let mut cursor = Cursor::new(bytes);
    let exif = exif::Reader::new()
        .read_from_container(&mut cursor)
        .map_err(|err| OrientationReadError::NoExif(err.to_string()))?;

    let value = exif
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .ok_or(OrientationReadError::MissingTag)?;

    OrientationCode::try_from(value)
}

/// Orientation for `bytes`, or [`OrientationCode::Normal`] when none can be read.
pub fn orientation_or_default(bytes: &[u8]) -> OrientationCode {
    match read_orientation(bytes) {
        Ok(code) => code,
        Err(err) => {
            debug!(%err, "No usable EXIF orientation, assuming upright");
            OrientationCode::Normal
        }
    }
}
