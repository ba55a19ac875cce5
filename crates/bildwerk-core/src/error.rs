// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bildwerk.

use thiserror::Error;

/// Top-level error type for all Bildwerk operations.
#[derive(Debug, Error)]
pub enum BildwerkError {
    // -- Per-image errors --
    #[error("failed to decode image '{name}': {detail}")]
    Decode { name: String, detail: String },

    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error("unsupported input file: {0}")]
    UnsupportedInput(String),

    // -- Document errors --
    #[error("PDF assembly failed: {0}")]
    Assembly(String),

    #[error("PDF read failed: {0}")]
    PdfRead(String),

    #[error("no images to convert")]
    NothingToConvert,

    // -- Runtime --
    #[error("conversion task failed: {0}")]
    Task(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BildwerkError {
    /// Shorthand for a decode failure attributed to a named source.
    pub fn decode(name: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Decode {
            name: name.into(),
            detail: detail.to_string(),
        }
    }
}

/// Why an EXIF orientation lookup produced no usable code.
///
/// Never fatal: the rasterizer falls back to the identity orientation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrientationReadError {
    #[error("no EXIF metadata: {0}")]
    NoExif(String),

    #[error("EXIF metadata has no orientation tag")]
    MissingTag,

    #[error("orientation value {0} is outside 1..=8")]
    OutOfRange(u32),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BildwerkError>;
