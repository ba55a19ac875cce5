// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Bildwerk converter.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Source image families accepted by the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
    Avif,
    Bmp,
    Svg,
    Ico,
}

impl ImageKind {
    /// File extensions accepted at the pipeline boundary (lowercase).
    pub const ACCEPTED_EXTENSIONS: [&'static str; 10] = [
        "jpg", "jpeg", "png", "gif", "webp", "avif", "bmp", "svg", "jfif", "ico",
    ];

    /// MIME type string for this image family.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Avif => "image/avif",
            Self::Bmp => "image/bmp",
            Self::Svg => "image/svg+xml",
            Self::Ico => "image/x-icon",
        }
    }

    /// Infer the image family from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "jfif" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            "avif" => Some(Self::Avif),
            "bmp" => Some(Self::Bmp),
            "svg" => Some(Self::Svg),
            "ico" => Some(Self::Ico),
            _ => None,
        }
    }

    /// Infer the image family from a file name's last extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }
}

/// A caller-supplied image: file name, declared MIME type and raw bytes.
///
/// Immutable once built; moved into the conversion task that consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    name: String,
    mime: Option<String>,
    bytes: Vec<u8>,
}

impl SourceImage {
    /// Wrap in-memory bytes. The MIME type is inferred from the file name.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime = ImageKind::from_file_name(&name).map(|kind| kind.mime_type().to_owned());
        Self { name, mime, bytes }
    }

    /// Override the declared MIME type (e.g. from an upload's content type).
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Read a source image from disk, naming it after the file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Image family from the declared MIME type, falling back to the name.
    pub fn kind(&self) -> Option<ImageKind> {
        let from_mime = self.mime.as_deref().and_then(|mime| {
            let lower = mime.to_ascii_lowercase();
            let subtype = lower.strip_prefix("image/")?;
            match subtype {
                "svg+xml" => Some(ImageKind::Svg),
                "x-icon" | "vnd.microsoft.icon" => Some(ImageKind::Ico),
                other => ImageKind::from_extension(other),
            }
        });
        from_mime.or_else(|| ImageKind::from_file_name(&self.name))
    }
}

/// Raster format a page image is re-encoded to before embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncodingFormat {
    /// Lossy, no alpha. Chosen for JPEG/JFIF sources.
    Jpeg,
    /// Lossless, alpha-capable. The default, so transparency survives.
    Png,
}

impl EncodingFormat {
    /// Pick the encoding for a source: JPEG when either the declared type or
    /// the file name says JPEG/JFIF, PNG otherwise.
    pub fn for_source(source: &SourceImage) -> Self {
        let mime_says_jpeg = source.mime().is_some_and(|mime| {
            let lower = mime.to_ascii_lowercase();
            lower.ends_with("jpeg") || lower.ends_with("jpg")
        });
        let name_says_jpeg = source
            .name()
            .rsplit_once('.')
            .is_some_and(|(_, ext)| {
                matches!(ext.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "jfif")
            });

        if mime_says_jpeg || name_says_jpeg {
            Self::Jpeg
        } else {
            Self::Png
        }
    }
}

/// Single mode yields one PDF per image; merge mode one PDF for all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConversionMode {
    #[default]
    Single,
    Merge,
}

/// A finished PDF together with the file name it should be saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPdf {
    pub name: String,
    pub bytes: Vec<u8>,
}
