// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion configuration, persisted as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BildwerkError, Result};

/// PNG deflate effort. PNG has no quality knob; this is the closest control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PngCompression {
    Fast,
    #[default]
    Default,
    Best,
}

/// Filter used when a placement is not pixel-exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResampleFilter {
    Nearest,
    Bilinear,
    #[default]
    Bicubic,
}

/// What a single-mode batch does when one image fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BatchPolicy {
    /// Any failure aborts the whole batch and nothing is produced.
    #[default]
    FailFast,
    /// Successful images are kept; failures are reported per item.
    PerItem,
}

/// Settings shared by every conversion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// JPEG quality (1-100) for JPEG-family sources.
    pub jpeg_quality: u8,
    /// Deflate effort for PNG-encoded pages.
    pub png_compression: PngCompression,
    /// Resampling filter for non-exact placements.
    pub resample: ResampleFilter,
    /// Upper bound on images rasterised at the same time.
    pub max_concurrency: usize,
    /// Failure handling for single-mode batches. Merge mode always fails as a whole.
    pub batch_policy: BatchPolicy,
    /// Optional /Title written to the PDF /Info dictionary.
    pub title: Option<String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            png_compression: PngCompression::Default,
            resample: ResampleFilter::Bicubic,
            max_concurrency: 4,
            batch_policy: BatchPolicy::FailFast,
            title: None,
        }
    }
}

impl ConversionConfig {
    /// Reject settings the encoders or scheduler cannot honour.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(BildwerkError::Config(format!(
                "jpeg_quality must be within 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.max_concurrency == 0 {
            return Err(BildwerkError::Config(
                "max_concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Load a config file. Missing fields take their default values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        debug!(path = %path.as_ref().display(), "Loaded conversion config");
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_encoder_settings() {
        let config = ConversionConfig::default();
        assert_eq!(config.jpeg_quality, 90);
        assert_eq!(config.batch_policy, BatchPolicy::FailFast);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_quality_rejected() {
        let config = ConversionConfig {
            jpeg_quality: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(BildwerkError::Config(_))));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = ConversionConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = ConversionConfig {
            jpeg_quality: 75,
            batch_policy: BatchPolicy::PerItem,
            title: Some("Receipts".into()),
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ConversionConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "max_concurrency": 2 }"#).unwrap();

        let config = ConversionConfig::load(&path).unwrap();
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.jpeg_quality, 90);
    }

    #[test]
    fn invalid_file_is_rejected_after_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "jpeg_quality": 101 }"#).unwrap();
        assert!(ConversionConfig::load(&path).is_err());
    }
}
