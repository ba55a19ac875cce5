// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image → PDF conversion entry points.
//
// The synchronous `create_*` functions run the whole pipeline on the calling
// thread. `convert_batch` and `convert_items` rasterise on tokio's blocking
// pool, at most `max_concurrency` images at a time, put the results back in
// input order and then encode and assemble sequentially.

use std::convert::identity;

use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::{BatchPolicy, ConversionConfig, ConversionMode, EncodingFormat, NamedPdf, SourceImage};

use crate::image::{RasterBuffer, Rasterizer};
use crate::input::{BUNDLE_ARCHIVE_NAME, MERGED_PDF_NAME, filter_accepted, unique_pdf_names};
use crate::pdf::{assemble_merged, assemble_single};

type Rasterized = (RasterBuffer, EncodingFormat);

/// One PDF holding a single image.
#[instrument(skip_all, fields(name = source.name()))]
pub fn create_single_pdf(source: &SourceImage, config: &ConversionConfig) -> Result<Vec<u8>> {
    let buffer = Rasterizer::from_config(config).rasterize(source)?;
    assemble_single(buffer, EncodingFormat::for_source(source), config)
}

/// One PDF with a page per image, in slice order. Any failure aborts.
#[instrument(skip_all, fields(count = sources.len()))]
pub fn create_merged_pdf(sources: &[SourceImage], config: &ConversionConfig) -> Result<Vec<u8>> {
    let rasterizer = Rasterizer::from_config(config);
    let pages = sources
        .iter()
        .map(|source| {
            rasterizer
                .rasterize(source)
                .map(|buffer| (buffer, EncodingFormat::for_source(source)))
        })
        .collect::<Result<Vec<_>>>()?;
    assemble_merged(pages, config)
}

/// Outcome for one input of a single-mode batch.
#[derive(Debug)]
pub struct ItemReport {
    /// Position among the accepted inputs.
    pub index: usize,
    /// Source file name.
    pub name: String,
    pub outcome: Result<NamedPdf>,
}

/// A failed input, kept alongside the successes under [`BatchPolicy::PerItem`].
#[derive(Debug)]
pub struct ItemFailure {
    pub index: usize,
    pub name: String,
    pub error: BildwerkError,
}

/// What a batch produced.
#[derive(Debug)]
pub enum ConversionOutput {
    /// Single mode with exactly one accepted image.
    Single(NamedPdf),
    /// Single mode with several images: one PDF each, meant to be shipped
    /// together under `archive_name`.
    Bundle {
        archive_name: String,
        entries: Vec<NamedPdf>,
        failures: Vec<ItemFailure>,
    },
    /// Merge mode.
    Merged(NamedPdf),
}

impl ConversionOutput {
    /// Every PDF in the output, in input order.
    pub fn pdfs(&self) -> &[NamedPdf] {
        match self {
            Self::Single(pdf) | Self::Merged(pdf) => std::slice::from_ref(pdf),
            Self::Bundle { entries, .. } => entries,
        }
    }

    pub fn failures(&self) -> &[ItemFailure] {
        match self {
            Self::Bundle { failures, .. } => failures,
            _ => &[],
        }
    }
}

/// Convert a batch. Unsupported file names are dropped first; if that
/// leaves nothing the result is [`BildwerkError::UnsupportedInput`].
#[instrument(skip(sources, config), fields(count = sources.len()))]
pub async fn convert_batch(
    sources: Vec<SourceImage>,
    mode: ConversionMode,
    config: &ConversionConfig,
) -> Result<ConversionOutput> {
    config.validate()?;
    if sources.is_empty() {
        return Err(BildwerkError::NothingToConvert);
    }
    let rejected: Vec<String> = sources.iter().map(|s| s.name().to_string()).collect();
    let sources = filter_accepted(sources);
    if sources.is_empty() {
        return Err(BildwerkError::UnsupportedInput(rejected.join(", ")));
    }
    info!(images = sources.len(), ?mode, "Starting conversion");

    match mode {
        ConversionMode::Merge => {
            let pages = rasterize_all(sources, config)
                .await
                .into_iter()
                .map(|(_, _, outcome)| outcome)
                .collect::<Result<Vec<_>>>()?;
            let config = config.clone();
            let bytes = blocking("assembling merged PDF", move || {
                assemble_merged(pages, &config)
            })
            .await?;
            Ok(ConversionOutput::Merged(NamedPdf {
                name: MERGED_PDF_NAME.to_string(),
                bytes,
            }))
        }
        ConversionMode::Single => {
            let only_one = sources.len() == 1;
            let fail_fast = only_one || config.batch_policy == BatchPolicy::FailFast;
            let reports = assemble_each(sources, config).await?;

            let mut entries = Vec::with_capacity(reports.len());
            let mut failures = Vec::new();
            for report in reports {
                match report.outcome {
                    Ok(pdf) => entries.push(pdf),
                    Err(error) if fail_fast => return Err(error),
                    Err(error) => {
                        warn!(name = %report.name, %error, "Image skipped");
                        failures.push(ItemFailure {
                            index: report.index,
                            name: report.name,
                            error,
                        });
                    }
                }
            }

            if entries.is_empty() {
                return Err(failures
                    .into_iter()
                    .next()
                    .map(|failure| failure.error)
                    .unwrap_or(BildwerkError::NothingToConvert));
            }
            if only_one {
                return entries
                    .pop()
                    .map(ConversionOutput::Single)
                    .ok_or(BildwerkError::NothingToConvert);
            }

            info!(
                converted = entries.len(),
                failed = failures.len(),
                "Batch complete"
            );
            Ok(ConversionOutput::Bundle {
                archive_name: BUNDLE_ARCHIVE_NAME.to_string(),
                entries,
                failures,
            })
        }
    }
}

/// Single-mode conversion reporting every accepted input separately, in
/// input order, whatever the batch policy says.
#[instrument(skip(sources, config), fields(count = sources.len()))]
pub async fn convert_items(
    sources: Vec<SourceImage>,
    config: &ConversionConfig,
) -> Result<Vec<ItemReport>> {
    config.validate()?;
    assemble_each(filter_accepted(sources), config).await
}

async fn assemble_each(
    sources: Vec<SourceImage>,
    config: &ConversionConfig,
) -> Result<Vec<ItemReport>> {
    let pdf_names = unique_pdf_names(sources.iter().map(SourceImage::name));
    let rasterized = rasterize_all(sources, config).await;
    let config = config.clone();

    blocking("assembling PDFs", move || {
        Ok(rasterized
            .into_iter()
            .zip(pdf_names)
            .map(|((index, name, outcome), pdf_name)| ItemReport {
                index,
                name,
                outcome: outcome
                    .and_then(|(buffer, format)| assemble_single(buffer, format, &config))
                    .map(|bytes| NamedPdf {
                        name: pdf_name,
                        bytes,
                    }),
            })
            .collect())
    })
    .await
}

/// Rasterise every source on the blocking pool; results come back sorted by
/// input index regardless of completion order.
async fn rasterize_all(
    sources: Vec<SourceImage>,
    config: &ConversionConfig,
) -> Vec<(usize, String, Result<Rasterized>)> {
    let rasterizer = Rasterizer::from_config(config);

    let mut results: Vec<_> = stream::iter(sources.into_iter().enumerate().map(
        |(index, source)| async move {
            let name = source.name().to_string();
            let outcome = tokio::task::spawn_blocking(move || {
                let format = EncodingFormat::for_source(&source);
                rasterizer.rasterize(&source).map(|buffer| (buffer, format))
            })
            .await
            .map_err(|err| BildwerkError::Task(format!("rasterising '{name}': {err}")))
            .and_then(identity);
            (index, name, outcome)
        },
    ))
    .buffer_unordered(config.max_concurrency)
    .collect()
    .await;

    results.sort_by_key(|(index, _, _)| *index);
    results
}

async fn blocking<T, F>(what: &'static str, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| BildwerkError::Task(format!("{what}: {err}")))?
}
