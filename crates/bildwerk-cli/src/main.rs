// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bildwerk command line: turn images into one PDF each, or one merged PDF.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};

use bildwerk_core::human_errors::{Severity, humanize_error};
use bildwerk_core::{BatchPolicy, BildwerkError, ConversionConfig, ConversionMode, SourceImage};
use bildwerk_document::{ConversionOutput, PdfReader, convert_batch};

#[cfg(feature = "avif")]
const ABOUT: &str = "Convert images (JPG, PNG, GIF, WebP, AVIF, BMP, SVG, JFIF, ICO) to PDF.";
#[cfg(not(feature = "avif"))]
const ABOUT: &str = "Convert images (JPG, PNG, GIF, WebP, BMP, SVG, JFIF, ICO) to PDF. \
                     AVIF needs a build with the `avif` feature.";

#[derive(Parser, Debug)]
#[command(name = "bildwerk", version, about = ABOUT, arg_required_else_help = true)]
struct Cli {
    /// Image files, in page order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Put every image into a single `merged.pdf`.
    #[arg(long)]
    merge: bool,

    /// Directory to write into. Several single PDFs go into an
    /// `images-pdf/` folder inside it.
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// JSON conversion settings. Falls back to defaults if unreadable.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep converting when an image fails instead of aborting the batch.
    #[arg(long)]
    keep_going: bool,

    /// Re-open every written PDF and check its pages decode.
    #[arg(long)]
    verify: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref());
    if cli.keep_going {
        config.batch_policy = BatchPolicy::PerItem;
    }

    let sources = cli
        .inputs
        .iter()
        .map(|path| {
            SourceImage::from_path(path).with_context(|| format!("reading {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mode = if cli.merge {
        ConversionMode::Merge
    } else {
        ConversionMode::Single
    };
    let output = convert_batch(sources, mode, &config).await?;

    for failure in output.failures() {
        eprintln!("skipped {}: {}", failure.name, failure.error);
    }

    let written = write_output(&output, &cli.output)?;
    for path in &written {
        println!("{}", path.display());
    }

    if cli.verify {
        verify(&written)?;
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> ConversionConfig {
    let Some(path) = path else {
        return ConversionConfig::default();
    };
    match ConversionConfig::load(path) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), %err, "Config unusable, using defaults");
            ConversionConfig::default()
        }
    }
}

/// Write every PDF under `dir`. Bundle entries share an `images-pdf/`
/// folder named after the archive.
fn write_output(output: &ConversionOutput, dir: &Path) -> Result<Vec<PathBuf>> {
    let target = match output {
        ConversionOutput::Bundle { archive_name, .. } => {
            let folder = archive_name.strip_suffix(".zip").unwrap_or(archive_name);
            dir.join(folder)
        }
        _ => dir.to_path_buf(),
    };
    fs::create_dir_all(&target).with_context(|| format!("creating {}", target.display()))?;

    output
        .pdfs()
        .iter()
        .map(|pdf| {
            let path = target.join(&pdf.name);
            fs::write(&path, &pdf.bytes).with_context(|| format!("writing {}", path.display()))?;
            Ok::<_, anyhow::Error>(path)
        })
        .collect()
}

fn verify(paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        let reader = PdfReader::open(path)?;
        if reader.page_count() == 0 {
            bail!("{} has no pages", path.display());
        }
        for page in 1..=reader.page_count() as u32 {
            let (width, height) = reader.page_size(page)?;
            let image = reader.page_image(page)?;
            if (f64::from(image.width()), f64::from(image.height())) != (width, height) {
                bail!(
                    "{} page {page}: image is {}x{} but the page is {width}x{height}",
                    path.display(),
                    image.width(),
                    image.height()
                );
            }
        }
        info!(path = %path.display(), pages = reader.page_count(), "Verified");
    }
    Ok(())
}

fn report(err: &anyhow::Error) {
    eprint!("{}", render_report(err));
}

fn render_report(err: &anyhow::Error) -> String {
    let Some(bildwerk_err) = err.downcast_ref::<BildwerkError>() else {
        return format!("error: {err:#}\n");
    };
    let human = humanize_error(bildwerk_err);
    let label = match human.severity {
        Severity::Transient => "temporary error",
        Severity::ActionRequired => "action needed",
        Severity::Permanent => "error",
    };
    let mut out = format!("{label}: {}\n  {}\n", human.message, human.suggestion);
    if human.retriable {
        out.push_str("  Running the same command again may work.\n");
    }
    out.push_str(&format!("  ({err:#})\n"));
    out
}
