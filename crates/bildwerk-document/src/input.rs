// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input filtering and output naming.

use std::collections::HashSet;

use bildwerk_core::{ImageKind, SourceImage};
use tracing::debug;

/// File name of the document produced in merge mode.
pub const MERGED_PDF_NAME: &str = "merged.pdf";

/// Archive name for a multi-file single-mode result.
pub const BUNDLE_ARCHIVE_NAME: &str = "images-pdf.zip";

/// True when `name` ends in one of the accepted image extensions.
pub fn is_accepted(name: &str) -> bool {
    ImageKind::from_file_name(name).is_some()
}

/// Keep accepted sources in their original order. Everything else is
/// dropped without an error.
pub fn filter_accepted(sources: Vec<SourceImage>) -> Vec<SourceImage> {
    sources
        .into_iter()
        .filter(|source| {
            let keep = is_accepted(source.name());
            if !keep {
                debug!(name = source.name(), "Skipping file with unsupported extension");
            }
            keep
        })
        .collect()
}

/// File name without its last extension: `a.b.png` → `a.b`, `.png` → ``.
pub fn basename(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

pub fn pdf_name_for(name: &str) -> String {
    format!("{}.pdf", basename(name))
}

/// PDF names for `names`, with repeats renamed `x (2).pdf`, `x (3).pdf`, …
/// so that no two entries share a name.
pub fn unique_pdf_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut taken = HashSet::new();
    names
        .into_iter()
        .map(|name| {
            let stem = basename(name);
            let mut candidate = pdf_name_for(name);
            let mut counter = 2;
            while !taken.insert(candidate.to_ascii_lowercase()) {
                candidate = format!("{stem} ({counter}).pdf");
                counter += 1;
            }
            candidate
        })
        .collect()
}
