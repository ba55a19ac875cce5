// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: assembling image pages into documents and reading them back.

pub mod assembler;
pub mod reader;

pub use assembler::{PageAssembler, assemble_merged, assemble_single};
pub use reader::PdfReader;
