// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: reading source documents, interpreting page content, building
// text layouts, and writing recoloured output.

pub mod content;
pub mod font;
pub mod layout;
pub mod reader;
pub mod winansi;
pub mod writer;

#[cfg(test)]
pub(crate) mod fixtures;

pub use layout::LayoutExtractor;
pub use reader::SourceDocument;
pub use writer::OutputDocument;
