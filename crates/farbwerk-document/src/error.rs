// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local error types for the two fallback seams: layout extraction and text
// insertion. Neither reaches the caller unless its fallback also fails.

use farbwerk_core::error::FarbwerkError;
use thiserror::Error;

/// A layout strategy could not produce a page layout.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    #[error("content stream unreadable: {0}")]
    Content(String),

    #[error("strategy unavailable: {0}")]
    Unavailable(String),

    #[error("primary strategy failed ({primary}); fallback failed ({fallback})")]
    Exhausted {
        primary: Box<ExtractionError>,
        fallback: Box<ExtractionError>,
    },
}

impl From<ExtractionError> for FarbwerkError {
    fn from(err: ExtractionError) -> Self {
        FarbwerkError::Extraction(err.to_string())
    }
}

/// Text could not be placed on an output page.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("character {ch:?} has no glyph in the output font encoding")]
    Unencodable { ch: char },

    #[error("invalid font size {0}")]
    InvalidFontSize(f32),

    #[error("insertion point ({x}, {y}) is not finite")]
    InvalidPosition { x: f32, y: f32 },
}
