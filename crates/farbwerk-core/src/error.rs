// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Farbwerk.

use thiserror::Error;

/// Top-level error type for all Farbwerk operations.
///
/// Only failures that reach the caller live here. Recoverable failures
/// (a line that must be redrawn span by span, a span that cannot be drawn at
/// all, a layout strategy that has a fallback) are typed locally in
/// `farbwerk-document` and never converted unless both tiers fail.
#[derive(Debug, Error)]
pub enum FarbwerkError {
    // -- Input validation --
    #[error("not a readable PDF: {0}")]
    InvalidDocument(String),

    #[error("no PDF document loaded")]
    NoDocumentLoaded,

    #[error("color scheme '{0}' not found")]
    UnknownScheme(String),

    // -- Processing --
    #[error("layout extraction failed: {0}")]
    Extraction(String),

    #[error("color conversion failed: {0}")]
    Conversion(String),

    #[error("conversion cancelled")]
    Cancelled,

    #[error("could not generate preview: {0}")]
    Preview(String),

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FarbwerkError>;
