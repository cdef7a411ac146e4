// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// farbwerk-document: Document processing for Farbwerk.
//
// Reads PDFs (lopdf), extracts a block/line/span text layout, rebuilds every
// page on an opaque background with the text re-rendered in the scheme's
// colour (printpdf), and rasterises pages for preview (image/imageproc).

pub mod convert;
pub mod error;
pub mod integrity;
pub mod job;
pub mod pdf;
pub mod preview;
pub mod recolor;
pub mod sanitize;
pub mod session;

// Re-export the primary structs so callers can use `farbwerk_document::PdfSession` etc.
pub use convert::{ConversionObserver, DocumentConverter, NoopObserver};
pub use error::{ExtractionError, RenderError};
pub use job::{CancelToken, ConversionEvent, ConversionJob, JobHandle};
pub use pdf::layout::LayoutExtractor;
pub use pdf::reader::{SourceDocument, is_valid_pdf};
pub use pdf::writer::OutputDocument;
pub use preview::PreviewRenderer;
pub use recolor::{PageCanvas, PageRecolorer};
pub use sanitize::sanitize;
pub use session::PdfSession;
