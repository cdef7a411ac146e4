// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document conversion: recolour every page of a source document and write
// the result.
//
// Pages are processed strictly in order into an in-memory output document.
// Nothing touches the destination until every page has succeeded; the bytes
// are then written to a temporary file beside it and renamed into place.

use std::io::Write;
use std::path::Path;

use chrono::Utc;
use farbwerk_core::config::TextFont;
use farbwerk_core::error::{FarbwerkError, Result};
use farbwerk_core::schemes::require_scheme;
use farbwerk_core::{ColorScheme, ConversionReport};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use crate::integrity::hash_bytes;
use crate::pdf::layout::LayoutExtractor;
use crate::pdf::reader::SourceDocument;
use crate::pdf::writer::OutputDocument;
use crate::recolor::{PageRecolorer, PageStats};

/// Receives progress from a running conversion.
///
/// All methods have no-op defaults. The converter checks
/// [`ConversionObserver::is_cancelled`] before starting each page.
pub trait ConversionObserver: Send + Sync {
    /// Called once before the first page.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after a page has been added to the output.
    ///
    /// `page_num` is 1-indexed.
    fn on_page_complete(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl ConversionObserver for NoopObserver {}

/// A fully rendered output document, not yet written anywhere.
#[derive(Debug)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub pages: usize,
    pub stats: PageStats,
}

/// Drives layout extraction and recolouring over a whole document.
pub struct DocumentConverter {
    extractor: LayoutExtractor,
    text_font: TextFont,
}

impl Default for DocumentConverter {
    fn default() -> Self {
        Self::new(TextFont::default())
    }
}

impl DocumentConverter {
    pub fn new(text_font: TextFont) -> Self {
        Self::with_extractor(LayoutExtractor::new(), text_font)
    }

    pub fn with_extractor(extractor: LayoutExtractor, text_font: TextFont) -> Self {
        Self {
            extractor,
            text_font,
        }
    }

    // -- Rendering ------------------------------------------------------------

    /// Recolour every page of `source` into a new in-memory PDF.
    ///
    /// Any page that cannot be extracted aborts the whole document.
    #[instrument(skip_all, fields(scheme = scheme.id, pages = source.page_count()))]
    pub fn render(
        &self,
        source: &SourceDocument,
        scheme: &ColorScheme,
        observer: &dyn ConversionObserver,
    ) -> Result<RenderedDocument> {
        let total = source.page_count();
        if total == 0 {
            return Err(FarbwerkError::Conversion(
                "source document has no pages".to_string(),
            ));
        }

        let title = source
            .source_path()
            .and_then(|p| p.file_stem())
            .map(|stem| format!("{} ({})", stem.to_string_lossy(), scheme.name))
            .unwrap_or_else(|| scheme.name.to_string());
        let recolorer = PageRecolorer::for_scheme(scheme);
        let mut output = OutputDocument::new(title, self.text_font);
        let mut stats = PageStats::default();

        observer.on_conversion_start(total);
        for index in 0..total {
            if observer.is_cancelled() {
                info!(page = index, "Conversion cancelled");
                return Err(FarbwerkError::Cancelled);
            }

            let layout = self.extractor.extract(source, index).map_err(|err| {
                FarbwerkError::Conversion(format!("page {}: {err}", index + 1))
            })?;

            let mut page = output.begin_page(layout.size);
            page.set_rotation(source.rotation(index).unwrap_or(0));
            let page_stats = recolorer.recolor(&layout, &mut page);
            debug!(
                page = index,
                lines = page_stats.lines_drawn,
                fallbacks = page_stats.lines_fallen_back,
                skipped = page_stats.spans_skipped,
                "page recoloured"
            );
            stats.add(page_stats);
            output.push_page(page);

            observer.on_page_complete(index + 1, total);
        }

        let bytes = output.to_bytes()?;
        Ok(RenderedDocument {
            bytes,
            pages: total,
            stats,
        })
    }

    // -- Conversion -----------------------------------------------------------

    /// Recolour `source` with the scheme `scheme_id` and write it to `output`.
    ///
    /// The scheme is looked up before any page is touched; an unknown id
    /// creates no file.
    #[instrument(skip(self, source, output, observer), fields(output = %output.display()))]
    pub fn convert(
        &self,
        source: &SourceDocument,
        scheme_id: &str,
        output: &Path,
        observer: &dyn ConversionObserver,
    ) -> Result<ConversionReport> {
        let scheme = require_scheme(scheme_id)?;
        let started_at = Utc::now();
        info!(scheme = scheme.id, pages = source.page_count(), "Converting document");

        let rendered = self.render(source, scheme, observer)?;
        let output_sha256 = hash_bytes(&rendered.bytes);
        write_atomically(output, &rendered.bytes)?;

        let report = ConversionReport {
            scheme_id: scheme.id.to_string(),
            pages: rendered.pages,
            lines_drawn: rendered.stats.lines_drawn,
            lines_fallen_back: rendered.stats.lines_fallen_back,
            spans_skipped: rendered.stats.spans_skipped,
            output_sha256,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            pages = report.pages,
            elapsed_ms = report.elapsed_ms(),
            "Conversion finished"
        );
        Ok(report)
    }
}

/// Write `bytes` to a temporary file next to `output`, then rename it over
/// `output`. A failure leaves `output` untouched.
pub fn write_atomically(output: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(output).map_err(|err| {
        warn!(path = %output.display(), error = %err.error, "could not move output into place");
        FarbwerkError::Io(err.error)
    })?;
    debug!(path = %output.display(), bytes = bytes.len(), "output written");
    Ok(())
}
