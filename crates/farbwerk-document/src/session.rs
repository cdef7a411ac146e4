// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Interactive session: at most one open source document, plus the preview
// and conversion operations that act on it.

use std::path::{Path, PathBuf};

use farbwerk_core::error::{FarbwerkError, Result};
use farbwerk_core::{AppConfig, ConversionReport, PageSize};
use tracing::{info, instrument};

use crate::convert::{ConversionObserver, DocumentConverter};
use crate::pdf::reader::SourceDocument;
use crate::preview::PreviewRenderer;

/// Holds the currently open document.
pub struct PdfSession {
    current: Option<SourceDocument>,
    config: AppConfig,
}

impl Default for PdfSession {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl PdfSession {
    pub fn new(config: AppConfig) -> Self {
        Self {
            current: None,
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Open `path`, replacing any previously open document. On failure the
    /// previous document is closed anyway.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn open(&mut self, path: &Path) -> Result<usize> {
        self.close();
        let document = SourceDocument::open(path)?;
        let pages = document.page_count();
        self.current = Some(document);
        Ok(pages)
    }

    pub fn close(&mut self) {
        if self.current.take().is_some() {
            info!("Closed PDF");
        }
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    pub fn page_count(&self) -> Option<usize> {
        self.current.as_ref().map(SourceDocument::page_count)
    }

    pub fn page_size(&self, index: usize) -> Option<PageSize> {
        self.current.as_ref()?.page_size(index)
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref()?.source_path()
    }

    pub fn document(&self) -> Option<&SourceDocument> {
        self.current.as_ref()
    }

    /// PNG preview of page `index` at `dpi` (the configured DPI when `None`).
    ///
    /// `Ok(None)` when no document is open or the page does not exist.
    pub fn preview(&self, index: usize, dpi: Option<u32>) -> Result<Option<Vec<u8>>> {
        let Some(document) = self.current.as_ref() else {
            return Ok(None);
        };
        let renderer = match dpi {
            Some(dpi) => PreviewRenderer::from_dpi(dpi),
            None => PreviewRenderer::new(self.config.preview_scale()),
        };
        renderer.render_png(document, index)
    }

    /// Default output path for the open document.
    pub fn default_output_path(&self) -> Option<PathBuf> {
        self.current_path()
            .map(|path| self.config.output_path_for(path))
    }

    /// Convert the open document with `scheme_id` into `output`.
    ///
    /// The conversion works on its own handle, reopened from the document's
    /// path, so the session's handle stays usable for previews.
    #[instrument(skip(self, output, observer), fields(output = %output.display()))]
    pub fn convert(
        &self,
        scheme_id: &str,
        output: &Path,
        observer: &dyn ConversionObserver,
    ) -> Result<ConversionReport> {
        let current = self.current.as_ref().ok_or(FarbwerkError::NoDocumentLoaded)?;
        let source = match current.source_path() {
            Some(path) => SourceDocument::open(path)?,
            None => current.clone(),
        };
        DocumentConverter::new(self.config.text_font).convert(&source, scheme_id, output, observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::NoopObserver;
    use crate::pdf::fixtures::{FixturePage, build_pdf};

    fn write_fixture(dir: &Path) -> PathBuf {
        let path = dir.join("report.pdf");
        std::fs::write(
            &path,
            build_pdf(&[
                FixturePage::with_content(612.0, 792.0, "BT /F1 12 Tf 72 700 Td (Hello) Tj ET"),
                FixturePage::blank(612.0, 792.0),
            ]),
        )
        .unwrap();
        path
    }

    #[test]
    fn convert_without_document_fails() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.pdf");
        let session = PdfSession::default();
        let err = session
            .convert("Sepia", &out, &NoopObserver)
            .unwrap_err();
        assert!(matches!(err, FarbwerkError::NoDocumentLoaded));
        assert!(!out.exists());
    }

    #[test]
    fn open_preview_convert_close() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_fixture(dir.path());
        let mut session = PdfSession::default();

        assert_eq!(session.open(&input).unwrap(), 2);
        assert_eq!(session.page_size(1), Some(PageSize::new(612.0, 792.0)));
        assert_eq!(session.current_path(), Some(input.as_path()));

        let png = session.preview(0, Some(36)).unwrap().unwrap();
        assert_eq!(&png[1..4], b"PNG");
        assert!(session.preview(2, None).unwrap().is_none());

        let out = session.default_output_path().unwrap();
        assert_eq!(out, dir.path().join("report_converted.pdf"));
        let report = session.convert("Dark Mode", &out, &NoopObserver).unwrap();
        assert_eq!(report.pages, 2);
        assert!(crate::is_valid_pdf(&out));

        session.close();
        assert!(!session.is_open());
        assert!(session.preview(0, None).unwrap().is_none());
    }

    #[test]
    fn preview_defaults_to_configured_dpi() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_fixture(dir.path());
        let config = AppConfig {
            preview_dpi: 72,
            ..AppConfig::default()
        };
        let mut session = PdfSession::new(config);
        session.open(&input).unwrap();

        let png = session.preview(0, None).unwrap().unwrap();
        let image = image::load_from_memory(&png).unwrap();
        assert_eq!((image.width(), image.height()), (612, 792));
    }

    #[test]
    fn failed_open_closes_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_fixture(dir.path());
        let bad = dir.path().join("bad.pdf");
        std::fs::write(&bad, b"nope").unwrap();

        let mut session = PdfSession::default();
        session.open(&input).unwrap();
        let err = session.open(&bad).unwrap_err();
        assert!(matches!(err, FarbwerkError::InvalidDocument(_)));
        assert!(!session.is_open());
    }
}
