// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: build recoloured output documents with `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: each page is a `Vec<Op>` operation
// list, and the document is serialised via `PdfDocument::save()`. A lopdf
// pass then finishes every page:
//
// - page boxes are set to the exact source dimensions (printpdf sizes pages
//   in millimetres), and /Rotate is copied from the source page;
// - text runs, handed to printpdf as ASCII placeholders, are swapped for
//   their WinAnsi bytes. printpdf writes builtin-font text as UTF-8.

use farbwerk_core::config::TextFont;
use farbwerk_core::error::FarbwerkError;
use farbwerk_core::{BBox, PageSize, Rgb};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId, StringFormat};
use printpdf::{
    BuiltinFont, Color, LinePoint, Mm, Op, PaintMode, PdfDocument, PdfPage, PdfSaveOptions,
    PdfWarnMsg, Point, Polygon, PolygonRing, Pt, TextItem, WindingOrder,
};
use tracing::{debug, info, instrument, warn};

use crate::error::RenderError;
use crate::pdf::winansi;
use crate::recolor::PageCanvas;

const MM_PER_PT: f32 = 25.4 / 72.0;

/// Prefix of the placeholder string standing in for a text run.
const RUN_MARKER: &str = "FWRUN";

fn run_marker(index: usize) -> String {
    format!("{RUN_MARKER}{index}")
}

fn parse_run_marker(bytes: &[u8]) -> Option<usize> {
    let digits = bytes.strip_prefix(RUN_MARKER.as_bytes())?;
    std::str::from_utf8(digits).ok()?.parse().ok()
}

fn builtin_font(font: TextFont) -> BuiltinFont {
    match font {
        TextFont::Helvetica => BuiltinFont::Helvetica,
        TextFont::TimesRoman => BuiltinFont::TimesRoman,
        TextFont::Courier => BuiltinFont::Courier,
    }
}

fn pdf_color(color: Rgb) -> Color {
    Color::Rgb(printpdf::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
        icc_profile: None,
    })
}

/// An output document under construction.
pub struct OutputDocument {
    /// Title metadata embedded in the PDF /Info dictionary.
    title: String,
    font: BuiltinFont,
    pages: Vec<PdfPageCanvas>,
}

impl OutputDocument {
    pub fn new(title: impl Into<String>, font: TextFont) -> Self {
        Self {
            title: title.into(),
            font: builtin_font(font),
            pages: Vec::new(),
        }
    }

    /// Start a blank page of `size`; add it with [`OutputDocument::push_page`].
    pub fn begin_page(&self, size: PageSize) -> PdfPageCanvas {
        PdfPageCanvas {
            size,
            rotation: 0,
            font: self.font,
            ops: Vec::new(),
            runs: Vec::new(),
        }
    }

    pub fn push_page(&mut self, page: PdfPageCanvas) {
        self.pages.push(page);
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Serialise the document.
    #[instrument(skip(self), fields(title = %self.title, pages = self.pages.len()))]
    pub fn to_bytes(self) -> Result<Vec<u8>, FarbwerkError> {
        if self.pages.is_empty() {
            return Err(FarbwerkError::Conversion(
                "output document has no pages".to_string(),
            ));
        }

        let mut finishes = Vec::with_capacity(self.pages.len());
        let mut pages = Vec::with_capacity(self.pages.len());
        for page in self.pages {
            pages.push(PdfPage::new(
                Mm(page.size.width * MM_PER_PT),
                Mm(page.size.height * MM_PER_PT),
                page.ops,
            ));
            finishes.push(PageFinish {
                size: page.size,
                rotation: page.rotation,
                runs: page.runs,
            });
        }

        let mut doc = PdfDocument::new(&self.title);
        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            debug!(count = warnings.len(), "printpdf reported warnings");
        }

        let output = finish_pages(&output, &finishes)?;
        info!(bytes = output.len(), "Output PDF serialised");
        Ok(output)
    }
}

/// What the lopdf pass needs to know about one page.
struct PageFinish {
    size: PageSize,
    rotation: i64,
    runs: Vec<Vec<u8>>,
}

fn conversion_error(context: &str, err: lopdf::Error) -> FarbwerkError {
    FarbwerkError::Conversion(format!("{context}: {err}"))
}

/// Restore text runs, set /MediaBox, /CropBox and /TrimBox to `[0 0 w h]`
/// and /Rotate to the source rotation on every page.
fn finish_pages(bytes: &[u8], pages: &[PageFinish]) -> Result<Vec<u8>, FarbwerkError> {
    let mut document = Document::load_mem(bytes)
        .map_err(|err| conversion_error("generated PDF could not be re-read", err))?;
    let page_ids: Vec<_> = document.get_pages().into_values().collect();
    if page_ids.len() != pages.len() {
        warn!(
            expected = pages.len(),
            found = page_ids.len(),
            "page count changed during serialisation"
        );
    }

    for (page_id, finish) in page_ids.into_iter().zip(pages) {
        if !finish.runs.is_empty() {
            restore_text_runs(&mut document, page_id, &finish.runs)?;
        }

        let page = document
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|err| conversion_error("page dictionary missing", err))?;
        let size = finish.size;
        let rect = || {
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(size.width),
                Object::Real(size.height),
            ])
        };
        page.set("MediaBox", rect());
        page.set("CropBox", rect());
        page.set("TrimBox", rect());
        if finish.rotation != 0 {
            page.set("Rotate", finish.rotation);
        }
    }

    let mut output = Vec::new();
    document
        .save_to(&mut output)
        .map_err(|err| FarbwerkError::Conversion(format!("failed to write page boxes: {err}")))?;
    Ok(output)
}

/// Swap every placeholder string on the page for its encoded run.
fn restore_text_runs(
    document: &mut Document,
    page_id: ObjectId,
    runs: &[Vec<u8>],
) -> Result<(), FarbwerkError> {
    let data = document
        .get_page_content(page_id)
        .map_err(|err| conversion_error("generated page content unreadable", err))?;
    let mut content = Content::decode(&data)
        .map_err(|err| conversion_error("generated page content unparsable", err))?;

    let mut restored = 0;
    for operation in &mut content.operations {
        if matches!(operation.operator.as_str(), "Tj" | "TJ" | "'" | "\"") {
            for operand in &mut operation.operands {
                restored += restore_operand(operand, runs);
            }
        }
    }
    if restored != runs.len() {
        return Err(FarbwerkError::Conversion(format!(
            "found {restored} of {} text runs in generated page",
            runs.len()
        )));
    }

    let encoded = content
        .encode()
        .map_err(|err| conversion_error("page content could not be re-encoded", err))?;
    document
        .change_page_content(page_id, encoded)
        .map_err(|err| conversion_error("page content could not be replaced", err))
}

fn restore_operand(operand: &mut Object, runs: &[Vec<u8>]) -> usize {
    match operand {
        Object::String(bytes, format) => match parse_run_marker(bytes).and_then(|i| runs.get(i)) {
            Some(run) => {
                *bytes = run.clone();
                *format = StringFormat::Hexadecimal;
                1
            }
            None => 0,
        },
        Object::Array(items) => items
            .iter_mut()
            .map(|item| restore_operand(item, runs))
            .sum(),
        _ => 0,
    }
}

/// A page of an [`OutputDocument`], recorded as printpdf operations.
pub struct PdfPageCanvas {
    size: PageSize,
    /// /Rotate for the finished page, in degrees.
    rotation: i64,
    font: BuiltinFont,
    ops: Vec<Op>,
    /// WinAnsi bytes of each text run, indexed by placeholder.
    runs: Vec<Vec<u8>>,
}

impl PdfPageCanvas {
    /// Number of recorded operations.
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// Display rotation of the finished page (a multiple of 90 degrees).
    pub fn set_rotation(&mut self, degrees: i64) {
        self.rotation = degrees.rem_euclid(360);
    }
}

impl PageCanvas for PdfPageCanvas {
    fn size(&self) -> PageSize {
        self.size
    }

    fn draw_rect(&mut self, rect: BBox, fill: Rgb) {
        let h = self.size.height;
        let corner = |x: f32, y: f32| LinePoint {
            p: Point {
                x: Pt(x),
                y: Pt(h - y),
            },
            bezier: false,
        };
        self.ops.push(Op::SetFillColor {
            col: pdf_color(fill),
        });
        self.ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: vec![
                        corner(rect.x0, rect.y0),
                        corner(rect.x1, rect.y0),
                        corner(rect.x1, rect.y1),
                        corner(rect.x0, rect.y1),
                    ],
                }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    fn insert_text(
        &mut self,
        origin: (f32, f32),
        text: &str,
        font_size: f32,
        color: Rgb,
    ) -> Result<(), RenderError> {
        if !font_size.is_finite() || font_size <= 0.0 {
            return Err(RenderError::InvalidFontSize(font_size));
        }
        let (x, y) = origin;
        if !x.is_finite() || !y.is_finite() {
            return Err(RenderError::InvalidPosition { x, y });
        }
        let encoded = winansi::encode(text)?;
        let marker = run_marker(self.runs.len());

        self.ops.extend([
            Op::StartTextSection,
            Op::SetFillColor {
                col: pdf_color(color),
            },
            Op::SetTextCursor {
                pos: Point {
                    x: Pt(x),
                    y: Pt(self.size.height - y),
                },
            },
            Op::SetFontSizeBuiltinFont {
                size: Pt(font_size),
                font: self.font,
            },
            Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(marker)],
                font: self.font,
            },
            Op::EndTextSection,
        ]);
        self.runs.push(encoded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::layout::LayoutExtractor;
    use crate::pdf::reader::SourceDocument;

    #[test]
    fn page_boxes_match_requested_size_exactly() {
        let mut out = OutputDocument::new("sizes", TextFont::Helvetica);
        for size in [PageSize::new(612.0, 792.0), PageSize::new(595.0, 842.0)] {
            let mut page = out.begin_page(size);
            page.draw_rect(BBox::new(0.0, 0.0, size.width, size.height), Rgb::WHITE);
            out.push_page(page);
        }
        assert_eq!(out.page_count(), 2);

        let bytes = out.to_bytes().unwrap();
        let reread = SourceDocument::from_bytes(&bytes).unwrap();
        assert_eq!(reread.page_count(), 2);
        assert_eq!(reread.page_size(0), Some(PageSize::new(612.0, 792.0)));
        assert_eq!(reread.page_size(1), Some(PageSize::new(595.0, 842.0)));
    }

    #[test]
    fn unencodable_text_is_rejected_without_recording() {
        let out = OutputDocument::new("t", TextFont::Helvetica);
        let mut page = out.begin_page(PageSize::new(100.0, 100.0));
        let err = page
            .insert_text((10.0, 20.0), "Merhaba İstanbul", 12.0, Rgb::BLACK)
            .unwrap_err();
        assert_eq!(err, RenderError::Unencodable { ch: 'İ' });
        assert_eq!(page.op_count(), 0);

        page.insert_text((10.0, 20.0), "Merhaba Istanbul", 12.0, Rgb::BLACK)
            .unwrap();
        assert_eq!(page.op_count(), 6);
    }

    #[test]
    fn non_ascii_text_is_written_in_winansi() {
        let text = "çok güzel • é (paren) back\\slash";
        let mut out = OutputDocument::new("latin", TextFont::Helvetica);
        let mut page = out.begin_page(PageSize::new(300.0, 200.0));
        page.draw_rect(BBox::new(0.0, 0.0, 300.0, 200.0), Rgb::WHITE);
        page.insert_text((10.0, 100.0), text, 12.0, Rgb::BLACK).unwrap();
        page.insert_text((10.0, 150.0), "plain", 12.0, Rgb::BLACK).unwrap();
        out.push_page(page);

        let reread = SourceDocument::from_bytes(&out.to_bytes().unwrap()).unwrap();
        let layout = LayoutExtractor::new().extract(&reread, 0).unwrap();
        let lines: Vec<String> = layout.lines().map(|line| line.text()).collect();
        assert_eq!(lines, vec![text.to_string(), "plain".to_string()]);
    }

    #[test]
    fn rotation_is_set_on_the_output_page() {
        let mut out = OutputDocument::new("rotated", TextFont::Helvetica);
        let mut page = out.begin_page(PageSize::new(612.0, 792.0));
        page.set_rotation(-90);
        out.push_page(page);
        out.push_page(out.begin_page(PageSize::new(612.0, 792.0)));

        let reread = SourceDocument::from_bytes(&out.to_bytes().unwrap()).unwrap();
        assert_eq!(reread.rotation(0), Some(270));
        assert_eq!(reread.rotation(1), Some(0));
        assert_eq!(reread.page_size(0), Some(PageSize::new(612.0, 792.0)));
    }

    #[test]
    fn run_markers_parse_back() {
        assert_eq!(parse_run_marker(run_marker(17).as_bytes()), Some(17));
        assert_eq!(parse_run_marker(b"FWRUN"), None);
        assert_eq!(parse_run_marker(b"hello"), None);
    }

    #[test]
    fn invalid_size_and_position_are_rejected() {
        let out = OutputDocument::new("t", TextFont::Courier);
        let mut page = out.begin_page(PageSize::new(100.0, 100.0));
        assert_eq!(
            page.insert_text((0.0, 0.0), "x", 0.0, Rgb::BLACK),
            Err(RenderError::InvalidFontSize(0.0))
        );
        assert!(matches!(
            page.insert_text((f32::NAN, 0.0), "x", 12.0, Rgb::BLACK),
            Err(RenderError::InvalidPosition { .. })
        ));
    }

    #[test]
    fn empty_document_cannot_be_serialised() {
        let out = OutputDocument::new("empty", TextFont::Helvetica);
        assert!(matches!(out.to_bytes(), Err(FarbwerkError::Conversion(_))));
    }
}
