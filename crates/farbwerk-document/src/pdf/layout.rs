// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout extraction: turn a page into blocks of lines of spans.
//
// Two strategies sit behind one trait: the content-stream strategy groups
// positioned glyph runs geometrically; the plain-text strategy asks lopdf for
// the page's text and lays it out on a fixed grid. The extractor tries them
// in order and only fails when both do.

use farbwerk_core::{BBox, Block, PageLayout, TextLine, TextSpan};
use tracing::{debug, instrument, warn};

use crate::error::ExtractionError;
use crate::pdf::content::{GlyphRun, PaintEvent, interpret_page};
use crate::pdf::reader::{MediaBox, SourceDocument};

/// Left and top margin of plain-text layouts.
const PLAIN_MARGIN: f32 = 72.0;
/// Font size assigned to plain-text lines.
const PLAIN_FONT_SIZE: f32 = 12.0;
/// Baseline-to-baseline distance of plain-text lines.
const PLAIN_LEADING: f32 = PLAIN_FONT_SIZE * 1.2;

/// A way of producing a [`PageLayout`] for one page.
pub trait LayoutStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, doc: &SourceDocument, index: usize) -> Result<PageLayout, ExtractionError>;
}

/// Runs a primary strategy and falls back to a second one.
pub struct LayoutExtractor {
    primary: Box<dyn LayoutStrategy>,
    fallback: Box<dyn LayoutStrategy>,
}

impl Default for LayoutExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutExtractor {
    /// Content-stream geometry first, lopdf plain text second.
    pub fn new() -> Self {
        Self::with_strategies(Box::new(ContentStreamStrategy), Box::new(PlainTextStrategy))
    }

    pub fn with_strategies(
        primary: Box<dyn LayoutStrategy>,
        fallback: Box<dyn LayoutStrategy>,
    ) -> Self {
        Self { primary, fallback }
    }

    #[instrument(skip(self, doc), fields(primary = self.primary.name()))]
    pub fn extract(&self, doc: &SourceDocument, index: usize) -> Result<PageLayout, ExtractionError> {
        let count = doc.page_count();
        if index >= count {
            return Err(ExtractionError::PageOutOfRange { index, count });
        }

        match self.primary.extract(doc, index) {
            Ok(layout) => Ok(layout),
            Err(primary) => {
                warn!(
                    page = index,
                    strategy = self.primary.name(),
                    error = %primary,
                    "layout extraction failed; trying fallback"
                );
                self.fallback.extract(doc, index).map_err(|fallback| {
                    ExtractionError::Exhausted {
                        primary: Box::new(primary),
                        fallback: Box::new(fallback),
                    }
                })
            }
        }
    }
}

// -- Content-stream strategy --------------------------------------------------

/// Groups glyph runs from the page's content stream into spans, lines and
/// blocks. Images become opaque blocks.
pub struct ContentStreamStrategy;

impl LayoutStrategy for ContentStreamStrategy {
    fn name(&self) -> &'static str {
        "content-stream"
    }

    fn extract(&self, doc: &SourceDocument, index: usize) -> Result<PageLayout, ExtractionError> {
        let content = interpret_page(doc, index)?;
        let media_box = content.media_box;

        let mut builder = BlockBuilder::default();
        for event in &content.events {
            match event {
                PaintEvent::Text(run) => builder.push_piece(Piece::from_run(run, &media_box)),
                PaintEvent::Image { bbox } => {
                    let (x0, y0, x1, y1) = *bbox;
                    let (left, top) = media_box.to_page_space(x0, y1);
                    let (right, bottom) = media_box.to_page_space(x1, y0);
                    builder.push_opaque(BBox::new(left, top, right, bottom));
                }
                PaintEvent::Fill { .. } => {}
            }
        }

        let blocks = builder.finish();
        debug!(page = index, blocks = blocks.len(), "layout grouped");
        Ok(PageLayout::new(media_box.size(), blocks))
    }
}

/// One glyph run in page space.
#[derive(Debug, Clone)]
struct Piece {
    text: String,
    font_name: String,
    font_size: f32,
    baseline: f32,
    bbox: BBox,
}

impl Piece {
    fn from_run(run: &GlyphRun, media_box: &MediaBox) -> Self {
        let (start_x, baseline) = media_box.to_page_space(run.origin.0, run.origin.1);
        let (end_x, _) = media_box.to_page_space(run.end.0, run.end.1);
        let bbox = BBox::new(
            start_x.min(end_x),
            baseline - run.ascent,
            start_x.max(end_x),
            baseline + run.descent,
        );
        Self {
            text: run.text.clone(),
            font_name: run.font_name.clone(),
            font_size: run.font_size,
            baseline,
            bbox,
        }
    }

    fn same_style(&self, other: &Piece) -> bool {
        self.font_name == other.font_name && (self.font_size - other.font_size).abs() < 0.01
    }
}

/// A line being assembled: pieces sharing a baseline, left to right.
#[derive(Debug, Default)]
struct LineBuilder {
    pieces: Vec<Piece>,
}

impl LineBuilder {
    fn accepts(&self, piece: &Piece) -> bool {
        let Some(last) = self.pieces.last() else {
            return true;
        };
        let size = last.font_size.max(piece.font_size).max(1.0);
        let same_baseline = (last.baseline - piece.baseline).abs() <= 0.3 * size;
        let moves_forward = piece.bbox.x0 >= last.bbox.x1 - 0.5 * size;
        same_baseline && moves_forward
    }

    /// Merge consecutive same-style pieces into spans.
    fn into_line(self) -> Option<TextLine> {
        let mut spans: Vec<(Piece, TextSpan)> = Vec::new();
        for piece in self.pieces {
            if let Some((prev, span)) = spans.last_mut() {
                if prev.same_style(&piece) {
                    let gap = piece.bbox.x0 - span.bbox.x1;
                    let boundary_has_space = span.text.ends_with(char::is_whitespace)
                        || piece.text.starts_with(char::is_whitespace);
                    if gap > 0.25 * piece.font_size && !boundary_has_space {
                        span.text.push(' ');
                    }
                    span.text.push_str(&piece.text);
                    span.bbox = span.bbox.union(&piece.bbox);
                    *prev = piece;
                    continue;
                }
            }
            let span = TextSpan::new(piece.text.clone(), piece.bbox, piece.font_size);
            spans.push((piece, span));
        }

        if spans.is_empty() {
            return None;
        }
        Some(TextLine::new(spans.into_iter().map(|(_, span)| span).collect()))
    }
}

/// Accumulates lines into text blocks, closing a block on a paragraph-sized
/// gap or an image.
#[derive(Debug, Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    lines: Vec<TextLine>,
    line: LineBuilder,
}

impl BlockBuilder {
    fn push_piece(&mut self, piece: Piece) {
        if !self.line.accepts(&piece) {
            self.end_line();
        }
        self.line.pieces.push(piece);
    }

    fn push_opaque(&mut self, bbox: BBox) {
        self.end_line();
        self.end_block();
        self.blocks.push(Block::Opaque { bbox });
    }

    fn end_line(&mut self) {
        let Some(line) = std::mem::take(&mut self.line).into_line() else {
            return;
        };
        if let (Some(prev), Some(next)) = (self.lines.last().and_then(TextLine::bbox), line.bbox()) {
            let gap = next.y0 - prev.y1;
            let height = prev.height().max(1.0);
            if gap > 0.5 * height || gap < -2.0 * height {
                self.end_block();
            }
        }
        self.lines.push(line);
    }

    fn end_block(&mut self) {
        if !self.lines.is_empty() {
            self.blocks.push(Block::Text {
                lines: std::mem::take(&mut self.lines),
            });
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.end_line();
        self.end_block();
        self.blocks
    }
}

// -- Plain-text strategy ------------------------------------------------------

/// lopdf's own text extraction, placed one line per row from the top-left
/// margin. Positions are synthetic; only the text is taken from the page.
pub struct PlainTextStrategy;

impl LayoutStrategy for PlainTextStrategy {
    fn name(&self) -> &'static str {
        "plain-text"
    }

    fn extract(&self, doc: &SourceDocument, index: usize) -> Result<PageLayout, ExtractionError> {
        let size = doc
            .page_size(index)
            .ok_or(ExtractionError::PageOutOfRange {
                index,
                count: doc.page_count(),
            })?;
        let text = doc
            .document()
            .extract_text(&[index as u32 + 1])
            .map_err(|err| ExtractionError::Unavailable(err.to_string()))?;

        let lines: Vec<TextLine> = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(row, line)| {
                let line = line.trim_end();
                let top = PLAIN_MARGIN + row as f32 * PLAIN_LEADING;
                let width = line.chars().count() as f32 * PLAIN_FONT_SIZE * 0.5;
                let bbox = BBox::new(PLAIN_MARGIN, top, PLAIN_MARGIN + width, top + PLAIN_FONT_SIZE);
                TextLine::new(vec![TextSpan::new(line, bbox, PLAIN_FONT_SIZE)])
            })
            .collect();

        let blocks = if lines.is_empty() {
            Vec::new()
        } else {
            vec![Block::Text { lines }]
        };
        Ok(PageLayout::new(size, blocks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{FixturePage, build_pdf};

    fn source(content: &str) -> SourceDocument {
        let bytes = build_pdf(&[FixturePage::with_content(612.0, 792.0, content)]);
        SourceDocument::from_bytes(&bytes).unwrap()
    }

    fn text_blocks(layout: &PageLayout) -> Vec<&Vec<TextLine>> {
        layout
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Text { lines } => Some(lines),
                Block::Opaque { .. } => None,
            })
            .collect()
    }

    #[test]
    fn single_line_maps_to_page_space() {
        let doc = source("BT /F2 12 Tf 50 692 Td (Hello) Tj ET");
        let layout = ContentStreamStrategy.extract(&doc, 0).unwrap();
        assert_eq!(layout.size.width, 612.0);
        let line = layout.lines().next().unwrap();
        assert_eq!(line.spans.len(), 1);
        let span = &line.spans[0];
        assert_eq!(span.text, "Hello");
        assert!((span.font_size - 12.0).abs() < 1e-4);
        // Baseline at 792 - 692 = 100; default ascent 0.8 em.
        assert!((span.bbox.x0 - 50.0).abs() < 1e-3);
        assert!((span.bbox.y0 - (100.0 - 9.6)).abs() < 1e-3);
        assert!((span.bbox.y1 - (100.0 + 2.4)).abs() < 1e-3);
    }

    #[test]
    fn same_style_runs_merge_with_word_space() {
        let doc = source("BT /F2 10 Tf 50 700 Td (Hello) Tj 40 0 Td (World) Tj ET");
        let layout = ContentStreamStrategy.extract(&doc, 0).unwrap();
        let lines: Vec<_> = layout.lines().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].spans.len(), 1);
        assert_eq!(lines[0].spans[0].text, "Hello World");
    }

    #[test]
    fn size_change_starts_new_span_on_same_line() {
        let doc = source("BT /F2 10 Tf 50 700 Td (Big) Tj /F2 8 Tf 20 0 Td (small) Tj ET");
        let layout = ContentStreamStrategy.extract(&doc, 0).unwrap();
        let line = layout.lines().next().unwrap();
        assert_eq!(line.spans.len(), 2);
        assert_eq!(line.spans[0].text, "Big");
        assert_eq!(line.spans[1].text, "small");
        assert!((line.spans[1].font_size - 8.0).abs() < 1e-4);
    }

    #[test]
    fn lines_and_paragraph_blocks() {
        let doc = source(
            "BT /F1 12 Tf 14 TL 72 700 Td (first) Tj T* (second) Tj 0 -40 Td (third) Tj ET",
        );
        let layout = ContentStreamStrategy.extract(&doc, 0).unwrap();
        let blocks = text_blocks(&layout);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].len(), 2);
        assert_eq!(blocks[0][1].text(), "second");
        assert_eq!(blocks[1][0].text(), "third");
    }

    #[test]
    fn images_become_opaque_blocks() {
        let doc = source("BT /F1 12 Tf 72 700 Td (caption) Tj ET q 100 0 0 100 50 50 cm /Im1 Do Q");
        let layout = ContentStreamStrategy.extract(&doc, 0).unwrap();
        assert_eq!(layout.blocks.len(), 2);
        assert!(layout.blocks[0].is_text());
        assert_eq!(
            layout.blocks[1],
            Block::Opaque {
                bbox: BBox::new(50.0, 642.0, 150.0, 742.0)
            }
        );
    }

    #[test]
    fn image_only_page_has_no_lines() {
        let bytes = build_pdf(&[FixturePage::image_only(300.0, 300.0)]);
        let doc = SourceDocument::from_bytes(&bytes).unwrap();
        let layout = LayoutExtractor::new().extract(&doc, 0).unwrap();
        assert_eq!(layout.lines().count(), 0);
        assert_eq!(layout.blocks.len(), 1);
    }

    #[test]
    fn plain_text_strategy_uses_fixed_grid() {
        let doc = source("BT /F1 12 Tf 72 700 Td (alpha) Tj ET");
        let layout = PlainTextStrategy.extract(&doc, 0).unwrap();
        let line = layout.lines().next().unwrap();
        assert!(line.text().contains("alpha"));
        assert_eq!(line.spans[0].bbox.origin(), (PLAIN_MARGIN, PLAIN_MARGIN));
        assert_eq!(line.spans[0].font_size, PLAIN_FONT_SIZE);
    }

    struct Failing(&'static str);

    impl LayoutStrategy for Failing {
        fn name(&self) -> &'static str {
            self.0
        }

        fn extract(&self, _: &SourceDocument, _: usize) -> Result<PageLayout, ExtractionError> {
            Err(ExtractionError::Unavailable(self.0.to_string()))
        }
    }

    #[test]
    fn extractor_falls_back_then_exhausts() {
        let doc = source("BT /F1 12 Tf 72 700 Td (fallback) Tj ET");

        let extractor =
            LayoutExtractor::with_strategies(Box::new(Failing("primary")), Box::new(PlainTextStrategy));
        let layout = extractor.extract(&doc, 0).unwrap();
        assert!(layout.text().contains("fallback"));

        let extractor = LayoutExtractor::with_strategies(
            Box::new(Failing("primary")),
            Box::new(Failing("secondary")),
        );
        let err = extractor.extract(&doc, 0).unwrap_err();
        assert!(matches!(err, ExtractionError::Exhausted { .. }));
    }

    #[test]
    fn extractor_rejects_out_of_range_pages() {
        let doc = source("");
        let err = LayoutExtractor::new().extract(&doc, 1).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::PageOutOfRange { index: 1, count: 1 }
        ));
    }
}
