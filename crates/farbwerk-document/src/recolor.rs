// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page recolouring: paint a page's background, then redraw its text lines.
//
// Each line is drawn as one run anchored at its first non-blank span, with
// that span's font size. When the run cannot be drawn, every span is drawn on
// its own, and a span that still fails is dropped.

use farbwerk_core::{BBox, Block, ColorScheme, PageLayout, PageSize, Rgb, TextSpan};
use tracing::{debug, trace};

use crate::error::RenderError;
use crate::sanitize::sanitize;

/// Font size used when a span reports an unusable one.
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// A drawing surface for one output page, in page space (origin top-left).
pub trait PageCanvas {
    fn size(&self) -> PageSize;

    /// Fill `rect` with `fill`.
    fn draw_rect(&mut self, rect: BBox, fill: Rgb);

    /// Draw `text` with its baseline starting at `origin`. On error nothing
    /// is drawn.
    fn insert_text(
        &mut self,
        origin: (f32, f32),
        text: &str,
        font_size: f32,
        color: Rgb,
    ) -> Result<(), RenderError>;
}

/// Per-page drawing counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageStats {
    pub lines_drawn: usize,
    pub lines_fallen_back: usize,
    pub spans_skipped: usize,
}

impl PageStats {
    pub fn add(&mut self, other: PageStats) {
        self.lines_drawn += other.lines_drawn;
        self.lines_fallen_back += other.lines_fallen_back;
        self.spans_skipped += other.spans_skipped;
    }
}

/// Redraws page layouts in a scheme's colours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRecolorer {
    background: Rgb,
    foreground: Rgb,
}

impl PageRecolorer {
    pub fn new(background: Rgb, foreground: Rgb) -> Self {
        Self {
            background,
            foreground,
        }
    }

    pub fn for_scheme(scheme: &ColorScheme) -> Self {
        Self::new(scheme.background, scheme.output_text_color())
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    pub fn foreground(&self) -> Rgb {
        self.foreground
    }

    /// Paint the background over the whole canvas, then every text line.
    pub fn recolor<C: PageCanvas>(&self, layout: &PageLayout, canvas: &mut C) -> PageStats {
        let size = canvas.size();
        canvas.draw_rect(BBox::new(0.0, 0.0, size.width, size.height), self.background);

        let mut stats = PageStats::default();
        for block in &layout.blocks {
            let Block::Text { lines } = block else {
                continue;
            };
            for line in lines {
                let spans: Vec<&TextSpan> = line.spans.iter().filter(|s| !s.is_blank()).collect();
                let Some(anchor) = spans.first() else {
                    continue;
                };

                let text: String = spans.iter().map(|s| sanitize(&s.text)).collect();
                match canvas.insert_text(
                    anchor.bbox.origin(),
                    &text,
                    usable_size(anchor.font_size),
                    self.foreground,
                ) {
                    Ok(()) => stats.lines_drawn += 1,
                    Err(err) => {
                        debug!(%err, line = %text, "line run failed; drawing spans individually");
                        stats.lines_fallen_back += 1;
                        stats.spans_skipped += self.draw_spans(&spans, canvas);
                    }
                }
            }
        }
        stats
    }

    /// Draw spans one by one; returns how many had to be skipped.
    fn draw_spans<C: PageCanvas>(&self, spans: &[&TextSpan], canvas: &mut C) -> usize {
        let mut skipped = 0;
        for span in spans {
            let text = sanitize(&span.text);
            if let Err(err) = canvas.insert_text(
                span.bbox.origin(),
                &text,
                usable_size(span.font_size),
                self.foreground,
            ) {
                trace!(%err, span = %text, "span skipped");
                skipped += 1;
            }
        }
        skipped
    }
}

fn usable_size(size: f32) -> f32 {
    if size.is_finite() && size > 0.0 {
        size
    } else {
        DEFAULT_FONT_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farbwerk_core::TextLine;
    use farbwerk_core::schemes::get_scheme;

    #[derive(Debug, Clone, PartialEq)]
    enum Drawn {
        Rect(BBox, Rgb),
        Text {
            origin: (f32, f32),
            text: String,
            size: f32,
            color: Rgb,
        },
    }

    /// Records draw calls; rejects any text containing a character in `reject`.
    struct RecordingCanvas {
        size: PageSize,
        reject: Vec<char>,
        drawn: Vec<Drawn>,
    }

    impl RecordingCanvas {
        fn new() -> Self {
            Self {
                size: PageSize::new(612.0, 792.0),
                reject: Vec::new(),
                drawn: Vec::new(),
            }
        }

        fn rejecting(chars: &[char]) -> Self {
            Self {
                reject: chars.to_vec(),
                ..Self::new()
            }
        }

        fn texts(&self) -> Vec<&str> {
            self.drawn
                .iter()
                .filter_map(|d| match d {
                    Drawn::Text { text, .. } => Some(text.as_str()),
                    Drawn::Rect(..) => None,
                })
                .collect()
        }
    }

    impl PageCanvas for RecordingCanvas {
        fn size(&self) -> PageSize {
            self.size
        }

        fn draw_rect(&mut self, rect: BBox, fill: Rgb) {
            self.drawn.push(Drawn::Rect(rect, fill));
        }

        fn insert_text(
            &mut self,
            origin: (f32, f32),
            text: &str,
            font_size: f32,
            color: Rgb,
        ) -> Result<(), RenderError> {
            if let Some(ch) = text.chars().find(|c| self.reject.contains(c)) {
                return Err(RenderError::Unencodable { ch });
            }
            self.drawn.push(Drawn::Text {
                origin,
                text: text.to_string(),
                size: font_size,
                color,
            });
            Ok(())
        }
    }

    fn span(text: &str, x: f32, y: f32, size: f32) -> TextSpan {
        TextSpan::new(text, BBox::new(x, y, x + 50.0, y + size), size)
    }

    fn layout(lines: Vec<TextLine>) -> PageLayout {
        PageLayout::new(PageSize::new(612.0, 792.0), vec![Block::Text { lines }])
    }

    fn sepia() -> PageRecolorer {
        PageRecolorer::for_scheme(get_scheme("Sepia").unwrap())
    }

    #[test]
    fn background_is_drawn_first_over_whole_page() {
        let mut canvas = RecordingCanvas::new();
        let recolorer = sepia();
        recolorer.recolor(&layout(vec![TextLine::new(vec![span("a", 1.0, 1.0, 10.0)])]), &mut canvas);
        assert_eq!(
            canvas.drawn[0],
            Drawn::Rect(BBox::new(0.0, 0.0, 612.0, 792.0), recolorer.background())
        );
    }

    #[test]
    fn sanitised_line_anchored_at_first_span() {
        let mut canvas = RecordingCanvas::new();
        let line = TextLine::new(vec![span("Merhaba İstanbul", 50.0, 100.0, 12.0)]);
        let stats = sepia().recolor(&layout(vec![line]), &mut canvas);

        assert_eq!(stats.lines_drawn, 1);
        assert_eq!(
            canvas.drawn[1],
            Drawn::Text {
                origin: (50.0, 100.0),
                text: "Merhaba Istanbul".to_string(),
                size: 12.0,
                color: Rgb::BLACK,
            }
        );
    }

    #[test]
    fn spans_join_without_separator_using_anchor_size() {
        let mut canvas = RecordingCanvas::new();
        let line = TextLine::new(vec![
            span("   ", 10.0, 10.0, 30.0),
            span("Bold ", 40.0, 10.0, 14.0),
            span("plain", 90.0, 12.0, 10.0),
        ]);
        sepia().recolor(&layout(vec![line]), &mut canvas);
        match &canvas.drawn[1] {
            Drawn::Text { origin, text, size, .. } => {
                assert_eq!(*origin, (40.0, 10.0));
                assert_eq!(text, "Bold plain");
                assert_eq!(*size, 14.0);
            }
            other => panic!("expected text, got {other:?}"),
        }
        assert_eq!(canvas.drawn.len(), 2);
    }

    #[test]
    fn failed_line_falls_back_to_spans_and_skips_failures() {
        let mut canvas = RecordingCanvas::rejecting(&['Ж']);
        let line = TextLine::new(vec![
            span("Hello ", 10.0, 10.0, 12.0),
            span("Жук", 60.0, 10.0, 12.0),
            span(" world", 90.0, 10.0, 11.0),
        ]);
        let stats = sepia().recolor(&layout(vec![line]), &mut canvas);

        assert_eq!(
            stats,
            PageStats {
                lines_drawn: 0,
                lines_fallen_back: 1,
                spans_skipped: 1,
            }
        );
        assert_eq!(canvas.texts(), vec!["Hello ", " world"]);
        match &canvas.drawn[2] {
            Drawn::Text { origin, size, .. } => {
                assert_eq!(*origin, (90.0, 10.0));
                assert_eq!(*size, 11.0);
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn opaque_and_blank_only_content_draws_background_only() {
        let mut canvas = RecordingCanvas::new();
        let page = PageLayout::new(
            PageSize::new(612.0, 792.0),
            vec![
                Block::Opaque {
                    bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
                },
                Block::Text {
                    lines: vec![TextLine::new(vec![span(" \t", 0.0, 0.0, 12.0)])],
                },
            ],
        );
        let stats = sepia().recolor(&page, &mut canvas);
        assert_eq!(stats, PageStats::default());
        assert_eq!(canvas.drawn.len(), 1);
    }

    #[test]
    fn dark_mode_draws_white_text_others_black() {
        let dark = PageRecolorer::for_scheme(get_scheme("Dark Mode").unwrap());
        assert_eq!(dark.foreground(), Rgb::WHITE);
        let green = PageRecolorer::for_scheme(get_scheme("Green Tint").unwrap());
        assert_eq!(green.foreground(), Rgb::BLACK);
    }

    #[test]
    fn invalid_font_size_uses_default() {
        let mut canvas = RecordingCanvas::new();
        let line = TextLine::new(vec![span("x", 5.0, 5.0, f32::NAN)]);
        sepia().recolor(&layout(vec![line]), &mut canvas);
        match &canvas.drawn[1] {
            Drawn::Text { size, .. } => assert_eq!(*size, DEFAULT_FONT_SIZE),
            other => panic!("expected text, got {other:?}"),
        }
    }
}
