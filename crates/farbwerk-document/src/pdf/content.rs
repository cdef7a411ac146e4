// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content-stream interpreter.
//
// Walks a page's operators with lopdf's content decoder, tracking the
// graphics and text state, and reports what gets painted: filled paths,
// shown glyph runs, and images. Layout extraction consumes the glyph runs;
// the preview rasteriser consumes everything.

use std::rc::Rc;

use farbwerk_core::Rgb;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object};
use tracing::{debug, trace};

use crate::error::ExtractionError;
use crate::pdf::font::FontInfo;
use crate::pdf::reader::{MediaBox, SourceDocument, number};

/// Nested form XObjects deeper than this are not entered.
const MAX_FORM_DEPTH: usize = 8;

/// A negative TJ adjustment beyond this (thousandths of an em) reads as a
/// word break.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

// -- Geometry -----------------------------------------------------------------

/// PDF transformation matrix `[a b c d e f]` (row-vector convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        let n: Vec<f32> = operands.iter().filter_map(number).collect();
        match n.as_slice() {
            [a, b, c, d, e, f] => Some(Self::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        }
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix::new(
            self.a * other.a + self.b * other.c,
            self.a * other.b + self.b * other.d,
            self.c * other.a + self.d * other.c,
            self.c * other.b + self.d * other.d,
            self.e * other.a + self.f * other.c + other.e,
            self.e * other.b + self.f * other.d + other.f,
        )
    }

    pub fn transform(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Length of the transformed unit y vector: how much a font size grows.
    pub fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

// -- Events -------------------------------------------------------------------

/// One shown character, positioned in user space.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedChar {
    pub ch: char,
    pub x: f32,
    pub y: f32,
    /// Horizontal advance in user space.
    pub advance: f32,
}

/// The glyphs of one text-showing operator.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRun {
    pub text: String,
    pub font_name: String,
    /// Effective size in user space.
    pub font_size: f32,
    /// Baseline start, user space.
    pub origin: (f32, f32),
    /// Baseline end, user space.
    pub end: (f32, f32),
    /// Distance above the baseline, user space.
    pub ascent: f32,
    /// Distance below the baseline, user space (positive).
    pub descent: f32,
    pub color: Rgb,
    pub chars: Vec<PlacedChar>,
}

/// Something the page paints.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintEvent {
    /// A filled path; each subpath is a closed polygon in user space.
    Fill {
        subpaths: Vec<Vec<(f32, f32)>>,
        color: Rgb,
    },
    Text(GlyphRun),
    /// An image, as its user-space bounding box `(x0, y0, x1, y1)`.
    Image { bbox: (f32, f32, f32, f32) },
}

/// Everything one page paints, in paint order.
#[derive(Debug, Clone)]
pub struct PageContent {
    pub media_box: MediaBox,
    pub events: Vec<PaintEvent>,
}

/// Interpret the content stream of the page at `index`.
pub fn interpret_page(
    source: &SourceDocument,
    index: usize,
) -> Result<PageContent, ExtractionError> {
    let media_box = source
        .media_box(index)
        .ok_or(ExtractionError::PageOutOfRange {
            index,
            count: source.page_count(),
        })?;
    let bytes = source
        .page_content(index)
        .map_err(|err| ExtractionError::Content(err.to_string()))?;

    let mut interpreter = Interpreter::new(source);
    interpreter.run(&bytes, source.page_resources(index))?;
    debug!(
        page = index,
        events = interpreter.events.len(),
        "content stream interpreted"
    );

    Ok(PageContent {
        media_box,
        events: interpreter.events,
    })
}

// -- Interpreter --------------------------------------------------------------

#[derive(Clone)]
struct GraphicsState<'a> {
    ctm: Matrix,
    fill: Rgb,
    font: Option<Rc<FontInfo<'a>>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    /// Tz as a fraction (100% = 1.0).
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for GraphicsState<'_> {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            fill: Rgb::BLACK,
            font: None,
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

struct Interpreter<'a> {
    source: &'a SourceDocument,
    state: GraphicsState<'a>,
    stack: Vec<GraphicsState<'a>>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    path: Vec<Vec<(f32, f32)>>,
    events: Vec<PaintEvent>,
    depth: usize,
}

impl<'a> Interpreter<'a> {
    fn new(source: &'a SourceDocument) -> Self {
        Self {
            source,
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            path: Vec::new(),
            events: Vec::new(),
            depth: 0,
        }
    }

    fn run(
        &mut self,
        bytes: &[u8],
        resources: Option<&'a Dictionary>,
    ) -> Result<(), ExtractionError> {
        let content =
            Content::decode(bytes).map_err(|err| ExtractionError::Content(err.to_string()))?;
        for op in &content.operations {
            self.apply(op, resources);
        }
        Ok(())
    }

    fn apply(&mut self, op: &Operation, resources: Option<&'a Dictionary>) {
        let nums: Vec<f32> = op.operands.iter().filter_map(number).collect();

        match op.operator.as_str() {
            // Graphics state
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(&op.operands) {
                    self.state.ctm = m.multiply(&self.state.ctm);
                }
            }

            // Fill colour
            "g" => {
                if let [gray] = nums.as_slice() {
                    self.state.fill = Rgb::gray(*gray);
                }
            }
            "rg" => {
                if let [r, g, b] = nums.as_slice() {
                    self.state.fill = Rgb::new(*r, *g, *b);
                }
            }
            "k" => {
                if let [c, m, y, k] = nums.as_slice() {
                    self.state.fill = Rgb::from_cmyk(*c, *m, *y, *k);
                }
            }
            "sc" | "scn" => match nums.as_slice() {
                [gray] => self.state.fill = Rgb::gray(*gray),
                [r, g, b] => self.state.fill = Rgb::new(*r, *g, *b),
                [c, m, y, k] => self.state.fill = Rgb::from_cmyk(*c, *m, *y, *k),
                _ => {}
            },
            "cs" => self.state.fill = Rgb::BLACK,

            // Path construction
            "m" => {
                if let [x, y] = nums.as_slice() {
                    let p = self.state.ctm.transform(*x, *y);
                    self.path.push(vec![p]);
                }
            }
            "l" => {
                if let [x, y] = nums.as_slice() {
                    self.line_to(*x, *y);
                }
            }
            "c" => {
                if let [_, _, _, _, x, y] = nums.as_slice() {
                    self.line_to(*x, *y);
                }
            }
            "v" | "y" => {
                if let [_, _, x, y] = nums.as_slice() {
                    self.line_to(*x, *y);
                }
            }
            "re" => {
                if let [x, y, w, h] = nums.as_slice() {
                    let ctm = self.state.ctm;
                    self.path.push(vec![
                        ctm.transform(*x, *y),
                        ctm.transform(x + w, *y),
                        ctm.transform(x + w, y + h),
                        ctm.transform(*x, y + h),
                    ]);
                }
            }
            "h" => {}

            // Path painting
            "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                let subpaths: Vec<_> = std::mem::take(&mut self.path)
                    .into_iter()
                    .filter(|sp| sp.len() >= 3)
                    .collect();
                if !subpaths.is_empty() {
                    self.events.push(PaintEvent::Fill {
                        subpaths,
                        color: self.state.fill,
                    });
                }
            }
            "S" | "s" | "n" => self.path.clear(),

            // Text objects and state
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                if let (Some(Object::Name(name)), Some(size)) =
                    (op.operands.first(), op.operands.get(1).and_then(number))
                {
                    self.state.font = Some(Rc::new(self.load_font(resources, name)));
                    self.state.font_size = size;
                }
            }
            "Tc" => {
                if let [v] = nums.as_slice() {
                    self.state.char_spacing = *v;
                }
            }
            "Tw" => {
                if let [v] = nums.as_slice() {
                    self.state.word_spacing = *v;
                }
            }
            "Tz" => {
                if let [v] = nums.as_slice() {
                    self.state.horizontal_scale = *v / 100.0;
                }
            }
            "TL" => {
                if let [v] = nums.as_slice() {
                    self.state.leading = *v;
                }
            }
            "Ts" => {
                if let [v] = nums.as_slice() {
                    self.state.rise = *v;
                }
            }

            // Text positioning
            "Td" => {
                if let [tx, ty] = nums.as_slice() {
                    self.move_line(*tx, *ty);
                }
            }
            "TD" => {
                if let [tx, ty] = nums.as_slice() {
                    self.state.leading = -ty;
                    self.move_line(*tx, *ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(&op.operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),

            // Text showing
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    let mut run = self.begin_run();
                    self.show(&mut run, bytes);
                    self.finish_run(run);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    self.show_array(items);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    let mut run = self.begin_run();
                    self.show(&mut run, bytes);
                    self.finish_run(run);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac), Some(Object::String(bytes, _))) = (
                    op.operands.first().and_then(number),
                    op.operands.get(1).and_then(number),
                    op.operands.get(2),
                ) {
                    self.state.word_spacing = aw;
                    self.state.char_spacing = ac;
                    self.next_line();
                    let mut run = self.begin_run();
                    self.show(&mut run, bytes);
                    self.finish_run(run);
                }
            }

            // External and inline objects
            "Do" => {
                if let Some(Object::Name(name)) = op.operands.first() {
                    self.paint_xobject(resources, name);
                }
            }
            "BI" | "EI" => self.push_image(),

            other => trace!(operator = other, "operator ignored"),
        }
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.state.ctm.transform(x, y);
        match self.path.last_mut() {
            Some(subpath) => subpath.push(p),
            None => self.path.push(vec![p]),
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).multiply(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.leading;
        self.move_line(0.0, -leading);
    }

    // -- Resources ------------------------------------------------------------

    fn resource_entry(
        &self,
        resources: Option<&'a Dictionary>,
        category: &[u8],
        name: &[u8],
    ) -> Option<&'a Object> {
        let source = self.source;
        let category = source.resolve(resources?.get(category).ok()?);
        let entry = category.as_dict().ok()?.get(name).ok()?;
        Some(entry)
    }

    fn load_font(&self, resources: Option<&'a Dictionary>, name: &[u8]) -> FontInfo<'a> {
        let source = self.source;
        match self
            .resource_entry(resources, b"Font", name)
            .and_then(|entry| source.resolve(entry).as_dict().ok())
        {
            Some(dict) => FontInfo::load(source, dict),
            None => {
                let name = String::from_utf8_lossy(name);
                debug!(font = %name, "font resource missing; using default metrics");
                FontInfo::unresolved(&name)
            }
        }
    }

    fn paint_xobject(&mut self, resources: Option<&'a Dictionary>, name: &[u8]) {
        let source = self.source;
        let Some(stream) = self
            .resource_entry(resources, b"XObject", name)
            .and_then(|entry| source.resolve(entry).as_stream().ok())
        else {
            return;
        };
        let subtype = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok());

        match subtype {
            Some(b"Image") => self.push_image(),
            Some(b"Form") => {
                if self.depth >= MAX_FORM_DEPTH {
                    debug!(depth = self.depth, "form nesting too deep; skipped");
                    return;
                }
                let content = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|r| source.resolve(r).as_dict().ok())
                    .or(resources);

                self.stack.push(self.state.clone());
                if let Some(m) = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|m| source.resolve(m).as_array().ok())
                    .and_then(|arr| Matrix::from_operands(arr))
                {
                    self.state.ctm = m.multiply(&self.state.ctm);
                }
                let saved_text = (self.text_matrix, self.line_matrix);
                self.depth += 1;
                if let Err(err) = self.run(&content, form_resources) {
                    debug!(%err, "form XObject content unreadable; skipped");
                }
                self.depth -= 1;
                (self.text_matrix, self.line_matrix) = saved_text;
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
            }
            _ => {}
        }
    }

    /// Images fill the unit square of the current CTM.
    fn push_image(&mut self) {
        let ctm = self.state.ctm;
        let corners = [
            ctm.transform(0.0, 0.0),
            ctm.transform(1.0, 0.0),
            ctm.transform(1.0, 1.0),
            ctm.transform(0.0, 1.0),
        ];
        let (mut x0, mut y0) = corners[0];
        let (mut x1, mut y1) = corners[0];
        for (x, y) in &corners[1..] {
            x0 = x0.min(*x);
            y0 = y0.min(*y);
            x1 = x1.max(*x);
            y1 = y1.max(*y);
        }
        self.events.push(PaintEvent::Image {
            bbox: (x0, y0, x1, y1),
        });
    }

    // -- Text showing ---------------------------------------------------------

    fn current_font(&self) -> Rc<FontInfo<'a>> {
        self.state
            .font
            .clone()
            .unwrap_or_else(|| Rc::new(FontInfo::unresolved("Helvetica")))
    }

    fn rendering_matrix(&self) -> Matrix {
        self.text_matrix.multiply(&self.state.ctm)
    }

    fn begin_run(&self) -> GlyphRun {
        let font = self.current_font();
        let trm = self.rendering_matrix();
        let scale = trm.vertical_scale();
        let font_size = self.state.font_size.abs() * scale;
        GlyphRun {
            text: String::new(),
            font_name: font.base_font.clone(),
            font_size,
            origin: trm.transform(0.0, self.state.rise),
            end: trm.transform(0.0, self.state.rise),
            ascent: font.ascent * font_size,
            descent: -font.descent * font_size,
            color: self.state.fill,
            chars: Vec::new(),
        }
    }

    fn finish_run(&mut self, mut run: GlyphRun) {
        run.end = self.rendering_matrix().transform(0.0, self.state.rise);
        if !run.text.is_empty() {
            self.events.push(PaintEvent::Text(run));
        }
    }

    /// Show one string, advancing the text matrix glyph by glyph.
    fn show(&mut self, run: &mut GlyphRun, bytes: &[u8]) {
        let font = self.current_font();
        let decoded: Vec<char> = font.decode(self.source.document(), bytes).chars().collect();
        let codes = font.codes(bytes);
        let state = &self.state;

        let mut positions = Vec::with_capacity(codes.len());
        for &code in &codes {
            let start = self.text_matrix.multiply(&state.ctm).transform(0.0, state.rise);
            let word = if !font.two_byte && code == 32 {
                state.word_spacing
            } else {
                0.0
            };
            let tx = (font.width(code) * state.font_size + state.char_spacing + word)
                * state.horizontal_scale;
            self.text_matrix = Matrix::translation(tx, 0.0).multiply(&self.text_matrix);
            let end = self.text_matrix.multiply(&state.ctm).transform(0.0, state.rise);
            positions.push((start, end));
        }

        if decoded.len() == positions.len() {
            for (ch, (start, end)) in decoded.iter().zip(&positions) {
                run.chars.push(PlacedChar {
                    ch: *ch,
                    x: start.0,
                    y: start.1,
                    advance: end.0 - start.0,
                });
            }
        } else if let (Some(first), Some(last)) = (positions.first(), positions.last()) {
            // Ligatures and multi-code glyphs: spread the decoded characters
            // evenly over the shown width.
            let (start, end) = (first.0, last.1);
            let n = decoded.len().max(1) as f32;
            let step = ((end.0 - start.0) / n, (end.1 - start.1) / n);
            for (i, ch) in decoded.iter().enumerate() {
                run.chars.push(PlacedChar {
                    ch: *ch,
                    x: start.0 + step.0 * i as f32,
                    y: start.1 + step.1 * i as f32,
                    advance: step.0,
                });
            }
        }
        run.text.extend(decoded);
    }

    fn show_array(&mut self, items: &[Object]) {
        let mut run = self.begin_run();
        for item in items {
            match item {
                Object::String(bytes, _) => self.show(&mut run, bytes),
                other => {
                    let Some(adjust) = number(other) else {
                        continue;
                    };
                    let tx = -adjust / 1000.0 * self.state.font_size * self.state.horizontal_scale;
                    let start = self.rendering_matrix().transform(0.0, self.state.rise);
                    self.text_matrix = Matrix::translation(tx, 0.0).multiply(&self.text_matrix);

                    if -adjust > TJ_SPACE_THRESHOLD
                        && !run.text.is_empty()
                        && !run.text.ends_with(' ')
                    {
                        let end = self.rendering_matrix().transform(0.0, self.state.rise);
                        run.text.push(' ');
                        run.chars.push(PlacedChar {
                            ch: ' ',
                            x: start.0,
                            y: start.1,
                            advance: end.0 - start.0,
                        });
                    }
                }
            }
        }
        self.finish_run(run);
    }
}
