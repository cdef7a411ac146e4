// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: colours, page geometry, extracted text layout, and
// conversion job bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An RGB colour with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Quantise to 8-bit channels, as a rasteriser would.
    pub fn to_rgb8(self) -> [u8; 3] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }

    /// Convert a device CMYK colour (naive, no profile).
    pub fn from_cmyk(c: f32, m: f32, y: f32, k: f32) -> Self {
        Self::new(
            (1.0 - c) * (1.0 - k),
            (1.0 - m) * (1.0 - k),
            (1.0 - y) * (1.0 - k),
        )
    }

    pub fn gray(level: f32) -> Self {
        Self::new(level, level, level)
    }
}

/// Page dimensions in page-space units (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned bounding box in page space, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Top-left corner, the anchor used when re-inserting text.
    pub fn origin(&self) -> (f32, f32) {
        (self.x0, self.y0)
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }
}

/// A run of text sharing one font size, with its own bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub text: String,
    pub bbox: BBox,
    pub font_size: f32,
}

impl TextSpan {
    pub fn new(text: impl Into<String>, bbox: BBox, font_size: f32) -> Self {
        Self {
            text: text.into(),
            bbox,
            font_size,
        }
    }

    /// Empty and whitespace-only spans carry nothing worth redrawing.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One visual line: spans in reading order as reported by extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
}

impl TextLine {
    pub fn new(spans: Vec<TextSpan>) -> Self {
        Self { spans }
    }

    /// Concatenated raw text of every span.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn bbox(&self) -> Option<BBox> {
        let mut iter = self.spans.iter().map(|s| s.bbox);
        let first = iter.next()?;
        Some(iter.fold(first, |acc, b| acc.union(&b)))
    }
}

/// A layout region: either text lines or something with no extractable text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Text { lines: Vec<TextLine> },
    /// Image or other opaque content. Skipped when recolouring.
    Opaque { bbox: BBox },
}

impl Block {
    pub fn is_text(&self) -> bool {
        matches!(self, Block::Text { .. })
    }
}

/// The full extracted layout of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub size: PageSize,
    pub blocks: Vec<Block>,
}

impl PageLayout {
    pub fn new(size: PageSize, blocks: Vec<Block>) -> Self {
        Self { size, blocks }
    }

    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.blocks.iter().flat_map(|block| match block {
            Block::Text { lines } => lines.as_slice(),
            Block::Opaque { .. } => &[],
        })
    }

    /// Plain text of the page, one line per [`TextLine`].
    pub fn text(&self) -> String {
        self.lines()
            .map(TextLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Summary of a finished conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    pub scheme_id: String,
    pub pages: usize,
    /// Lines drawn as a single run.
    pub lines_drawn: usize,
    /// Lines that fell back to span-by-span insertion.
    pub lines_fallen_back: usize,
    /// Spans dropped because even individual insertion failed.
    pub spans_skipped: usize,
    /// SHA-256 of the written output, lowercase hex.
    pub output_sha256: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ConversionReport {
    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
