// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page preview rasteriser.
//
// Draws what the content interpreter reports onto an RGB canvas with
// `imageproc`: filled paths in their colour, images as grey boxes, and each
// shown glyph as a solid cell in its text colour. It is a legibility preview,
// not a faithful renderer, but colours are exact.

use farbwerk_core::error::{FarbwerkError, Result};
use image::{DynamicImage, ImageFormat, Rgb as Pixel, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use tracing::{debug, instrument};

use crate::pdf::content::{PaintEvent, interpret_page};
use crate::pdf::reader::{MediaBox, SourceDocument};

/// Page space has 72 units per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Default preview resolution.
pub const DEFAULT_DPI: u32 = 150;

/// Largest accepted preview edge, in pixels.
const MAX_EDGE_PX: u32 = 16_384;

const PAPER: Pixel<u8> = Pixel([255, 255, 255]);
const IMAGE_PLACEHOLDER: Pixel<u8> = Pixel([200, 200, 200]);

/// Rasterises single pages of a source document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewRenderer {
    /// Pixels per page-space unit.
    scale: f32,
}

impl Default for PreviewRenderer {
    fn default() -> Self {
        Self::from_dpi(DEFAULT_DPI)
    }
}

impl PreviewRenderer {
    pub fn new(scale: f32) -> Self {
        Self { scale }
    }

    pub fn from_dpi(dpi: u32) -> Self {
        Self::new(dpi as f32 / POINTS_PER_INCH)
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Render page `index`, or `None` if the document has no such page.
    #[instrument(skip(self, source), fields(scale = self.scale))]
    pub fn render(&self, source: &SourceDocument, index: usize) -> Result<Option<RgbImage>> {
        if index >= source.page_count() {
            return Ok(None);
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(FarbwerkError::Preview(format!(
                "invalid preview scale {}",
                self.scale
            )));
        }

        let content = interpret_page(source, index)
            .map_err(|err| FarbwerkError::Preview(err.to_string()))?;
        let media_box = content.media_box;
        let width = (media_box.width() * self.scale).ceil().max(1.0);
        let height = (media_box.height() * self.scale).ceil().max(1.0);
        if width > MAX_EDGE_PX as f32 || height > MAX_EDGE_PX as f32 {
            return Err(FarbwerkError::Preview(format!(
                "preview of {width}x{height} pixels is too large"
            )));
        }

        let mut canvas = Canvas {
            image: RgbImage::from_pixel(width as u32, height as u32, PAPER),
            media_box,
            scale: self.scale,
        };
        for event in &content.events {
            match event {
                PaintEvent::Fill { subpaths, color } => {
                    let pixel = Pixel(color.to_rgb8());
                    for subpath in subpaths {
                        canvas.fill_path(subpath, pixel);
                    }
                }
                PaintEvent::Image { bbox } => {
                    let (x0, y0, x1, y1) = *bbox;
                    canvas.fill_user_rect(x0, y0, x1, y1, IMAGE_PLACEHOLDER);
                }
                PaintEvent::Text(run) => {
                    let pixel = Pixel(run.color.to_rgb8());
                    let cell_height = run.font_size * 0.5;
                    for glyph in run.chars.iter().filter(|g| !g.ch.is_whitespace()) {
                        canvas.fill_user_rect(
                            glyph.x,
                            glyph.y,
                            glyph.x + glyph.advance * 0.8,
                            glyph.y + cell_height,
                            pixel,
                        );
                    }
                }
            }
        }

        debug!(page = index, width, height, "preview rendered");
        Ok(Some(canvas.image))
    }

    /// Render page `index` and encode it as PNG.
    pub fn render_png(&self, source: &SourceDocument, index: usize) -> Result<Option<Vec<u8>>> {
        match self.render(source, index)? {
            Some(image) => encode_png(image).map(Some),
            None => Ok(None),
        }
    }
}

fn encode_png(image: RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    DynamicImage::ImageRgb8(image)
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| FarbwerkError::Preview(format!("PNG encoding failed: {err}")))?;
    Ok(buffer)
}

struct Canvas {
    image: RgbImage,
    media_box: MediaBox,
    scale: f32,
}

impl Canvas {
    fn to_pixel(&self, x: f32, y: f32) -> (f32, f32) {
        let (px, py) = self.media_box.to_page_space(x, y);
        (px * self.scale, py * self.scale)
    }

    /// Fill the axis-aligned box spanned by two user-space corners.
    fn fill_user_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, pixel: Pixel<u8>) {
        let (ax, ay) = self.to_pixel(x0, y0);
        let (bx, by) = self.to_pixel(x1, y1);
        self.fill_pixel_rect(ax.min(bx), ay.min(by), ax.max(bx), ay.max(by), pixel);
    }

    fn fill_pixel_rect(&mut self, left: f32, top: f32, right: f32, bottom: f32, pixel: Pixel<u8>) {
        // Clamp to the image first; fills may extend far past the page.
        let (w, h) = (self.image.width() as f32, self.image.height() as f32);
        let left = left.floor().clamp(0.0, w);
        let top = top.floor().clamp(0.0, h);
        let right = right.ceil().clamp(0.0, w);
        let bottom = bottom.ceil().clamp(0.0, h);
        if left >= w || top >= h || right <= 0.0 || bottom <= 0.0 {
            return;
        }
        let width = ((right - left) as u32).max(1);
        let height = ((bottom - top) as u32).max(1);
        draw_filled_rect_mut(
            &mut self.image,
            Rect::at(left as i32, top as i32).of_size(width, height),
            pixel,
        );
    }

    fn fill_path(&mut self, subpath: &[(f32, f32)], pixel: Pixel<u8>) {
        let points: Vec<(f32, f32)> = subpath.iter().map(|&(x, y)| self.to_pixel(x, y)).collect();

        if let Some((left, top, right, bottom)) = axis_aligned_box(&points) {
            self.fill_pixel_rect(left, top, right, bottom, pixel);
            return;
        }

        let mut polygon: Vec<Point<i32>> = Vec::with_capacity(points.len());
        for (x, y) in points {
            let p = Point::new(x.round() as i32, y.round() as i32);
            if polygon.last() != Some(&p) {
                polygon.push(p);
            }
        }
        while polygon.len() > 1 && polygon.first() == polygon.last() {
            polygon.pop();
        }
        if polygon.len() >= 3 {
            draw_polygon_mut(&mut self.image, &polygon, pixel);
        }
    }
}

/// `(left, top, right, bottom)` if the polygon is an axis-aligned rectangle.
fn axis_aligned_box(points: &[(f32, f32)]) -> Option<(f32, f32, f32, f32)> {
    let mut corners = points.to_vec();
    if corners.len() == 5 && corners.first() == corners.last() {
        corners.pop();
    }
    if corners.len() != 4 {
        return None;
    }
    let xs = |i: usize| corners[i].0;
    let ys = |i: usize| corners[i].1;
    let horizontal_first = ys(0) == ys(1) && xs(1) == xs(2) && ys(2) == ys(3) && xs(3) == xs(0);
    let vertical_first = xs(0) == xs(1) && ys(1) == ys(2) && xs(2) == xs(3) && ys(3) == ys(0);
    if !(horizontal_first || vertical_first) {
        return None;
    }
    let left = corners.iter().map(|c| c.0).fold(f32::INFINITY, f32::min);
    let right = corners.iter().map(|c| c.0).fold(f32::NEG_INFINITY, f32::max);
    let top = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min);
    let bottom = corners.iter().map(|c| c.1).fold(f32::NEG_INFINITY, f32::max);
    Some((left, top, right, bottom))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{DocumentConverter, NoopObserver};
    use crate::pdf::fixtures::{FixturePage, build_pdf};
    use farbwerk_core::schemes::{all, get_scheme};

    fn source(pages: &[FixturePage]) -> SourceDocument {
        SourceDocument::from_bytes(&build_pdf(pages)).unwrap()
    }

    #[test]
    fn dimensions_follow_dpi() {
        let doc = source(&[FixturePage::blank(72.0, 144.0)]);
        let image = PreviewRenderer::from_dpi(150).render(&doc, 0).unwrap().unwrap();
        assert_eq!(image.dimensions(), (150, 300));
        assert_eq!(*image.get_pixel(10, 10), PAPER);
    }

    #[test]
    fn out_of_range_page_is_none() {
        let doc = source(&[FixturePage::blank(100.0, 100.0)]);
        let renderer = PreviewRenderer::default();
        assert!(renderer.render(&doc, 1).unwrap().is_none());
        assert!(renderer.render_png(&doc, 5).unwrap().is_none());
    }

    #[test]
    fn png_bytes_have_signature() {
        let doc = source(&[FixturePage::blank(100.0, 100.0)]);
        let png = PreviewRenderer::default().render_png(&doc, 0).unwrap().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn huge_fills_are_clipped_to_the_page() {
        let doc = source(&[FixturePage::with_content(
            100.0,
            100.0,
            "0 0 1 rg -3000000000 -3000000000 6000000000 6000000000 re f",
        )]);
        let image = PreviewRenderer::new(1.0).render(&doc, 0).unwrap().unwrap();
        assert_eq!(*image.get_pixel(0, 0), Pixel([0, 0, 255]));
        assert_eq!(*image.get_pixel(99, 99), Pixel([0, 0, 255]));
    }

    #[test]
    fn fills_off_the_page_draw_nothing() {
        let doc = source(&[FixturePage::with_content(
            100.0,
            100.0,
            "0 0 1 rg 500 500 50 50 re f",
        )]);
        let image = PreviewRenderer::new(1.0).render(&doc, 0).unwrap().unwrap();
        assert!(image.pixels().all(|p| *p == PAPER));
    }

    #[test]
    fn filled_rect_and_glyphs_use_their_colours() {
        let doc = source(&[FixturePage::with_content(
            100.0,
            100.0,
            "0 0 1 rg 0 50 100 50 re f 1 0 0 rg BT /F2 20 Tf 10 10 Td (HH) Tj ET",
        )]);
        let image = PreviewRenderer::new(1.0).render(&doc, 0).unwrap().unwrap();
        // Top half blue.
        assert_eq!(*image.get_pixel(50, 25), Pixel([0, 0, 255]));
        // Bottom half paper, except the red glyph cells above the baseline.
        assert_eq!(*image.get_pixel(90, 75), PAPER);
        assert_eq!(*image.get_pixel(12, 86), Pixel([255, 0, 0]));
    }

    #[test]
    fn image_is_drawn_as_placeholder() {
        let doc = source(&[FixturePage::image_only(200.0, 200.0)]);
        let image = PreviewRenderer::new(1.0).render(&doc, 0).unwrap().unwrap();
        assert_eq!(*image.get_pixel(100, 100), IMAGE_PLACEHOLDER);
        assert_eq!(*image.get_pixel(10, 10), PAPER);
    }

    #[test]
    fn converted_background_matches_scheme_on_every_page() {
        let doc = source(&[
            FixturePage::with_content(200.0, 200.0, "BT /F1 12 Tf 20 100 Td (Text) Tj ET"),
            FixturePage::image_only(200.0, 200.0),
        ]);
        let converter = DocumentConverter::default();
        let renderer = PreviewRenderer::new(1.0);
        for scheme in all() {
            let rendered = converter.render(&doc, scheme, &NoopObserver).unwrap();
            let output = SourceDocument::from_bytes(&rendered.bytes).unwrap();
            for page in 0..2 {
                let image = renderer.render(&output, page).unwrap().unwrap();
                assert_eq!(
                    image.get_pixel(195, 195).0,
                    scheme.background.to_rgb8(),
                    "{} page {page}",
                    scheme.id
                );
            }
        }
    }

    #[test]
    fn converted_glyphs_use_scheme_text_colour() {
        // Baseline at page-space y = 100 after conversion.
        let doc = source(&[FixturePage::with_content(
            200.0,
            200.0,
            "BT /F1 20 Tf 20 116 Td (MMMM) Tj ET",
        )]);
        let converter = DocumentConverter::default();
        let renderer = PreviewRenderer::new(1.0);
        for (id, expected) in [("Dark Mode", [255, 255, 255]), ("Sepia", [0, 0, 0])] {
            let scheme = get_scheme(id).unwrap();
            let rendered = converter.render(&doc, scheme, &NoopObserver).unwrap();
            let output = SourceDocument::from_bytes(&rendered.bytes).unwrap();
            let image = renderer.render(&output, 0).unwrap().unwrap();
            // Anchor is the span's top-left: baseline 84 minus 0.8 em ascent.
            assert_eq!(image.get_pixel(22, 66).0, expected, "{id}");
        }
    }

    #[test]
    fn axis_aligned_detection() {
        let rect = [(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)];
        assert_eq!(axis_aligned_box(&rect), Some((0.0, 0.0, 10.0, 5.0)));
        let skew = [(0.0, 0.0), (10.0, 1.0), (10.0, 5.0), (0.0, 5.0)];
        assert_eq!(axis_aligned_box(&skew), None);
    }
}
