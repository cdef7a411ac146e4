// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font metrics and string decoding for content-stream text.
//
// Only what layout needs: how wide each code is, how far the font reaches
// above and below the baseline, and how shown bytes map to Unicode (through
// lopdf's encoding support, with a plain fallback).

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object};

use crate::pdf::reader::{SourceDocument, number};

/// Ascent used when a font has no usable descriptor (fraction of the em).
const DEFAULT_ASCENT: f32 = 0.8;
/// Descent used when a font has no usable descriptor (negative, em fraction).
const DEFAULT_DESCENT: f32 = -0.2;
/// Composite fonts show two-byte codes, so no CID in a /W array exceeds this.
const MAX_CID: u32 = 0xFFFF;

/// Metrics and decoding information for one font resource.
#[derive(Debug, Clone)]
pub struct FontInfo<'a> {
    /// The font dictionary, when the resource could be resolved.
    dict: Option<&'a Dictionary>,
    /// /BaseFont, or the resource name when absent.
    pub base_font: String,
    /// Composite (Type0) fonts show two-byte codes.
    pub two_byte: bool,
    first_char: u32,
    /// Simple-font widths in glyph units (1/1000 em), from /FirstChar.
    widths: Vec<f32>,
    /// Composite-font widths keyed by CID, from /W.
    cid_widths: HashMap<u32, f32>,
    /// Width for codes not covered above, glyph units.
    default_width: f32,
    /// Above the baseline, em fraction.
    pub ascent: f32,
    /// Below the baseline, em fraction (negative).
    pub descent: f32,
}

impl<'a> FontInfo<'a> {
    /// Build metrics from a font dictionary.
    pub fn load(source: &'a SourceDocument, dict: &'a Dictionary) -> Self {
        let base_font = dict
            .get(b"BaseFont")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_else(|| "Unknown".to_string());
        let two_byte = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|n| n == b"Type0");

        let mut info = Self::unresolved(&base_font);
        info.dict = Some(dict);
        info.two_byte = two_byte;

        let descriptor_host = if two_byte {
            descendant_font(source, dict)
        } else {
            Some(dict)
        };

        if two_byte {
            if let Some(descendant) = descriptor_host {
                info.default_width = descendant
                    .get(b"DW")
                    .ok()
                    .and_then(number)
                    .unwrap_or(1000.0);
                if let Ok(w) = descendant.get(b"W") {
                    info.cid_widths = parse_cid_widths(source, source.resolve(w));
                }
            }
        } else {
            info.first_char = dict
                .get(b"FirstChar")
                .ok()
                .and_then(number)
                .map(|n| n.max(0.0) as u32)
                .unwrap_or(0);
            if let Ok(widths) = dict.get(b"Widths") {
                if let Ok(arr) = source.resolve(widths).as_array() {
                    info.widths = arr.iter().map(|w| number(source.resolve(w)).unwrap_or(0.0)).collect();
                }
            }
        }

        if let Some(descriptor) = descriptor_host
            .and_then(|host| host.get(b"FontDescriptor").ok())
            .and_then(|d| source.resolve(d).as_dict().ok())
        {
            if let Some(missing) = descriptor.get(b"MissingWidth").ok().and_then(number) {
                if !two_byte && missing > 0.0 {
                    info.default_width = missing;
                }
            }
            let ascent = descriptor.get(b"Ascent").ok().and_then(number);
            let descent = descriptor.get(b"Descent").ok().and_then(number);
            if let (Some(a), Some(d)) = (ascent, descent) {
                if a > 0.0 && d <= 0.0 && a - d > 0.0 {
                    info.ascent = a / 1000.0;
                    info.descent = d / 1000.0;
                }
            }
        }

        info
    }

    /// Placeholder metrics for a font resource that could not be found.
    pub fn unresolved(name: &str) -> Self {
        // Monospaced standard fonts are 600 units wide; everything else gets
        // a rough proportional average.
        let default_width = if name.contains("Courier") { 600.0 } else { 500.0 };
        Self {
            dict: None,
            base_font: name.to_string(),
            two_byte: false,
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            default_width,
            ascent: DEFAULT_ASCENT,
            descent: DEFAULT_DESCENT,
        }
    }

    /// Split shown bytes into character codes.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| match c {
                    [hi, lo] => u32::from(*hi) << 8 | u32::from(*lo),
                    [single] => u32::from(*single),
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|&b| u32::from(b)).collect()
        }
    }

    /// Horizontal advance of `code`, as a fraction of the em.
    pub fn width(&self, code: u32) -> f32 {
        let units = if self.two_byte {
            self.cid_widths.get(&code).copied()
        } else {
            code.checked_sub(self.first_char)
                .and_then(|i| self.widths.get(i as usize))
                .copied()
                .filter(|w| *w > 0.0)
        };
        units.unwrap_or(self.default_width) / 1000.0
    }

    /// Decode shown bytes to Unicode.
    pub fn decode(&self, document: &Document, bytes: &[u8]) -> String {
        if let Some(dict) = self.dict {
            if let Ok(encoding) = dict.get_font_encoding(document) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return text;
                }
            }
        }
        decode_text_simple(bytes)
    }
}

fn descendant_font<'a>(source: &'a SourceDocument, dict: &'a Dictionary) -> Option<&'a Dictionary> {
    let descendants = source.resolve(dict.get(b"DescendantFonts").ok()?);
    let first = descendants.as_array().ok()?.first()?;
    source.resolve(first).as_dict().ok()
}

/// Parse a CIDFont /W array: `c [w1 w2 ...]` and `cfirst clast w` forms.
fn parse_cid_widths(source: &SourceDocument, w: &Object) -> HashMap<u32, f32> {
    let mut widths = HashMap::new();
    let Ok(items) = w.as_array() else {
        return widths;
    };
    let mut i = 0;
    while i < items.len() {
        let Some(first) = number(source.resolve(&items[i])) else {
            break;
        };
        let first = first.max(0.0) as u32;
        match items.get(i + 1).map(|o| source.resolve(o)) {
            Some(Object::Array(list)) => {
                for (offset, value) in list.iter().enumerate() {
                    let Some(cid) = u32::try_from(offset)
                        .ok()
                        .and_then(|offset| first.checked_add(offset))
                        .filter(|&cid| cid <= MAX_CID)
                    else {
                        break;
                    };
                    if let Some(width) = number(source.resolve(value)) {
                        widths.insert(cid, width);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let (Some(last), Some(width)) = (
                    number(last),
                    items.get(i + 2).and_then(|o| number(source.resolve(o))),
                ) else {
                    break;
                };
                let last = (last.max(0.0) as u32).min(MAX_CID);
                for cid in first..=last {
                    widths.insert(cid, width);
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}

/// Decoding used when a font has no usable encoding: UTF-16BE with BOM,
/// then UTF-8, then Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let [0xFE, 0xFF, rest @ ..] = bytes {
        let utf16: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}
