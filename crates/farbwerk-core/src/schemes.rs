// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Colour scheme registry: the fixed set of background/text pairings offered
// for recolouring. Built once on first use, never mutated.

use std::sync::LazyLock;

use serde::Serialize;

use crate::error::{FarbwerkError, Result};
use crate::types::Rgb;

/// Identifier of the one scheme that keeps its own (light) text colour.
pub const DARK_MODE: &str = "Dark Mode";

/// A named background/text colour pairing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorScheme {
    /// Registry key.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    pub description: &'static str,
    pub background_hex: &'static str,
    pub text_hex: &'static str,
    pub background: Rgb,
    pub text: Rgb,
    /// Informational only; not enforced anywhere.
    pub contrast_ratio: f32,
}

impl ColorScheme {
    fn new(
        id: &'static str,
        name: &'static str,
        description: &'static str,
        background_hex: &'static str,
        text_hex: &'static str,
        contrast_ratio: f32,
    ) -> Self {
        Self {
            id,
            name,
            description,
            background_hex,
            text_hex,
            background: Rgb::from_hex(background_hex).unwrap_or(Rgb::WHITE),
            text: Rgb::from_hex(text_hex).unwrap_or(Rgb::BLACK),
            contrast_ratio,
        }
    }

    /// Colour used for re-rendered text.
    ///
    /// Only "Dark Mode" uses its light text colour; every other scheme gets
    /// pure black, whatever its background.
    // TODO: a dark background registered under another id would get black
    // text; switch to a luminance test once callers stop relying on the id rule.
    pub fn output_text_color(&self) -> Rgb {
        if self.id == DARK_MODE {
            self.text
        } else {
            Rgb::BLACK
        }
    }
}

static REGISTRY: LazyLock<Vec<ColorScheme>> = LazyLock::new(|| {
    vec![
        ColorScheme::new(
            DARK_MODE,
            "Dark Mode",
            "Dark background for low light reading",
            "#2D2D2D",
            "#FFFFFF",
            13.4,
        ),
        ColorScheme::new(
            "Sepia",
            "Sepia Reading",
            "Warm brown/beige background - easy on the eyes",
            "#DEB887",
            "#8B4513",
            8.2,
        ),
        ColorScheme::new(
            "High Contrast",
            "High Contrast",
            "Black text on white background - maximum readability",
            "#FFFFFF",
            "#000000",
            21.0,
        ),
        ColorScheme::new(
            "Green Tint",
            "Green Tint",
            "Light green background - gentle on the eyes",
            "#E6F3E6",
            "#2D5A2D",
            9.1,
        ),
    ]
});

/// Every registered scheme, in registry order.
pub fn all() -> &'static [ColorScheme] {
    REGISTRY.as_slice()
}

/// Registered identifiers, in registry order.
pub fn scheme_ids() -> Vec<&'static str> {
    REGISTRY.iter().map(|s| s.id).collect()
}

/// Look up a scheme by identifier.
pub fn get_scheme(id: &str) -> Option<&'static ColorScheme> {
    REGISTRY.iter().find(|s| s.id == id)
}

/// Like [`get_scheme`], but an unknown id is an error.
pub fn require_scheme(id: &str) -> Result<&'static ColorScheme> {
    get_scheme(id).ok_or_else(|| FarbwerkError::UnknownScheme(id.to_owned()))
}
