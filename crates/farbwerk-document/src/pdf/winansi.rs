// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// WinAnsiEncoding (cp1252): the single-byte encoding of the builtin PDF
// fonts used for output text. A character outside it cannot be drawn.

use crate::error::RenderError;

/// WinAnsi byte for `ch`, if the encoding has one.
pub fn encode_char(ch: char) -> Option<u8> {
    let byte = match ch {
        '\u{0000}'..='\u{007F}' => ch as u8,
        '\u{00A0}'..='\u{00FF}' => ch as u8,
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

/// Encode `text`, or fail on the first unrepresentable character.
pub fn encode(text: &str) -> Result<Vec<u8>, RenderError> {
    text.chars()
        .map(|ch| encode_char(ch).ok_or(RenderError::Unencodable { ch }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_and_cp1252_extras() {
        assert_eq!(encode("Aé").unwrap(), vec![b'A', 0xE9]);
        assert_eq!(encode_char('\u{2022}'), Some(0x95));
        assert_eq!(encode_char('\u{20AC}'), Some(0x80));
        assert_eq!(encode_char('ç'), Some(0xE7));
    }

    #[test]
    fn turkish_specials_are_not_encodable() {
        for ch in ['ğ', 'Ğ', 'ş', 'Ş', 'ı', 'İ'] {
            assert_eq!(encode_char(ch), None, "{ch}");
        }
        assert_eq!(
            encode("Merhaba İstanbul"),
            Err(RenderError::Unencodable { ch: 'İ' })
        );
    }

    #[test]
    fn c1_controls_are_not_encodable() {
        assert_eq!(encode_char('\u{0081}'), None);
    }
}
