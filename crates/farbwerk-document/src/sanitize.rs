// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Character substitution for re-rendered text.
//
// The output font path draws a handful of code points as placeholder
// "flying dots". This table maps exactly those to ASCII stand-ins and is not
// a transliteration scheme: characters such as ç, ü, ö, Ç, Ü, Ö render fine
// and must pass through untouched.

/// Code points replaced before text is drawn, with their replacements.
pub const SUBSTITUTIONS: [(char, char); 9] = [
    ('\u{0131}', 'i'),        // ı dotless i
    ('\u{0130}', 'I'),        // İ capital I with dot
    ('\u{011F}', 'g'),        // ğ
    ('\u{011E}', 'G'),        // Ğ
    ('\u{015F}', 's'),        // ş
    ('\u{015E}', 'S'),        // Ş
    ('\u{2013}', '-'),        // en dash
    ('\u{2022}', '\u{2022}'), // bullet renders correctly; kept as-is
    ('\u{2019}', '\''),       // right single quotation mark
];

/// Replacement for a single code point.
#[inline]
pub fn substitute(ch: char) -> char {
    SUBSTITUTIONS
        .iter()
        .find(|(from, _)| *from == ch)
        .map_or(ch, |(_, to)| *to)
}

/// Apply [`SUBSTITUTIONS`] to `text`. Everything else passes through.
pub fn sanitize(text: &str) -> String {
    text.chars().map(substitute).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turkish_letters_are_replaced() {
        assert_eq!(sanitize("Merhaba İstanbul"), "Merhaba Istanbul");
        assert_eq!(sanitize("ığĞşŞ"), "igGsS");
    }

    #[test]
    fn punctuation_is_replaced() {
        assert_eq!(sanitize("1990\u{2013}2000"), "1990-2000");
        assert_eq!(sanitize("it\u{2019}s"), "it's");
    }

    #[test]
    fn bullet_is_kept() {
        assert_eq!(sanitize("\u{2022} item"), "\u{2022} item");
    }

    #[test]
    fn every_mapped_code_point_is_gone() {
        let input: String = SUBSTITUTIONS.iter().map(|(from, _)| *from).collect();
        let output = sanitize(&input);
        let expected: String = SUBSTITUTIONS.iter().map(|(_, to)| *to).collect();
        assert_eq!(output, expected);
        for (from, to) in SUBSTITUTIONS {
            if from != to {
                assert!(!output.contains(from), "{from:?} survived");
            }
        }
    }

    #[test]
    fn unmapped_text_is_byte_identical() {
        let input = "çüöÇÜÖ éà — “quotes” ‘left’ 日本語 \u{00A0}tab\t";
        assert_eq!(sanitize(input).as_bytes(), input.as_bytes());
    }

    #[test]
    fn idempotent() {
        let input = "İğ\u{2013}ş\u{2019}\u{2022} çö plain";
        let once = sanitize(input);
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn no_case_folding() {
        assert_eq!(sanitize("ABC abc"), "ABC abc");
    }
}
