//! Canonicalisation of raw OCR text.
//!
//! OCR output is full of stray glyphs: misread box-drawing characters,
//! pipes from letter edges, dots from compression noise. [`normalize`]
//! strips everything except word characters, whitespace and basic
//! punctuation so that two passes over the same caption compare equal.

use std::sync::LazyLock;

use regex::Regex;

static NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\w\s.,!?'-]").expect("noise pattern is a valid regex")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is a valid regex"));

/// Canonicalise raw OCR output.
///
/// Every character outside word characters, whitespace and `. , ! ? ' -`
/// becomes a space, whitespace runs collapse to a single space, and the
/// result is trimmed. May return an empty string.
///
/// # Example
///
/// ```
/// assert_eq!(burnsub::normalize("  |Hello,\n  world!~ "), "Hello, world!");
/// ```
pub fn normalize(raw: &str) -> String {
    let cleaned = NOISE.replace_all(raw, " ");
    WHITESPACE_RUN
        .replace_all(&cleaned, " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_characters_become_spaces() {
        assert_eq!(normalize("HEL|LO"), "HEL LO");
        assert_eq!(normalize("«Bonjour»"), "Bonjour");
        assert_eq!(normalize("a@b#c$d"), "a b c d");
    }

    #[test]
    fn allowed_punctuation_survives() {
        let text = "Don't stop - now, please! Why? Yes.";
        assert_eq!(normalize(text), text);
    }

    #[test]
    fn whitespace_is_collapsed_and_trimmed() {
        assert_eq!(normalize("\n\t first   line \r\n second\t"), "first line second");
    }

    #[test]
    fn unicode_word_characters_are_kept() {
        assert_eq!(normalize("Ça va, Jürgen?"), "Ça va, Jürgen?");
        assert_eq!(normalize("こんにちは"), "こんにちは");
    }

    #[test]
    fn pure_noise_normalizes_to_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" ~|~ *** "), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "",
            "  HELLO  ",
            "|| weird ~~ text ##",
            "multi\nline\n\ncaption",
            "émigré — naïve…",
            "_under_score_ 42",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }
}
