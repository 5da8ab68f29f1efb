//! Interfaces to the two external collaborators of the frontend: the
//! grapheme-to-phoneme engine and the word-level language identifier.
//!
//! Both are black boxes that may block (FFI, subprocess or network).  Their
//! errors are `anyhow` errors and reach the caller unchanged.

use anyhow::Result;

use crate::segment::TaggedWord;

/// Punctuation the phonemizer must carry through to its output.
pub const PRESERVED_PUNCTUATION: &str = ";:,.!?¡¿—…\"«»\u{201C}\u{201D}~";

/// Marks that attach to the following word rather than the preceding one.
const OPENING_PUNCTUATION: &str = "¡¿«\u{201C}";

/// Grapheme-to-phoneme conversion.
///
/// Implementations must keep the marks of [`PRESERVED_PUNCTUATION`] in the
/// output (see [`phonemize_preserving_punctuation`]) and strip leading and
/// trailing whitespace.  `language` is an espeak voice code such as `"es"` or
/// `"en-us"`.
pub trait Phonemizer {
    fn phonemize(&self, text: &str, language: &str, with_stress: bool) -> Result<String>;
}

/// Word-level language identification.
///
/// Returns the words of `text` in order, possibly split into word pieces
/// marked with [`crate::segment::CONTINUATION_MARKER`].
pub trait LanguageIdentifier {
    fn identify(&self, text: &str) -> Result<Vec<TaggedWord>>;
}

impl<T: Phonemizer + ?Sized> Phonemizer for Box<T> {
    fn phonemize(&self, text: &str, language: &str, with_stress: bool) -> Result<String> {
        (**self).phonemize(text, language, with_stress)
    }
}

impl<T: LanguageIdentifier + ?Sized> LanguageIdentifier for Box<T> {
    fn identify(&self, text: &str) -> Result<Vec<TaggedWord>> {
        (**self).identify(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TextPart {
    Text(String),
    Punct(char),
}

fn split_text_parts(text: &str) -> Vec<TextPart> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if PRESERVED_PUNCTUATION.contains(ch) {
            flush_text_part(&mut parts, &mut current);
            parts.push(TextPart::Punct(ch));
        } else if ch.is_whitespace() {
            if !current.is_empty() && !current.ends_with(' ') {
                current.push(' ');
            }
        } else {
            current.push(ch);
        }
    }

    flush_text_part(&mut parts, &mut current);
    parts
}

fn flush_text_part(parts: &mut Vec<TextPart>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        parts.push(TextPart::Text(trimmed.to_string()));
    }
    current.clear();
}

/// Run a punctuation-dropping engine over the text between punctuation
/// marks and put the marks back.
///
/// Closing marks attach to the preceding word, opening marks (`¿ ¡ « “`) to
/// the following one.
pub fn phonemize_preserving_punctuation<F>(text: &str, mut phonemize_segment: F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut out = String::new();
    let mut glue_next = false;

    for part in split_text_parts(text) {
        match part {
            TextPart::Text(segment) => {
                let phones = phonemize_segment(&segment)?;
                let phones = phones.trim();
                if phones.is_empty() {
                    continue;
                }
                if !out.is_empty() && !glue_next {
                    out.push(' ');
                }
                out.push_str(phones);
                glue_next = false;
            }
            TextPart::Punct(mark) if OPENING_PUNCTUATION.contains(mark) => {
                if !out.is_empty() && !glue_next {
                    out.push(' ');
                }
                out.push(mark);
                glue_next = true;
            }
            TextPart::Punct(mark) => out.push(mark),
        }
    }

    Ok(out)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
