//! Cross-language phone mapping.
//!
//! When a code-switched chunk is phonemised with the secondary language's
//! ruleset (English inside Spanish text), espeak emits symbols the Spanish
//! synthesizer never saw in training.  The rules below fold them into the
//! Spanish inventory.
//!
//! Rules run in a fixed order and later rules see the output of earlier ones:
//! diphthongs are split before the plain vowels are folded, and the schwa
//! rule looks behind at the original near/square/cure vowels before those are
//! rewritten.

use fancy_regex::Regex;
use once_cell::sync::Lazy;

use crate::error::{FrontendError, Result};

/// English (espeak `en-us`) → Spanish (espeak `es`) rewrite table.
const ENGLISH_TO_SPANISH: &[(&str, &str)] = &[
    // diphthongs
    ("eɪ", "ei"),
    ("aɪ", "ai"),
    ("ɔɪ", "oi"),
    ("aʊ", "au"),
    ("oʊ", "ou"),
    ("əʊ", "ou"),
    // rhotic vowels
    ("ɚ", "eɾ"),
    ("ɝ", "eɾ"),
    ("ɜ", "e"),
    // affricates
    ("t͡ʃ", "tʃ"),
    ("ʧ", "tʃ"),
    ("d͡ʒ", "ʝ"),
    ("dʒ", "ʝ"),
    ("ʤ", "ʝ"),
    // schwa, except as the off-glide of a centering diphthong
    ("(?<![ɪɛʊ])ə", "e"),
    ("ɪə", "ia"),
    ("ɛə", "ea"),
    ("ʊə", "ua"),
    // plain vowels
    ("[æɑʌɐ]", "a"),
    ("[ɒɔ]", "o"),
    ("ɛ", "e"),
    ("[ɪᵻ]", "i"),
    ("ʊ", "u"),
    // consonants
    ("v", "b"),
    ("z", "s"),
    ("ʒ", "ʝ"),
    ("(?<!t)ʃ", "tʃ"),
    ("h", "x"),
    ("ɹ", "ɾ"),
    ("ɫ", "l"),
    ("[ʔʰ]", ""),
];

static ENGLISH_TO_SPANISH_RULES: Lazy<PhoneticSubstitution> = Lazy::new(|| {
    PhoneticSubstitution::from_rules(ENGLISH_TO_SPANISH)
        .expect("built-in substitution rules compile")
});

/// One rewrite: every match of `pattern` becomes `replacement`.
#[derive(Debug, Clone)]
struct Rule {
    pattern: Regex,
    replacement: String,
}

/// An ordered list of phone rewrite rules.
#[derive(Debug, Clone)]
pub struct PhoneticSubstitution {
    rules: Vec<Rule>,
}

impl PhoneticSubstitution {
    /// The built-in English → Spanish table.
    pub fn english_to_spanish() -> &'static PhoneticSubstitution {
        &ENGLISH_TO_SPANISH_RULES
    }

    /// A substitution that leaves every string unchanged.
    pub fn identity() -> Self {
        Self { rules: Vec::new() }
    }

    /// Compile `(pattern, replacement)` pairs, applied in the given order.
    ///
    /// Patterns use `fancy-regex` syntax, so look-behind conditions such as
    /// `(?<![ei])ə` are allowed.
    pub fn from_rules<P, R>(rules: &[(P, R)]) -> Result<Self>
    where
        P: AsRef<str>,
        R: AsRef<str>,
    {
        let rules = rules
            .iter()
            .map(|(pattern, replacement)| {
                let pattern = pattern.as_ref();
                Regex::new(pattern)
                    .map(|re| Rule { pattern: re, replacement: replacement.as_ref().to_string() })
                    .map_err(|e| FrontendError::InvalidRule {
                        pattern: pattern.to_string(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule in order.  Unmatched input passes through unchanged.
    pub fn normalize(&self, phones: &str) -> String {
        self.rules.iter().fold(phones.to_string(), |text, rule| {
            rule.pattern
                .replace_all(&text, rule.replacement.as_str())
                .into_owned()
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
