//! Language segmentation for code-switched utterances.
//!
//! The external language identifier tags every word (or word piece) of an
//! utterance.  [`LanguageSegmenter`] turns that tag sequence into
//! [`Chunk`]s, contiguous runs of words that are phonemised with one ruleset:
//!
//! 1. word pieces and possessive/contraction fragments are glued back onto
//!    the preceding word and inherit its language,
//! 2. raw tags are resolved to the two working languages,
//! 3. consecutive words with the same language are merged,
//! 4. short secondary-language chunks that do not look foreign are handed
//!    back to the primary language, and neighbours are merged again.
//!
//! The heuristics of step 4 are data ([`SegmenterLexicon`]), not code.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{FrontendError, Result};

/// Prefix the identifier puts on word pieces that continue the previous word.
pub const CONTINUATION_MARKER: &str = "##";

/// Bare letter the identifier splits off English possessives ("Post" "s").
const POSSESSIVE_FRAGMENT: &str = "s";

const SPANISH_ENGLISH_LEXICON: &str = include_str!("../assets/es_en_lexicon.json");

static SPANISH_ENGLISH: Lazy<Arc<SegmenterLexicon>> = Lazy::new(|| {
    Arc::new(
        SegmenterLexicon::from_json(SPANISH_ENGLISH_LEXICON)
            .expect("bundled Spanish/English lexicon is valid"),
    )
});

// ─────────────────────────────────────────────────────────────────────────────
// Tags and chunks
// ─────────────────────────────────────────────────────────────────────────────

/// Working language of a word or chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    Primary,
    Secondary,
}

/// Closed set of tags the identifier can emit, after label lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTag {
    Primary,
    Secondary,
    NamedEntity,
    Ambiguous,
    Other,
    None,
}

/// A word or word piece with the identifier's raw label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedWord {
    pub word: String,
    pub tag: String,
}

impl TaggedWord {
    pub fn new(word: impl Into<String>, tag: impl Into<String>) -> Self {
        Self { word: word.into(), tag: tag.into() }
    }

    fn is_fragment(&self) -> bool {
        self.word.starts_with(CONTINUATION_MARKER)
            || self.word.starts_with(['\'', '\u{2019}'])
            || self.word == POSSESSIVE_FRAGMENT
    }

    fn surface(&self) -> &str {
        self.word.trim_start_matches(CONTINUATION_MARKER).trim()
    }
}

/// A contiguous run of words phonemised with one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Words joined by single spaces.
    pub text: String,
    pub lang: Lang,
}

impl Chunk {
    pub fn new(text: impl Into<String>, lang: Lang) -> Self {
        Self { text: text.into(), lang }
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Identifier labels for each [`RawTag`]; labels not listed are
/// [`RawTag::Other`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagScheme {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
    pub named_entity: Vec<String>,
    pub ambiguous: Vec<String>,
    pub none: Vec<String>,
}

impl TagScheme {
    /// Labels of the `spa-eng` code-switching identifier.
    pub fn spanish_english() -> Self {
        let labels = |l: &[&str]| l.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            primary: labels(&["spa"]),
            secondary: labels(&["en", "eng"]),
            named_entity: labels(&["ne"]),
            ambiguous: labels(&["ambiguous", "mixed"]),
            none: labels(&["", "none"]),
        }
    }

    pub fn classify(&self, label: &str) -> RawTag {
        let label = label.trim();
        let has = |list: &[String]| list.iter().any(|l| l == label);
        if has(&self.primary) {
            RawTag::Primary
        } else if has(&self.secondary) {
            RawTag::Secondary
        } else if has(&self.named_entity) {
            RawTag::NamedEntity
        } else if has(&self.ambiguous) {
            RawTag::Ambiguous
        } else if has(&self.none) {
            RawTag::None
        } else {
            RawTag::Other
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lexicon
// ─────────────────────────────────────────────────────────────────────────────

/// On-disk form of [`SegmenterLexicon`].
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LexiconFile {
    allow_list: Vec<String>,
    place_names: Vec<String>,
    distinctive: Vec<String>,
    affix_patterns: Vec<String>,
}

/// Tables deciding whether a short secondary-language chunk really is
/// foreign.  All entries are matched lower-cased.
#[derive(Debug, Clone, Default)]
pub struct SegmenterLexicon {
    allow_list: HashSet<String>,
    place_names: HashSet<String>,
    distinctive: Vec<String>,
    affixes: Vec<Regex>,
}

impl SegmenterLexicon {
    /// Bundled tables for English insertions in Spanish text.
    pub fn spanish_english() -> Arc<SegmenterLexicon> {
        Arc::clone(&SPANISH_ENGLISH)
    }

    /// An empty lexicon: every short secondary chunk is reclassified.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a lexicon from JSON with the keys `allow_list`, `place_names`,
    /// `distinctive` and `affix_patterns` (all optional lists of strings).
    pub fn from_json(json: &str) -> Result<Self> {
        let file: LexiconFile =
            serde_json::from_str(json).map_err(|e| FrontendError::Lexicon(e.to_string()))?;
        Self::from_parts(file.allow_list, file.place_names, file.distinctive, file.affix_patterns)
    }

    pub fn from_parts<I, S>(
        allow_list: I,
        place_names: I,
        distinctive: I,
        affix_patterns: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lower = |items: I| items.into_iter().map(|s| s.as_ref().to_lowercase());
        let affixes = affix_patterns
            .into_iter()
            .map(|p| {
                Regex::new(p.as_ref())
                    .map_err(|e| FrontendError::Lexicon(format!("pattern {:?}: {e}", p.as_ref())))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            allow_list: lower(allow_list).collect(),
            place_names: lower(place_names).collect(),
            distinctive: lower(distinctive).filter(|d| !d.is_empty()).collect(),
            affixes,
        })
    }

    /// `true` if the word or phrase is a known secondary-language place name.
    pub fn is_place_name(&self, text: &str) -> bool {
        lookup_phrase(&self.place_names, text)
    }

    /// `true` if `text` carries any sign of being secondary-language material.
    pub fn looks_secondary(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        lookup_phrase(&self.allow_list, &lower)
            || lookup_phrase(&self.place_names, &lower)
            || self.distinctive.iter().any(|d| lower.contains(d.as_str()))
            || self.affixes.iter().any(|re| re.is_match(&lower))
    }
}

/// Match the whole phrase or any single word of it, ignoring punctuation.
fn lookup_phrase(set: &HashSet<String>, text: &str) -> bool {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();
    set.contains(&words.join(" ")) || words.iter().any(|w| set.contains(w))
}

// ─────────────────────────────────────────────────────────────────────────────
// Segmenter
// ─────────────────────────────────────────────────────────────────────────────

/// Turns identifier output into language chunks.
#[derive(Debug, Clone)]
pub struct LanguageSegmenter {
    tags: TagScheme,
    lexicon: Arc<SegmenterLexicon>,
}

impl LanguageSegmenter {
    pub fn new(tags: TagScheme, lexicon: Arc<SegmenterLexicon>) -> Self {
        Self { tags, lexicon }
    }

    /// Segmenter for English insertions in Spanish text.
    pub fn spanish_english() -> Self {
        Self::new(TagScheme::spanish_english(), SegmenterLexicon::spanish_english())
    }

    pub fn lexicon(&self) -> &SegmenterLexicon {
        &self.lexicon
    }

    /// Split a tagged utterance into chunks.
    pub fn segment(&self, words: &[TaggedWord]) -> Vec<Chunk> {
        let runs = merge_runs(self.reattach(words));
        merge_runs(runs.into_iter().map(|chunk| self.reclassify(chunk)))
    }

    /// Map a raw label to a working language.
    pub fn resolve(&self, word: &str, label: &str) -> Lang {
        match self.tags.classify(label) {
            RawTag::Secondary => Lang::Secondary,
            RawTag::Ambiguous if self.lexicon.is_place_name(word) => Lang::Secondary,
            RawTag::Primary
            | RawTag::Ambiguous
            | RawTag::NamedEntity
            | RawTag::Other
            | RawTag::None => Lang::Primary,
        }
    }

    /// One chunk per whole word; fragments join the previous word and keep
    /// its resolved language.
    fn reattach(&self, words: &[TaggedWord]) -> Vec<Chunk> {
        words.iter().fold(Vec::new(), |mut acc: Vec<Chunk>, tagged| {
            let surface = tagged.surface();
            if surface.is_empty() {
                return acc;
            }
            match acc.last_mut() {
                Some(prev) if tagged.is_fragment() => prev.text.push_str(surface),
                _ => acc.push(Chunk::new(surface, self.resolve(surface, &tagged.tag))),
            }
            acc
        })
    }

    fn reclassify(&self, chunk: Chunk) -> Chunk {
        let short = chunk.text.matches(' ').count() <= 1;
        if chunk.lang == Lang::Secondary && short && !self.lexicon.looks_secondary(&chunk.text) {
            log::debug!("reclassifying short chunk {:?} to the primary language", chunk.text);
            Chunk { lang: Lang::Primary, ..chunk }
        } else {
            chunk
        }
    }
}

/// Merge neighbouring chunks of the same language.
fn merge_runs(chunks: impl IntoIterator<Item = Chunk>) -> Vec<Chunk> {
    chunks.into_iter().fold(Vec::new(), |mut acc: Vec<Chunk>, chunk| {
        match acc.last_mut() {
            Some(last) if last.lang == chunk.lang => {
                last.text.push(' ');
                last.text.push_str(&chunk.text);
            }
            _ => acc.push(chunk),
        }
        acc
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(pairs: &[(&str, &str)]) -> Vec<TaggedWord> {
        pairs.iter().map(|(w, t)| TaggedWord::new(*w, *t)).collect()
    }

    fn bare_segmenter() -> LanguageSegmenter {
        LanguageSegmenter::new(TagScheme::spanish_english(), Arc::new(SegmenterLexicon::empty()))
    }

    #[test]
    fn test_empty_input() {
        assert!(LanguageSegmenter::spanish_english().segment(&[]).is_empty());
    }

    #[test]
    fn test_single_word() {
        let chunks = LanguageSegmenter::spanish_english().segment(&tagged(&[("hola", "spa")]));
        assert_eq!(chunks, vec![Chunk::new("hola", Lang::Primary)]);
    }

    #[test]
    fn test_monolingual_input_is_one_chunk() {
        let words = tagged(&[
            ("the", "en"),
            ("quick", "en"),
            ("brown", "en"),
            ("fox", "en"),
        ]);
        let chunks = bare_segmenter().segment(&words);
        assert_eq!(chunks, vec![Chunk::new("the quick brown fox", Lang::Secondary)]);

        let words = tagged(&[("desde", "spa"), ("los", "spa"), ("sesudos", "spa")]);
        let chunks = bare_segmenter().segment(&words);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].word_count(), 3);
    }

    #[test]
    fn test_hello_world_is_reclassified() {
        let words = tagged(&[("Hello", "en"), ("world", "en")]);
        let chunks = bare_segmenter().segment(&words);
        assert_eq!(chunks, vec![Chunk::new("Hello world", Lang::Primary)]);
    }

    #[test]
    fn test_reclassified_chunk_merges_with_neighbours() {
        let words = tagged(&[
            ("dijo", "spa"),
            ("hello", "en"),
            ("a", "spa"),
            ("todos", "spa"),
        ]);
        let chunks = LanguageSegmenter::spanish_english().segment(&words);
        assert_eq!(chunks, vec![Chunk::new("dijo hello a todos", Lang::Primary)]);
    }

    #[test]
    fn test_distinctive_letters_keep_secondary() {
        let words = tagged(&[("de", "spa"), ("Thomas", "en"), ("y", "spa")]);
        let chunks = LanguageSegmenter::spanish_english().segment(&words);
        assert_eq!(
            chunks,
            vec![
                Chunk::new("de", Lang::Primary),
                Chunk::new("Thomas", Lang::Secondary),
                Chunk::new("y", Lang::Primary),
            ]
        );
    }

    #[test]
    fn test_affix_patterns_keep_secondary() {
        let segmenter = LanguageSegmenter::spanish_english();
        for word in ["marketing", "station", "spray", "story", "skate"] {
            let chunks = segmenter.segment(&tagged(&[("el", "spa"), (word, "en")]));
            assert_eq!(chunks.len(), 2, "{word} should stay secondary: {chunks:?}");
            assert_eq!(chunks[1].lang, Lang::Secondary);
        }
    }

    #[test]
    fn test_allow_list_keeps_secondary() {
        let chunks = LanguageSegmenter::spanish_english()
            .segment(&tagged(&[("un", "spa"), ("show", "en")]));
        assert_eq!(chunks[1], Chunk::new("show", Lang::Secondary));
    }

    #[test]
    fn test_long_secondary_chunk_is_never_reclassified() {
        let words = tagged(&[("a", "en"), ("la", "en"), ("mode", "en")]);
        let chunks = bare_segmenter().segment(&words);
        assert_eq!(chunks, vec![Chunk::new("a la mode", Lang::Secondary)]);
    }

    #[test]
    fn test_word_pieces_are_reattached() {
        let words = tagged(&[
            ("los", "spa"),
            ("edit", "spa"),
            ("##oriales", "en"),
            ("de", "spa"),
        ]);
        let chunks = LanguageSegmenter::spanish_english().segment(&words);
        assert_eq!(chunks, vec![Chunk::new("los editoriales de", Lang::Primary)]);
    }

    #[test]
    fn test_fragment_never_starts_a_chunk() {
        let words = tagged(&[
            ("el", "spa"),
            ("Washington", "en"),
            ("Post", "en"),
            ("'", "other"),
            ("s", "spa"),
            ("##tory", "spa"),
            ("es", "spa"),
        ]);
        let chunks = LanguageSegmenter::spanish_english().segment(&words);
        assert_eq!(
            chunks,
            vec![
                Chunk::new("el", Lang::Primary),
                Chunk::new("Washington Post'story", Lang::Secondary),
                Chunk::new("es", Lang::Primary),
            ]
        );
        for chunk in &chunks {
            assert!(!chunk.text.starts_with(CONTINUATION_MARKER));
        }
    }

    #[test]
    fn test_leading_fragment_becomes_a_word() {
        let chunks = bare_segmenter().segment(&tagged(&[("##ola", "spa"), ("amigo", "spa")]));
        assert_eq!(chunks, vec![Chunk::new("ola amigo", Lang::Primary)]);
    }

    #[test]
    fn test_tag_resolution() {
        let segmenter = LanguageSegmenter::spanish_english();
        assert_eq!(segmenter.resolve("casa", "spa"), Lang::Primary);
        assert_eq!(segmenter.resolve("house", "en"), Lang::Secondary);
        assert_eq!(segmenter.resolve("Obama", "ne"), Lang::Primary);
        assert_eq!(segmenter.resolve("!", "other"), Lang::Primary);
        assert_eq!(segmenter.resolve("x", ""), Lang::Primary);
        assert_eq!(segmenter.resolve("Houston", "ambiguous"), Lang::Secondary);
        assert_eq!(segmenter.resolve("Toledo", "ambiguous"), Lang::Primary);
    }

    #[test]
    fn test_tag_scheme_classify() {
        let scheme = TagScheme::spanish_english();
        assert_eq!(scheme.classify("spa"), RawTag::Primary);
        assert_eq!(scheme.classify("en"), RawTag::Secondary);
        assert_eq!(scheme.classify("ne"), RawTag::NamedEntity);
        assert_eq!(scheme.classify("mixed"), RawTag::Ambiguous);
        assert_eq!(scheme.classify(""), RawTag::None);
        assert_eq!(scheme.classify("fw"), RawTag::Other);
    }

    #[test]
    fn test_segmentation_is_deterministic() {
        let words = tagged(&[("me", "spa"), ("gusta", "spa"), ("shopping", "en"), ("y", "spa")]);
        let segmenter = LanguageSegmenter::spanish_english();
        assert_eq!(segmenter.segment(&words), segmenter.segment(&words));
    }

    #[test]
    fn test_chunks_partition_the_words() {
        let words = tagged(&[
            ("vimos", "spa"),
            ("the", "en"),
            ("lord", "en"),
            ("of", "en"),
            ("the", "en"),
            ("rings", "en"),
            ("ayer", "spa"),
        ]);
        let chunks = LanguageSegmenter::spanish_english().segment(&words);
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.text.split(' ')).collect();
        let original: Vec<&str> = words.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn test_lexicon_from_json() {
        let lexicon = SegmenterLexicon::from_json(
            r#"{"allow_list": ["Fair Play"], "affix_patterns": ["ness\\b"]}"#,
        )
        .unwrap();
        assert!(lexicon.looks_secondary("fair play"));
        assert!(lexicon.looks_secondary("kindness"));
        assert!(!lexicon.looks_secondary("hola"));
    }

    #[test]
    fn test_lexicon_rejects_bad_input() {
        assert!(matches!(
            SegmenterLexicon::from_json(r#"{"affix_patterns": ["("]}"#),
            Err(FrontendError::Lexicon(_))
        ));
        assert!(matches!(
            SegmenterLexicon::from_json(r#"{"unknown_key": []}"#),
            Err(FrontendError::Lexicon(_))
        ));
    }

    #[test]
    fn test_place_name_phrase_lookup() {
        let lexicon = SegmenterLexicon::spanish_english();
        assert!(lexicon.is_place_name("New York"));
        assert!(lexicon.is_place_name("Houston,"));
        assert!(!lexicon.is_place_name("Madrid"));

        let segmenter = LanguageSegmenter::spanish_english();
        assert!(segmenter.lexicon().is_place_name("washington"));
        assert!(segmenter.lexicon().looks_secondary("Brooklyn"));
    }
}
