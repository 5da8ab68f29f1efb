//! Text → phonetic string → symbol ids.
//!
//! [`TextFrontend`] runs the whole conversion:
//!
//! 1. **Cleanup** — NFC normalisation, control characters to spaces,
//!    whitespace collapse, aligner silence tokens (`_SIL_`) to pauses.
//! 2. **Phonemisation** — either the whole utterance with the primary
//!    language, or, with code-switching, chunk by chunk with the language
//!    chosen by the [`LanguageSegmenter`].  English chunks are mapped into the
//!    Spanish inventory by [`PhoneticSubstitution`].
//! 3. **Punctuation folding** — clause punctuation becomes the pause marker.
//! 4. **Prosody / word boundaries** — stress and length marks and spaces are
//!    removed unless enabled.
//! 5. **Encoding** — `+` prefix, per-character id lookup, optional EOS id.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::error::{FrontendError, Result};
use crate::phonemize::{LanguageIdentifier, Phonemizer};
use crate::segment::{Chunk, Lang, LanguageSegmenter};
use crate::substitution::PhoneticSubstitution;
use crate::symbols::{SymbolTable, BOS_SYMBOL, PAUSE_SYMBOL};

/// Silence token written by the aligner into transcripts.
pub const SILENCE_TOKEN: &str = "_SIL_";

/// End marker of [`TextFrontend::transcript`].
const TRANSCRIPT_END: char = '#';

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_FOLD_TO_PAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[;:,"\u{201C}\u{201D}«»\-]"#).unwrap());
static RE_DELETE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[¡¿]").unwrap());
static RE_PAUSE_SPACING: Lazy<Regex> = Lazy::new(|| Regex::new(r"~(?:\s*~)+").unwrap());
static RE_PROSODY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ˈˌːˑ˘|‖]").unwrap());

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Switches of the text frontend.
#[derive(Debug, Clone)]
pub struct FrontendConfig {
    /// Keep single spaces between words in the phonetic string.
    pub use_word_boundaries: bool,
    /// Append the end-of-utterance id when encoding.
    pub use_explicit_eos: bool,
    /// Keep stress and length marks.
    pub use_prosody: bool,
    /// Ask the phonemizer for lexical stress marks.
    pub use_lexical_stress: bool,
    /// Segment mixed-language input by default.
    pub use_codeswitching: bool,
    /// Secondary-language chunks with more words than this are wrapped in
    /// pause markers.
    pub long_chunk_words: usize,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            use_word_boundaries: false,
            use_explicit_eos: false,
            use_prosody: false,
            use_lexical_stress: false,
            use_codeswitching: false,
            long_chunk_words: 3,
        }
    }
}

/// Everything that depends on the language pair.
#[derive(Debug, Clone)]
pub struct LanguageProfile {
    /// Language of the synthesizer, e.g. `"es"`.
    pub language: String,
    /// Phonemizer voice for the primary language.
    pub primary_voice: String,
    /// Phonemizer voice for secondary-language chunks.
    pub secondary_voice: String,
    pub segmenter: LanguageSegmenter,
    /// Applied to chunks phonemised with the secondary voice.
    pub substitution: PhoneticSubstitution,
}

impl LanguageProfile {
    /// Profile for a synthesizer language.  Only Spanish (with English
    /// insertions) is available.
    pub fn for_language(language: &str) -> Result<Self> {
        match language {
            "es" => Ok(Self {
                language: "es".to_string(),
                primary_voice: "es".to_string(),
                secondary_voice: "en-us".to_string(),
                segmenter: LanguageSegmenter::spanish_english(),
                substitution: PhoneticSubstitution::english_to_spanish().clone(),
            }),
            other => Err(FrontendError::UnsupportedLanguage(other.to_string())),
        }
    }

    fn voice(&self, lang: Lang) -> &str {
        match lang {
            Lang::Primary => &self.primary_voice,
            Lang::Secondary => &self.secondary_voice,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Text helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Repair the encoding of `text` without changing case or script.
pub fn clean_text(text: &str) -> String {
    let text: String = text
        .nfc()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let text = text.replace(SILENCE_TOKEN, &PAUSE_SYMBOL.to_string());
    RE_SPACES.replace_all(text.trim(), " ").into_owned()
}

/// Fold clause punctuation into the pause marker and collapse pause runs,
/// including runs separated only by whitespace.
///
/// `; : , " “ ” « » -` become `~`, `¡ ¿` are deleted, line breaks and tabs
/// become spaces.  Sentence-final `. ? !` are kept.
pub fn fold_punctuation(phones: &str) -> String {
    let phones = phones.replace(['\n', '\t'], " ");
    let phones = RE_FOLD_TO_PAUSE.replace_all(&phones, "~");
    let phones = RE_DELETE.replace_all(&phones, "");
    RE_PAUSE_SPACING.replace_all(&phones, "~").into_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// TextFrontend
// ─────────────────────────────────────────────────────────────────────────────

/// Text frontend of the synthesizer.
///
/// Immutable after construction; `Send + Sync`, so one instance can serve
/// several worker threads.
pub struct TextFrontend {
    profile: LanguageProfile,
    config: FrontendConfig,
    table: Arc<SymbolTable>,
    phonemizer: Box<dyn Phonemizer + Send + Sync>,
    identifier: Option<Box<dyn LanguageIdentifier + Send + Sync>>,
}

impl TextFrontend {
    /// Create a frontend for `language` using the bundled symbol table.
    ///
    /// Fails with [`FrontendError::UnsupportedLanguage`] for languages
    /// without a [`LanguageProfile`].
    pub fn new(
        language: &str,
        config: FrontendConfig,
        phonemizer: impl Phonemizer + Send + Sync + 'static,
    ) -> Result<Self> {
        let profile = LanguageProfile::for_language(language)?;
        Ok(Self::with_profile(profile, config, phonemizer))
    }

    pub fn with_profile(
        profile: LanguageProfile,
        config: FrontendConfig,
        phonemizer: impl Phonemizer + Send + Sync + 'static,
    ) -> Self {
        log::debug!("Created a text frontend for {:?}", profile.language);
        Self {
            profile,
            config,
            table: Arc::new(SymbolTable::builtin().clone()),
            phonemizer: Box::new(phonemizer),
            identifier: None,
        }
    }

    /// Attach the language identifier used for code-switching.
    pub fn with_identifier(
        mut self,
        identifier: impl LanguageIdentifier + Send + Sync + 'static,
    ) -> Self {
        self.identifier = Some(Box::new(identifier));
        self
    }

    /// Replace the symbol table.
    pub fn with_symbol_table(mut self, table: Arc<SymbolTable>) -> Self {
        self.table = table;
        self
    }

    pub fn config(&self) -> &FrontendConfig {
        &self.config
    }

    pub fn profile(&self) -> &LanguageProfile {
        &self.profile
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.table
    }

    /// Convert text to the final phonetic string (starting with `+`).
    pub fn convert(&self, text: &str, use_segmentation: bool) -> Result<String> {
        let utt = clean_text(text);

        let phones = if use_segmentation {
            self.phonemize_code_switched(&utt)?
        } else {
            let phones = self.phonemizer.phonemize(
                &utt,
                &self.profile.primary_voice,
                self.config.use_lexical_stress,
            )?;
            fold_punctuation(&phones)
        };

        Ok(self.finish(&phones))
    }

    /// [`convert`](Self::convert) with the configured code-switching default.
    pub fn string_to_phones(&self, text: &str) -> Result<String> {
        self.convert(text, self.config.use_codeswitching)
    }

    /// Text → symbol ids, ready for the synthesis model.
    pub fn string_to_ids(&self, text: &str) -> Result<Vec<i64>> {
        let phones = self.string_to_phones(text)?;
        Ok(self.table.encode(&phones, self.config.use_explicit_eos))
    }

    /// The phonetic string followed by a `#` end marker, for inspection.
    pub fn transcript(&self, text: &str) -> Result<String> {
        let mut phones = self.string_to_phones(text)?;
        phones.push(TRANSCRIPT_END);
        Ok(phones)
    }

    /// Encode an already phonemised string, e.g. aligner output.
    ///
    /// Silence tokens become pauses, spaces are dropped, leading and trailing
    /// pauses are removed and the `+` prefix is added.  No EOS id is
    /// appended; the synthesizer adds its own.
    pub fn phones_to_ids(&self, phones: &str) -> Vec<i64> {
        let phones = phones.replace(SILENCE_TOKEN, &PAUSE_SYMBOL.to_string()).replace(' ', "");
        let mut prefixed = String::with_capacity(phones.len() + 1);
        prefixed.push(BOS_SYMBOL);
        prefixed.push_str(phones.trim_matches(PAUSE_SYMBOL));
        self.table.encode(&prefixed, false)
    }

    fn phonemize_code_switched(&self, utt: &str) -> Result<String> {
        let identifier = self.identifier.as_ref().ok_or(FrontendError::NoIdentifier)?;
        let words = identifier.identify(utt)?;
        let chunks = self.profile.segmenter.segment(&words);

        let parts = chunks
            .iter()
            .map(|chunk| self.phonemize_chunk(chunk))
            .collect::<Result<Vec<_>>>()?;

        let joined = parts.join(" ");
        Ok(RE_PAUSE_SPACING.replace_all(&joined, "~").into_owned())
    }

    fn phonemize_chunk(&self, chunk: &Chunk) -> Result<String> {
        let voice = self.profile.voice(chunk.lang);
        log::debug!("phonemizing {:?} with voice {voice}", chunk.text);

        let phones = self
            .phonemizer
            .phonemize(&chunk.text, voice, self.config.use_lexical_stress)?;

        let phones = match chunk.lang {
            Lang::Primary => phones,
            Lang::Secondary => self.profile.substitution.normalize(&phones),
        };
        let phones = fold_punctuation(&phones);

        if chunk.lang == Lang::Secondary && chunk.word_count() > self.config.long_chunk_words {
            Ok(format!("{PAUSE_SYMBOL}{phones}{PAUSE_SYMBOL}"))
        } else {
            Ok(phones)
        }
    }

    /// Prosody stripping, word-boundary handling and the `+` prefix.
    fn finish(&self, phones: &str) -> String {
        let phones = if self.config.use_prosody {
            phones.to_string()
        } else {
            // `~ . ? !` stay: they cue the synthesizer's stop prediction.
            RE_PROSODY.replace_all(phones, "").into_owned()
        };

        let phones = if self.config.use_word_boundaries {
            RE_SPACES.replace_all(phones.trim(), " ").into_owned()
        } else {
            RE_SPACES.replace_all(&phones, "").into_owned()
        };

        let mut out = String::with_capacity(phones.len() + 1);
        out.push(BOS_SYMBOL);
        out.push_str(&phones);
        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phonemize::phonemize_preserving_punctuation;
    use crate::segment::TaggedWord;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Spanish: lower-cased spelling.  English: a tiny pronouncing dictionary.
    struct DictPhonemizer {
        english: HashMap<&'static str, &'static str>,
        calls: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl DictPhonemizer {
        fn new() -> Self {
            let english = [
                ("the", "ðə"),
                ("washington", "wˈɑːʃɪŋtən"),
                ("post", "pˈoʊst"),
                ("big", "bˈɪɡ"),
                ("brown", "bɹˈaʊn"),
                ("fox", "fˈɑːks"),
            ]
            .into_iter()
            .collect();
            Self { english, calls: Arc::new(Mutex::new(Vec::new())) }
        }
    }

    impl Phonemizer for DictPhonemizer {
        fn phonemize(&self, text: &str, language: &str, with_stress: bool) -> anyhow::Result<String> {
            self.calls.lock().unwrap().push((text.to_string(), language.to_string()));
            let phones = phonemize_preserving_punctuation(text, |segment| {
                Ok(segment
                    .split_whitespace()
                    .map(|w| {
                        let w = w.to_lowercase();
                        match language {
                            "en-us" => self.english.get(w.as_str()).map(|p| p.to_string()).unwrap_or(w),
                            "es" => w,
                            other => panic!("unexpected voice {other}"),
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" "))
            })?;
            Ok(if with_stress { phones } else { phones.replace(['ˈ', 'ˌ'], "") })
        }
    }

    struct FailingPhonemizer;

    impl Phonemizer for FailingPhonemizer {
        fn phonemize(&self, _: &str, _: &str, _: bool) -> anyhow::Result<String> {
            anyhow::bail!("phonemizer unreachable")
        }
    }

    /// Tags the words of a fixed English set as `en`, everything else `spa`.
    struct SetIdentifier;

    impl LanguageIdentifier for SetIdentifier {
        fn identify(&self, text: &str) -> anyhow::Result<Vec<TaggedWord>> {
            const ENGLISH: &[&str] = &["the", "washington", "post", "big", "brown", "fox", "hello"];
            Ok(text
                .split_whitespace()
                .map(|w| {
                    let key = w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
                    let tag = if ENGLISH.contains(&key.as_str()) { "en" } else { "spa" };
                    TaggedWord::new(w, tag)
                })
                .collect())
        }
    }

    fn frontend(config: FrontendConfig) -> TextFrontend {
        TextFrontend::new("es", config, DictPhonemizer::new())
            .unwrap()
            .with_identifier(SetIdentifier)
    }

    #[test]
    fn test_unsupported_language_is_an_error() {
        let err = TextFrontend::new("de", FrontendConfig::default(), DictPhonemizer::new())
            .err()
            .expect("German has no profile");
        assert!(matches!(err, FrontendError::UnsupportedLanguage(l) if l == "de"));
    }

    #[test]
    fn test_spanish_profile_and_config() {
        let config = FrontendConfig { long_chunk_words: 5, ..Default::default() };
        let fe = TextFrontend::new("es", config, DictPhonemizer::new()).unwrap();
        assert_eq!(fe.profile().language, "es");
        assert_eq!(fe.profile().primary_voice, "es");
        assert_eq!(fe.profile().secondary_voice, "en-us");
        assert_eq!(fe.config().long_chunk_words, 5);
        assert!(!fe.config().use_codeswitching);
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Hola\tmundo\u{0007} "), "Hola mundo");
        // Decomposed "é" is composed; case is kept.
        assert_eq!(clean_text("Qu\u{0065}\u{0301} TAL"), "Qu\u{00E9} TAL");
        assert_eq!(clean_text("uno _SIL_ dos"), "uno ~ dos");
    }

    #[test]
    fn test_fold_punctuation() {
        assert_eq!(fold_punctuation("a;b:c"), "a~b~c");
        assert_eq!(fold_punctuation("¿qué?"), "qué?");
        assert_eq!(fold_punctuation("¡sí!"), "sí!");
        assert_eq!(fold_punctuation("a, \"b\" - c"), "a~b~ c");
        assert_eq!(fold_punctuation("a;:,b"), "a~b");
        assert_eq!(fold_punctuation("a\nb\tc."), "a b c.");
    }

    #[test]
    fn test_convert_without_segmentation() {
        let fe = frontend(FrontendConfig::default());
        assert_eq!(fe.convert("Hola; qué tal: bien.", false).unwrap(), "+hola~quétal~bien.");
    }

    #[test]
    fn test_word_boundaries() {
        let fe = frontend(FrontendConfig { use_word_boundaries: true, ..Default::default() });
        assert_eq!(fe.convert("Hola;   qué  tal.", false).unwrap(), "+hola~ qué tal.");
    }

    #[test]
    fn test_segmented_conversion() {
        let fe = frontend(FrontendConfig { use_word_boundaries: true, ..Default::default() });
        assert_eq!(
            fe.convert("vimos The Washington Post ayer", true).unwrap(),
            "+vimos ðe watʃiŋten poust ayer"
        );

        let fe = frontend(FrontendConfig::default());
        assert_eq!(
            fe.convert("vimos The Washington Post ayer", true).unwrap(),
            "+vimosðewatʃiŋtenpoustayer"
        );
    }

    #[test]
    fn test_chunks_use_their_own_voice() {
        let phonemizer = DictPhonemizer::new();
        let calls = Arc::clone(&phonemizer.calls);
        let fe = TextFrontend::new("es", FrontendConfig::default(), phonemizer)
            .unwrap()
            .with_identifier(SetIdentifier);
        fe.convert("vimos The Washington Post ayer", true).unwrap();
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                ("vimos".to_string(), "es".to_string()),
                ("The Washington Post".to_string(), "en-us".to_string()),
                ("ayer".to_string(), "es".to_string()),
            ]
        );
    }

    #[test]
    fn test_long_secondary_chunks_are_wrapped_in_pauses() {
        let fe = frontend(FrontendConfig {
            use_word_boundaries: true,
            long_chunk_words: 2,
            ..Default::default()
        });
        assert_eq!(
            fe.convert("vimos The Washington Post ayer", true).unwrap(),
            "+vimos ~ðe watʃiŋten poust~ ayer"
        );
    }

    #[test]
    fn test_pause_spacing_artifacts_collapse() {
        let fe = frontend(FrontendConfig {
            use_word_boundaries: true,
            long_chunk_words: 2,
            ..Default::default()
        });
        assert_eq!(
            fe.convert("dijo, the big brown fox", true).unwrap(),
            "+dijo~ðe biɡ bɾaun faks~"
        );
    }

    #[test]
    fn test_short_english_is_phonemized_as_spanish() {
        let phonemizer = DictPhonemizer::new();
        let calls = Arc::clone(&phonemizer.calls);
        let fe = TextFrontend::new("es", FrontendConfig::default(), phonemizer)
            .unwrap()
            .with_identifier(SetIdentifier);
        assert_eq!(fe.convert("Hello amigos", true).unwrap(), "+helloamigos");
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_prosody_markers() {
        let stressed = FrontendConfig { use_lexical_stress: true, ..Default::default() };
        let fe = frontend(stressed.clone());
        assert_eq!(fe.convert("The Washington Post", true).unwrap(), "+ðewatʃiŋtenpoust");

        let fe = frontend(FrontendConfig { use_prosody: true, ..stressed });
        assert_eq!(fe.convert("The Washington Post", true).unwrap(), "+ðewˈaːtʃiŋtenpˈoust");
    }

    #[test]
    fn test_silence_tokens_become_pauses() {
        let fe = frontend(FrontendConfig::default());
        assert_eq!(fe.convert("uno _SIL_ _SIL_ dos", false).unwrap(), "+uno~dos");
    }

    #[test]
    fn test_empty_text() {
        let fe = frontend(FrontendConfig::default());
        assert_eq!(fe.convert("", false).unwrap(), "+");
        assert_eq!(fe.convert("   ", true).unwrap(), "+");
    }

    #[test]
    fn test_segmentation_needs_an_identifier() {
        let fe = TextFrontend::new("es", FrontendConfig::default(), DictPhonemizer::new()).unwrap();
        assert!(matches!(fe.convert("hola", true), Err(FrontendError::NoIdentifier)));
        assert!(fe.convert("hola", false).is_ok());
    }

    #[test]
    fn test_phonemizer_errors_propagate() {
        let fe = TextFrontend::new("es", FrontendConfig::default(), FailingPhonemizer).unwrap();
        let err = fe.convert("hola", false).unwrap_err();
        assert!(matches!(err, FrontendError::External(_)));
        assert_eq!(err.to_string(), "phonemizer unreachable");
    }

    #[test]
    fn test_string_to_ids() {
        let fe = frontend(FrontendConfig { use_explicit_eos: true, ..Default::default() });
        let ids = fe.string_to_ids("sal.").unwrap();
        let table = fe.symbol_table();
        assert_eq!(ids.first().copied(), table.bos_id());
        assert_eq!(ids.last().copied(), Some(table.eos_id()));
        assert_eq!(table.decode(&ids[..ids.len() - 1]), "+sal.");
    }

    #[test]
    fn test_transcript_has_end_marker() {
        let fe = frontend(FrontendConfig::default());
        assert_eq!(fe.transcript("hola").unwrap(), "+hola#");
    }

    #[test]
    fn test_phones_to_ids() {
        let fe = frontend(FrontendConfig::default());
        let ids = fe.phones_to_ids("~_SIL_ola mundo~");
        assert_eq!(fe.symbol_table().decode(&ids), "+olamundo");
    }

    #[test]
    fn test_frontend_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TextFrontend>();
    }
}
