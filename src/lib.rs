//! # ipafront
//!
//! Phonetic text frontend for a Spanish speech synthesizer that also reads
//! English insertions ("Desde *The Washington Post* informan…").
//!
//! ## Quick start
//!
//! ```no_run
//! use ipafront::{FrontendConfig, TextFrontend};
//! # use ipafront::Phonemizer;
//! # struct MyPhonemizer;
//! # impl Phonemizer for MyPhonemizer {
//! #     fn phonemize(&self, t: &str, _: &str, _: bool) -> anyhow::Result<String> { Ok(t.into()) }
//! # }
//!
//! let frontend = TextFrontend::new("es", FrontendConfig::default(), MyPhonemizer).unwrap();
//! let phones = frontend.string_to_phones("Hola, ¿qué tal?").unwrap();
//! let ids = frontend.string_to_ids("Hola, ¿qué tal?").unwrap();
//! ```
//!
//! With the `espeak` feature, [`espeak::EspeakPhonemizer`] phonemises through
//! `libespeak-ng`.  Code-switching additionally needs a word-level
//! [`LanguageIdentifier`] (see [`TextFrontend::with_identifier`]).
//!
//! Frame counts for an aligned utterance:
//!
//! ```
//! use ipafront::{DurationPlan, SymbolTable};
//!
//! let plan = DurationPlan::from_alignment("o_0.12 l_0.08 a_0.2").unwrap();
//! let (ids, frames) = plan.encode(SymbolTable::builtin(), 40).unwrap();
//! assert_eq!(ids.len(), frames.len());
//! assert_eq!(frames.iter().sum::<u32>(), 40);
//! ```
//!
//! ## Pipeline
//! 1. **Cleanup** — NFC, control characters, aligner silence tokens.
//! 2. **Segmentation** — identifier tags → language chunks ([`segment`]).
//! 3. **Phonemisation** — one voice per chunk; English phones are mapped
//!    into the Spanish inventory ([`substitution`]).
//! 4. **Folding** — clause punctuation → pause `~`, prosody marks and spaces
//!    removed unless enabled, `+` prefix.
//! 5. **Encoding** — one id per character ([`symbols`]).

pub mod duration;
pub mod error;
pub mod frontend;
pub mod phonemize;
pub mod segment;
pub mod substitution;
pub mod symbols;

// libespeak-ng backend; build.rs links the library only with this feature.
#[cfg(feature = "espeak")]
pub mod espeak;

// ─── Re-exports for convenience ─────────────────────────────────────────────

pub use duration::{align, DurationPlan};
pub use error::{FrontendError, Result};
pub use frontend::{FrontendConfig, LanguageProfile, TextFrontend};
pub use phonemize::{LanguageIdentifier, Phonemizer};
pub use segment::{Chunk, Lang, LanguageSegmenter, SegmenterLexicon, TagScheme, TaggedWord};
pub use substitution::PhoneticSubstitution;
pub use symbols::{SymbolTable, UnknownSymbolPolicy};
