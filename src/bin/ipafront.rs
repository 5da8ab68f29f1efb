//! `ipafront` — text to phonetic symbol ids, and alignments to frame counts.
//!
//! ```text
//! ipafront phonemize "Vimos el show de anoche."
//! ipafront phonemize --tags tags.json "Desde The Washington Post."
//! ipafront align --frames 120 "_SIL__0.2 o_0.1 l_0.08 a_0.15"
//! ```
//!
//! Set `RUST_LOG=debug` to see segmentation decisions.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use ipafront::espeak::{is_espeak_available, set_data_path, EspeakPhonemizer};
use ipafront::{
    DurationPlan, FrontendConfig, LanguageIdentifier, LanguageProfile, LanguageSegmenter,
    SegmenterLexicon, SymbolTable, TagScheme, TaggedWord, TextFrontend, UnknownSymbolPolicy,
};

#[derive(Parser, Debug)]
#[command(name = "ipafront", version, about = "Code-switching phonetic text frontend")]
struct Cli {
    /// Symbol table (one symbol per line, first line is a header)
    #[arg(long, global = true, value_name = "CSV")]
    symbols: Option<PathBuf>,

    /// Skip unknown symbols instead of mapping them to the default id
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Convert text to a phonetic string and symbol ids
    Phonemize {
        text: String,

        /// Synthesizer language
        #[arg(short, long, default_value = "es")]
        language: String,

        /// Word-level language tags (JSON list of {"word", "tag"}) from an
        /// external identifier; enables code-switching
        #[arg(long, value_name = "JSON")]
        tags: Option<PathBuf>,

        /// Replacement segmenter lexicon (JSON)
        #[arg(long, value_name = "JSON")]
        lexicon: Option<PathBuf>,

        /// Directory containing `espeak-ng-data/`
        #[arg(long, value_name = "DIR")]
        espeak_data: Option<PathBuf>,

        #[arg(long)]
        word_boundaries: bool,
        #[arg(long)]
        prosody: bool,
        #[arg(long)]
        stress: bool,
        #[arg(long)]
        eos: bool,
    },

    /// Distribute a frame count over an alignment of `symbol_duration` tokens
    Align {
        alignment: String,

        /// Total number of frames
        #[arg(short, long)]
        frames: u32,
    },
}

/// Replays tags produced ahead of time by an external identifier.
struct PrecomputedTags(Vec<TaggedWord>);

impl LanguageIdentifier for PrecomputedTags {
    fn identify(&self, _text: &str) -> Result<Vec<TaggedWord>> {
        Ok(self.0.clone())
    }
}

fn load_table(cli: &Cli) -> Result<Arc<SymbolTable>> {
    let policy = if cli.strict {
        UnknownSymbolPolicy::Strict
    } else {
        UnknownSymbolPolicy::default()
    };
    let table = match &cli.symbols {
        Some(path) => SymbolTable::load(path, policy)?,
        None => SymbolTable::builtin().with_policy(policy),
    };
    Ok(Arc::new(table))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let table = load_table(&cli)?;

    match cli.mode {
        Mode::Phonemize {
            text,
            language,
            tags,
            lexicon,
            espeak_data,
            word_boundaries,
            prosody,
            stress,
            eos,
        } => {
            if let Some(dir) = &espeak_data {
                set_data_path(dir);
            }
            if !is_espeak_available() {
                bail!("libespeak-ng could not be initialised (try --espeak-data)");
            }

            let mut profile = LanguageProfile::for_language(&language)?;
            if let Some(path) = &lexicon {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let lexicon = SegmenterLexicon::from_json(&json)?;
                profile.segmenter = LanguageSegmenter::new(TagScheme::spanish_english(), Arc::new(lexicon));
            }

            let config = FrontendConfig {
                use_word_boundaries: word_boundaries,
                use_explicit_eos: eos,
                use_prosody: prosody,
                use_lexical_stress: stress,
                use_codeswitching: tags.is_some(),
                ..Default::default()
            };

            let mut frontend = TextFrontend::with_profile(profile, config, EspeakPhonemizer::new())
                .with_symbol_table(Arc::clone(&table));
            if let Some(path) = &tags {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let words: Vec<TaggedWord> =
                    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?;
                frontend = frontend.with_identifier(PrecomputedTags(words));
            }

            let phones = frontend.string_to_phones(&text)?;
            let ids = frontend.symbol_table().encode(&phones, eos);
            println!("Phones : {phones}");
            println!("Ids    : {ids:?}");
        }
        Mode::Align { alignment, frames } => {
            let plan = DurationPlan::from_alignment(&alignment)?;
            let (ids, counts) = plan.encode(&table, frames)?;
            println!("Symbols: {}", plan.symbols().join(" "));
            println!("Ids    : {ids:?}");
            println!("Frames : {counts:?}");
        }
    }

    Ok(())
}
