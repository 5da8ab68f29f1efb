//! Phonetic symbol table — maps each symbol of a phonetic string to the
//! integer id consumed by the synthesis model's embedding layer.
//!
//! The table is read from a text resource with one symbol per line.  The
//! first line is a header (or blank) and is never a symbol; the symbol on
//! line *i* gets id *i*.  Lines may be CSV rows of articulatory features, in
//! which case only the first field is the symbol.
//!
//! Reserved ids:
//!
//! | id  | meaning                                        |
//! |-----|------------------------------------------------|
//! | 0   | padding (the header line, never a symbol)      |
//! | 1   | end of utterance (`end_of_input`)              |
//! | —   | begin of sentence: the id of [`BOS_SYMBOL`]    |
//! | —   | pause: the id of [`PAUSE_SYMBOL`]              |

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;

use crate::error::{FrontendError, Result};

/// Id reserved for padding.
pub const PAD_ID: i64 = 0;

/// Name of the end-of-utterance entry in the resource.
pub const EOS_NAME: &str = "end_of_input";

/// Start-of-utterance marker prefixed to every phonetic string.
pub const BOS_SYMBOL: char = '+';

/// Pause marker.
pub const PAUSE_SYMBOL: char = '~';

/// Sentinel id used for unknown symbols by the bundled table.
pub const DEFAULT_UNKNOWN_ID: i64 = 133;

/// Bundled default table (IPA inventory of the Spanish synthesizer).
const BUILTIN_TABLE: &str = include_str!("../assets/ipa_symbols.csv");

static BUILTIN: Lazy<SymbolTable> = Lazy::new(|| {
    SymbolTable::parse(BUILTIN_TABLE, UnknownSymbolPolicy::Default(DEFAULT_UNKNOWN_ID))
        .expect("bundled symbol table is valid")
});

/// What [`SymbolTable::id_of`] does with a symbol that is not in the table.
///
/// Fixed when the table is built; every lookup through the table applies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownSymbolPolicy {
    /// Map unknown symbols to this id.
    Default(i64),
    /// Report [`FrontendError::UnknownSymbol`]; the encoder skips the symbol
    /// and logs a warning.
    Strict,
}

impl Default for UnknownSymbolPolicy {
    fn default() -> Self {
        UnknownSymbolPolicy::Default(DEFAULT_UNKNOWN_ID)
    }
}

/// Immutable symbol → id mapping.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    ids: HashMap<String, i64>,
    symbols: HashMap<i64, String>,
    size: usize,
    policy: UnknownSymbolPolicy,
}

impl SymbolTable {
    /// The bundled table with the default unknown-symbol policy.
    pub fn builtin() -> &'static SymbolTable {
        &BUILTIN
    }

    /// Load a table from a file.
    pub fn load(path: &Path, policy: UnknownSymbolPolicy) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| FrontendError::ResourceIo {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(&content, policy)?;
        log::info!(
            "Loaded {} phonetic symbols from {}",
            table.symbol_count(),
            path.display()
        );
        Ok(table)
    }

    /// Build a table from the resource text.
    pub fn parse(content: &str, policy: UnknownSymbolPolicy) -> Result<Self> {
        let mut ids = HashMap::new();
        let mut symbols = HashMap::new();
        let mut size = 0usize;

        for (index, line) in content.split('\n').enumerate().skip(1) {
            let line = line.strip_suffix('\r').unwrap_or(line);
            // An empty first field can only be the comma symbol itself,
            // alone (",") or followed by its feature columns (",,1,0").
            let symbol = if line.starts_with(',') {
                ","
            } else {
                line.split(',').next().unwrap_or("")
            };
            if symbol.is_empty() {
                continue;
            }
            let id = index as i64;
            if ids.insert(symbol.to_string(), id).is_some() {
                return Err(FrontendError::Resource(format!(
                    "symbol {symbol:?} is listed twice (second time on line {index})"
                )));
            }
            symbols.insert(id, symbol.to_string());
            size += 1;
        }

        if size == 0 {
            return Err(FrontendError::Resource(
                "the resource does not list any symbol".to_string(),
            ));
        }

        Ok(Self { ids, symbols, size, policy })
    }

    /// The same symbols under another unknown-symbol policy.
    pub fn with_policy(&self, policy: UnknownSymbolPolicy) -> Self {
        Self { policy, ..self.clone() }
    }

    /// Number of symbols in the table.
    pub fn symbol_count(&self) -> usize {
        self.size
    }

    pub fn policy(&self) -> UnknownSymbolPolicy {
        self.policy
    }

    /// Look up a symbol, applying the table's unknown-symbol policy.
    pub fn id_of(&self, symbol: &str) -> Result<i64> {
        match (self.ids.get(symbol), self.policy) {
            (Some(&id), _) => Ok(id),
            (None, UnknownSymbolPolicy::Default(id)) => Ok(id),
            (None, UnknownSymbolPolicy::Strict) => {
                Err(FrontendError::UnknownSymbol(symbol.to_string()))
            }
        }
    }

    /// Inverse lookup.
    pub fn symbol_of(&self, id: i64) -> Option<&str> {
        self.symbols.get(&id).map(String::as_str)
    }

    /// Id of the end-of-utterance entry.
    pub fn eos_id(&self) -> i64 {
        self.ids.get(EOS_NAME).copied().unwrap_or(1)
    }

    /// Id of the pause marker, if the table has one.
    pub fn pause_id(&self) -> Option<i64> {
        self.ids.get(PAUSE_SYMBOL.to_string().as_str()).copied()
    }

    /// Id of the start-of-utterance marker, if the table has one.
    pub fn bos_id(&self) -> Option<i64> {
        self.ids.get(BOS_SYMBOL.to_string().as_str()).copied()
    }

    /// Convert a phonetic string to ids, one lookup per character.
    ///
    /// Under [`UnknownSymbolPolicy::Strict`] unknown characters are skipped
    /// with a warning.  When `explicit_eos` is set the end-of-utterance id is
    /// appended.
    pub fn encode(&self, phones: &str, explicit_eos: bool) -> Vec<i64> {
        let mut ids = Vec::with_capacity(phones.len() + 1);
        let mut buf = [0u8; 4];
        for ch in phones.chars() {
            match self.id_of(ch.encode_utf8(&mut buf)) {
                Ok(id) => ids.push(id),
                Err(e) => log::warn!("{e}; skipping it"),
            }
        }
        if explicit_eos {
            ids.push(self.eos_id());
        }
        ids
    }

    /// Map ids back to their symbols; ids without a symbol are dropped.
    pub fn decode(&self, ids: &[i64]) -> String {
        ids.iter().filter_map(|&id| self.symbol_of(id)).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
