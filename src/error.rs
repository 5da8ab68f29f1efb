//! Error type shared by every stage of the frontend.

use std::path::PathBuf;

/// Errors surfaced by the text frontend.
///
/// Failures of the external collaborators (phonemizer, language identifier)
/// are carried unchanged in [`FrontendError::External`].
#[derive(thiserror::Error, Debug)]
pub enum FrontendError {
    #[error("Cannot read symbol table {path}: {source}")]
    ResourceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid symbol table: {0}")]
    Resource(String),
    #[error("Symbol {0:?} is not in the symbol table")]
    UnknownSymbol(String),
    #[error("Cannot distribute {durations} durations over {target} frames")]
    DurationMismatch { durations: usize, target: usize },
    #[error("Duration {value} at position {index} must be positive and finite")]
    InvalidDuration { index: usize, value: f64 },
    #[error("Malformed alignment token {0:?}, expected `symbol_duration`")]
    MalformedAlignment(String),
    #[error("Code-switching requested but no language identifier is configured")]
    NoIdentifier,
    #[error("Language {0:?} is not supported")]
    UnsupportedLanguage(String),
    #[error("Invalid substitution rule {pattern:?}: {message}")]
    InvalidRule { pattern: String, message: String },
    #[error("Invalid segmenter lexicon: {0}")]
    Lexicon(String),
    #[error(transparent)]
    External(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FrontendError>;
