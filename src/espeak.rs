//! [`Phonemizer`] backed by the `libespeak-ng` C library.
//!
//! Calls the espeak-ng C API directly instead of spawning a subprocess.  The
//! voice is switched on every call, so one process can phonemise Spanish
//! and English chunks of the same utterance.
//!
//! espeak-ng drops punctuation and inserts language-switch flags such as
//! `(en)` when a word looks foreign; both are handled here so the output
//! matches what the rest of the frontend expects.
//!
//! ## Build requirements
//! | Platform             | Requirement                                    |
//! |----------------------|------------------------------------------------|
//! | Alpine / Linux       | `apk add espeak-ng-dev` / `apt install libespeak-ng-dev` |
//! | macOS (Homebrew)     | `brew install espeak-ng`                       |
//! | Other                | Set `ESPEAK_LIB_DIR` at build time and call [`set_data_path`] at runtime |

use std::{
    ffi::{CStr, CString},
    os::raw::{c_char, c_int, c_void},
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{anyhow, bail, Result};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;

use crate::phonemize::{phonemize_preserving_punctuation, Phonemizer};

// ─── FFI bindings ─────────────────────────────────────────────────────────────
// Linking is handled by build.rs when the `espeak` feature is enabled.

extern "C" {
    /// Set the directory that contains `espeak-ng-data/`.
    /// Pass `NULL` to use the library's compiled-in default.
    fn espeak_ng_InitializePath(path: *const c_char);

    /// Initialise the phoneme tables.  Returns ENS_OK (0) on success.
    fn espeak_ng_Initialize(context: *mut c_void) -> c_int;

    /// Select the voice used for phonemisation.  Returns EE_OK (0) on success.
    fn espeak_ng_SetVoiceByName(name: *const c_char) -> c_int;

    /// Translate one clause of text to phonemes.
    ///
    /// `textptr` is advanced past the translated clause, or set to `NULL`
    /// once the whole text has been consumed.  The returned buffer is
    /// overwritten by the next call.
    fn espeak_TextToPhonemes(
        textptr: *mut *const c_void,
        textmode: c_int,
        phonememode: c_int,
    ) -> *const c_char;
}

/// `textmode` value: input is UTF-8.
const CHARS_UTF8: c_int = 1;

/// `phonememode` value: output IPA (bit 1 set).
const PHONEMES_IPA: c_int = 0x02;

// ─── Global state ─────────────────────────────────────────────────────────────

/// Serialises every call into the espeak-ng library (global state, not
/// thread-safe).  Also guards the currently selected voice.
static LOCK: Mutex<Option<String>> = Mutex::new(None);

/// Cached result of the one-time initialisation.
static INIT: OnceCell<std::result::Result<(), String>> = OnceCell::new();

/// Optional runtime path to `espeak-ng-data/`.
static DATA_PATH: OnceCell<PathBuf> = OnceCell::new();

/// Language-switch flags, e.g. `(en)` or `(es-419)`.
static RE_LANG_FLAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([a-z]{2,3}(?:-[a-z0-9]+)*\)").unwrap());

/// Set the path to the `espeak-ng-data` directory.
///
/// Has no effect once the library has been initialised.
pub fn set_data_path(path: &Path) {
    let _ = DATA_PATH.set(path.to_path_buf());
}

/// Called exactly once (inside LOCK) to initialise the library.
fn do_init() -> std::result::Result<(), String> {
    let path_cstr: Option<CString> = match DATA_PATH.get() {
        Some(p) => Some(
            CString::new(p.to_string_lossy().as_bytes())
                .map_err(|_| "espeak data path contains a null byte".to_string())?,
        ),
        None => None,
    };
    let path_ptr: *const c_char = path_cstr.as_ref().map_or(std::ptr::null(), |c| c.as_ptr());

    // ENS_OK = 0
    let status = unsafe {
        espeak_ng_InitializePath(path_ptr);
        espeak_ng_Initialize(std::ptr::null_mut())
    };
    if status != 0 {
        return Err(format!("espeak_ng_Initialize failed (status {:#010x})", status));
    }
    Ok(())
}

/// Returns `true` if espeak-ng initialises successfully.
pub fn is_espeak_available() -> bool {
    let _guard = LOCK.lock().unwrap_or_else(|p| p.into_inner());
    INIT.get_or_init(do_init).is_ok()
}

/// Select `language` unless it is already the active voice.  LOCK must be held.
fn select_voice(current: &mut Option<String>, language: &str) -> Result<()> {
    if current.as_deref() == Some(language) {
        return Ok(());
    }
    let voice = CString::new(language).map_err(|_| anyhow!("voice name contains a null byte"))?;
    let rc = unsafe { espeak_ng_SetVoiceByName(voice.as_ptr()) };
    if rc != 0 {
        *current = None;
        bail!("espeak-ng does not support language {language:?} (rc {rc})");
    }
    *current = Some(language.to_string());
    Ok(())
}

/// Translate `text` clause by clause.  LOCK must be held.
fn text_to_phonemes(text: &str) -> Result<String> {
    let text_c = CString::new(text).map_err(|_| anyhow!("phonemize: text contains a null byte"))?;

    let mut current: *const c_void = text_c.as_ptr() as *const c_void;
    let mut parts: Vec<String> = Vec::new();

    while !current.is_null() {
        let phonemes_ptr = unsafe { espeak_TextToPhonemes(&mut current, CHARS_UTF8, PHONEMES_IPA) };
        if phonemes_ptr.is_null() {
            continue;
        }
        // Copy out before the next call overwrites the internal buffer.
        let chunk = unsafe { CStr::from_ptr(phonemes_ptr) }
            .to_str()
            .map_err(|_| anyhow!("espeak-ng returned non-UTF-8 phonemes"))?
            .trim()
            .to_owned();
        if !chunk.is_empty() {
            parts.push(chunk);
        }
    }

    Ok(parts.join(" "))
}

/// espeak-ng phonemizer.  Stateless handle; all instances share the library.
#[derive(Debug, Clone, Copy, Default)]
pub struct EspeakPhonemizer;

impl EspeakPhonemizer {
    pub fn new() -> Self {
        Self
    }
}

impl Phonemizer for EspeakPhonemizer {
    fn phonemize(&self, text: &str, language: &str, with_stress: bool) -> Result<String> {
        let mut voice = LOCK.lock().unwrap_or_else(|p| p.into_inner());

        INIT.get_or_init(do_init)
            .as_ref()
            .map_err(|e| anyhow!("espeak-ng: {}", e))?;
        select_voice(&mut voice, language)?;

        let phones = phonemize_preserving_punctuation(text, text_to_phonemes)?;
        let phones = RE_LANG_FLAG.replace_all(&phones, "");
        Ok(if with_stress {
            phones.into_owned()
        } else {
            phones.replace(['ˈ', 'ˌ'], "")
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
