//! Integer frame counts from continuous symbol durations.
//!
//! [`align`] turns per-symbol durations (seconds, or any unit) into frame
//! counts summing exactly to the requested total.  Each count is the rounded
//! scaled duration; the rounding surplus or deficit is then settled one frame
//! at a time on the longest symbols, so no symbol moves by more than one
//! frame from its rounded value.
//!
//! [`DurationPlan`] parses the aligner's `symbol_duration` transcripts.

use std::cmp::Reverse;

use crate::error::{FrontendError, Result};
use crate::frontend::SILENCE_TOKEN;
use crate::symbols::{SymbolTable, PAUSE_SYMBOL};

/// Duration given to pauses added around an alignment.
pub const PLACEHOLDER_PAUSE_DURATION: f64 = 0.1;

/// Distribute `target` frames over `durations`.
///
/// Fails with [`FrontendError::InvalidDuration`] for durations that are not
/// positive and finite, and with [`FrontendError::DurationMismatch`] when
/// frames cannot be distributed at all (zero target for a non-empty input, or
/// a positive target for an empty one).
pub fn align(durations: &[f64], target: u32) -> Result<Vec<u32>> {
    if let Some((index, &value)) = durations
        .iter()
        .enumerate()
        .find(|(_, d)| !(d.is_finite() && **d > 0.0))
    {
        return Err(FrontendError::InvalidDuration { index, value });
    }

    match (durations.is_empty(), target) {
        (true, 0) => return Ok(Vec::new()),
        (true, _) | (false, 0) => {
            return Err(FrontendError::DurationMismatch {
                durations: durations.len(),
                target: target as usize,
            })
        }
        _ => {}
    }

    let weights = relative_weights(durations);
    let scale = f64::from(target) / weights.iter().sum::<f64>();
    let mut frames: Vec<u32> = weights.iter().map(|w| (w * scale).round() as u32).collect();

    let assigned: i64 = frames.iter().map(|&f| i64::from(f)).sum();
    let diff = i64::from(target) - assigned;

    if diff != 0 {
        // Stable sort: ties keep input order.
        let mut ranked: Vec<usize> = (0..frames.len()).collect();
        ranked.sort_by_key(|&i| Reverse(frames[i]));

        for &i in ranked.iter().take(diff.unsigned_abs() as usize) {
            if diff > 0 {
                frames[i] += 1;
            } else {
                frames[i] -= 1;
            }
        }
        log::debug!("settled a rounding difference of {diff} frames");
    }

    let total: u64 = frames.iter().map(|&f| u64::from(f)).sum();
    assert_eq!(total, u64::from(target), "frame counts must sum to the target");
    Ok(frames)
}

/// Durations divided by the longest one, so their sum lies in `[1, n]`
/// whatever the magnitude of the input.
fn relative_weights(durations: &[f64]) -> Vec<f64> {
    let longest = durations.iter().copied().fold(0.0, f64::max);
    durations.iter().map(|d| d / longest).collect()
}

/// Symbols and durations of one aligned utterance.
///
/// The plan always starts and ends with a pause; missing ones are added with
/// [`PLACEHOLDER_PAUSE_DURATION`].
#[derive(Debug, Clone, PartialEq)]
pub struct DurationPlan {
    symbols: Vec<String>,
    durations: Vec<f64>,
}

impl DurationPlan {
    /// Parse space-separated `symbol_duration` tokens, e.g. `"o_0.12 l_0.08"`.
    ///
    /// The last `_` separates symbol and duration, so the silence token
    /// `_SIL__0.3` is accepted (and stored as the pause symbol).
    pub fn from_alignment(alignment: &str) -> Result<Self> {
        let mut symbols = Vec::new();
        let mut durations = Vec::new();

        for token in alignment.split_whitespace() {
            let malformed = || FrontendError::MalformedAlignment(token.to_string());
            let (symbol, duration) = token.rsplit_once('_').ok_or_else(malformed)?;
            if symbol.is_empty() {
                return Err(malformed());
            }
            let duration: f64 = duration.parse().map_err(|_| malformed())?;

            symbols.push(if symbol == SILENCE_TOKEN {
                PAUSE_SYMBOL.to_string()
            } else {
                symbol.to_string()
            });
            durations.push(duration);
        }

        let pause = PAUSE_SYMBOL.to_string();
        if symbols.first() != Some(&pause) {
            symbols.insert(0, pause.clone());
            durations.insert(0, PLACEHOLDER_PAUSE_DURATION);
        }
        if symbols.last() != Some(&pause) {
            symbols.push(pause);
            durations.push(PLACEHOLDER_PAUSE_DURATION);
        }

        Ok(Self { symbols, durations })
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn durations(&self) -> &[f64] {
        &self.durations
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Frame count per symbol, see [`align`].
    pub fn frames(&self, target: u32) -> Result<Vec<u32>> {
        align(&self.durations, target)
    }

    /// Symbol ids and frame counts, index for index.
    ///
    /// Symbols rejected by a strict table are dropped together with their
    /// duration before the frames are distributed.
    pub fn encode(&self, table: &SymbolTable, target: u32) -> Result<(Vec<i64>, Vec<u32>)> {
        let mut ids = Vec::with_capacity(self.len());
        let mut durations = Vec::with_capacity(self.len());

        for (symbol, &duration) in self.symbols.iter().zip(&self.durations) {
            match table.id_of(symbol) {
                Ok(id) => {
                    ids.push(id);
                    durations.push(duration);
                }
                Err(e) => log::warn!("{e}; dropping it from the alignment"),
            }
        }

        let frames = align(&durations, target)?;
        Ok((ids, frames))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
