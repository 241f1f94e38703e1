//! Progress scraping for the external tool's output.
//!
//! The tool has no structured progress channel. Each phase prints text in
//! its own grammar, and the worker reads that text in arbitrary chunks:
//!
//! ```text
//! Separating:  " 45%|████▌     | 81/180 [00:12<00:14]"   -> 45
//! Chopping:    "chop 3/12"                              -> 25
//! ```
//!
//! Values are clamped to [`MID_PHASE_CEILING`] so a phase never reports
//! completion while its process is still finalizing. Only the orchestrator
//! emits 100, after the process exits.

use crate::models::Phase;

/// Highest value reported while a phase is still running.
pub const MID_PHASE_CEILING: f64 = 99.0;

/// A text grammar that yields a raw progress value.
pub trait ProgressGrammar: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Raw value found in `text`, before clamping.
    fn raw_value(&self, text: &str) -> Option<f64>;

    /// Parse a chunk of tool output into a clamped progress value.
    ///
    /// Invalid UTF-8 is decoded lossily. `None` means no update.
    fn parse(&self, chunk: &[u8]) -> Option<f64> {
        let text = String::from_utf8_lossy(chunk);
        self.raw_value(&text).map(clamp_mid_phase)
    }
}

/// First decimal integer immediately followed by `%`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentGrammar;

impl ProgressGrammar for PercentGrammar {
    fn name(&self) -> &'static str {
        "percent"
    }

    fn raw_value(&self, text: &str) -> Option<f64> {
        let (digits, _) = digit_runs(text).find(|(_, rest)| rest.starts_with('%'))?;
        digits.parse::<u64>().ok().map(|v| v as f64)
    }
}

/// First `<current>/<total>` pair, as a percentage.
#[derive(Debug, Clone, Copy, Default)]
pub struct FractionGrammar;

impl ProgressGrammar for FractionGrammar {
    fn name(&self) -> &'static str {
        "fraction"
    }

    fn raw_value(&self, text: &str) -> Option<f64> {
        let (current, total) = digit_runs(text).find_map(|(current, rest)| {
            let after_slash = rest.strip_prefix('/')?;
            let len = leading_digits(after_slash);
            (len > 0).then(|| (current, &after_slash[..len]))
        })?;

        let current = current.parse::<u64>().ok()? as f64;
        let total = total.parse::<u64>().ok()? as f64;
        if total == 0.0 {
            return None;
        }
        Some(100.0 * current / total)
    }
}

/// Grammar used while the pipeline is in `phase`.
///
/// Phases without a running process have no grammar.
pub fn grammar_for(phase: Phase) -> Option<&'static dyn ProgressGrammar> {
    match phase {
        Phase::Separating => Some(&PercentGrammar),
        Phase::Chopping => Some(&FractionGrammar),
        Phase::Idle | Phase::Finished | Phase::Failed => None,
    }
}

/// Parse a chunk of output for the given phase.
pub fn parse(phase: Phase, chunk: &[u8]) -> Option<f64> {
    grammar_for(phase)?.parse(chunk)
}

/// Clamp a raw value into `[0, MID_PHASE_CEILING]`.
pub fn clamp_mid_phase(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, MID_PHASE_CEILING)
}

/// Maximal runs of ASCII digits, each paired with the text that follows it.
fn digit_runs(text: &str) -> impl Iterator<Item = (&str, &str)> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    std::iter::from_fn(move || {
        while pos < bytes.len() && !bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos >= bytes.len() {
            return None;
        }
        let start = pos;
        pos += leading_digits(&text[start..]);
        Some((&text[start..pos], &text[pos..]))
    })
}

fn leading_digits(text: &str) -> usize {
    text.bytes().take_while(|b| b.is_ascii_digit()).count()
}
