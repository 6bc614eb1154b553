//! Input-shape checks.
//!
//! Statistics that are exactly zero always count as negative signs, and side
//! information with no spread leaves the fallback order to the tie-break rule.
//! Neither is an error, but both usually mean something upstream is off.

use serde::{Deserialize, Serialize};

/// Fraction of zero statistics above which a warning is raised.
const ZERO_FRACTION_THRESHOLD: f64 = 0.25;

/// Warning from the input checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputWarning {
    /// Many statistics are exactly zero.
    ManyZeroStatistics {
        /// Fraction of W_j equal to 0.
        fraction: f64,
    },

    /// Every hypothesis carries the same side information.
    UninformativeSideInfo {
        /// Number of hypotheses.
        p: usize,
    },
}

impl InputWarning {
    /// Get a human-readable description of the warning.
    pub fn description(&self) -> String {
        match self {
            InputWarning::ManyZeroStatistics { fraction } => format!(
                "{:.0}% of statistics are exactly zero; zeros count as negative signs \
                 and cannot be rejected.",
                fraction * 100.0
            ),
            InputWarning::UninformativeSideInfo { p } => format!(
                "Side information is identical for all {} hypotheses; the initial \
                 order falls back to index order.",
                p
            ),
        }
    }
}

/// Flag a large share of zero statistics.
pub fn zero_statistics_check(statistics: &[f64]) -> Option<InputWarning> {
    if statistics.is_empty() {
        return None;
    }
    let zeros = statistics.iter().filter(|&&w| w == 0.0).count();
    let fraction = zeros as f64 / statistics.len() as f64;
    (fraction > ZERO_FRACTION_THRESHOLD).then_some(InputWarning::ManyZeroStatistics { fraction })
}

/// Flag side information without any spread.
pub fn side_info_check<S: AsRef<[f64]>>(side_info: &[S]) -> Option<InputWarning> {
    let (first, rest) = side_info.split_first()?;
    if rest.is_empty() {
        return None;
    }
    let first = first.as_ref();
    rest.iter()
        .all(|row| row.as_ref() == first)
        .then_some(InputWarning::UninformativeSideInfo { p: side_info.len() })
}
