//! Target-level and refit-cadence checks.

use serde::{Deserialize, Serialize};

/// Warning about what the requested run can achieve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LevelWarning {
    /// No prefix can reach `alpha` even if every positive is revealed first.
    UnreachableLevel {
        /// Target level.
        alpha: f64,
        /// Positives needed before `offset / positives <= alpha`.
        required: usize,
        /// Positive statistics in the input.
        available: usize,
    },

    /// Fewer hypotheses than `min_labels_for_fit`; the model is never fitted.
    ModelNeverFitted {
        /// Number of hypotheses.
        p: usize,
        /// Configured label threshold.
        min_labels: usize,
    },
}

impl LevelWarning {
    /// Get a human-readable description of the warning.
    pub fn description(&self) -> String {
        match self {
            LevelWarning::UnreachableLevel {
                alpha,
                required,
                available,
            } => format!(
                "Target level {} needs at least {} positive statistics, only {} \
                 available; its rejection set will be empty.",
                alpha, required, available
            ),
            LevelWarning::ModelNeverFitted { p, min_labels } => format!(
                "Only {} hypotheses but min_labels_for_fit is {}; the reveal order \
                 comes from side information alone.",
                p, min_labels
            ),
        }
    }
}

/// Flag levels below the smallest achievable FDP estimate.
pub fn reachability_check(statistics: &[f64], levels: &[f64], offset: u32) -> Vec<LevelWarning> {
    if offset == 0 {
        return Vec::new();
    }
    let available = statistics.iter().filter(|&&w| w > 0.0).count();
    levels
        .iter()
        .filter_map(|&alpha| {
            let required = (offset as f64 / alpha).ceil() as usize;
            (available < required).then_some(LevelWarning::UnreachableLevel {
                alpha,
                required,
                available,
            })
        })
        .collect()
}

/// Flag runs too short for the model to ever be fitted.
pub fn cadence_check(p: usize, min_labels_for_fit: usize) -> Option<LevelWarning> {
    (p > 0 && p < min_labels_for_fit).then_some(LevelWarning::ModelNeverFitted {
        p,
        min_labels: min_labels_for_fit,
    })
}
