//! Preflight checks run on the inputs before any sign is revealed.
//!
//! None of these checks is fatal; structural problems are rejected by
//! [`MaskRegistry::initialize`](crate::mask::MaskRegistry::initialize) instead.
//! The checks only look at magnitudes, positive counts and side information,
//! and their warnings never influence the reveal order.
//!
//! # Checks Performed
//!
//! - **Zero statistics**: large share of W_j exactly zero
//! - **Side information**: identical side information for every hypothesis
//! - **Reachability**: target levels no prefix can reach
//! - **Cadence**: fewer hypotheses than `min_labels_for_fit`

mod inputs;
mod levels;

pub use inputs::{side_info_check, zero_statistics_check, InputWarning};
pub use levels::{cadence_check, reachability_check, LevelWarning};

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Result of running all preflight checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreflightResult {
    /// Warnings about the statistics and side information.
    pub inputs: Vec<InputWarning>,

    /// Warnings about target levels and refit cadence.
    pub levels: Vec<LevelWarning>,
}

impl PreflightResult {
    /// Create a new empty preflight result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        self.count() > 0
    }

    /// Total number of warnings.
    pub fn count(&self) -> usize {
        self.inputs.len() + self.levels.len()
    }

    /// Human-readable descriptions of every warning.
    pub fn descriptions(&self) -> Vec<String> {
        self.inputs
            .iter()
            .map(InputWarning::description)
            .chain(self.levels.iter().map(LevelWarning::description))
            .collect()
    }
}

/// Run all preflight checks and collect warnings.
pub fn run_all_checks<S: AsRef<[f64]>>(
    statistics: &[f64],
    side_info: &[S],
    target_levels: &[f64],
    config: &Config,
) -> PreflightResult {
    let mut result = PreflightResult::new();

    result.inputs.extend(zero_statistics_check(statistics));
    result.inputs.extend(side_info_check(side_info));
    result
        .levels
        .extend(reachability_check(statistics, target_levels, config.offset));
    result
        .levels
        .extend(cadence_check(statistics.len(), config.min_labels_for_fit));

    result
}
