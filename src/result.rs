//! Filter result types and related structures.

use serde::{Deserialize, Serialize};

/// Complete result of one adaptive knockoff run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterResult {
    /// One entry per requested target level, in the caller's order.
    pub levels: Vec<LevelRejection>,

    /// Realized reveal order (original indices).
    pub reveal_order: Vec<usize>,

    /// Number of hypotheses p.
    pub num_hypotheses: usize,

    /// Positive signs among revealed hypotheses.
    pub pos_count: usize,

    /// Negative (or zero) signs among revealed hypotheses.
    pub neg_count: usize,

    /// Why the reveal loop ended.
    pub stop_reason: StopReason,

    /// Per-step traces, fit history and warnings.
    pub diagnostics: Diagnostics,

    /// Metadata for debugging.
    pub metadata: Metadata,
}

/// Rejection set for a single target FDR level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelRejection {
    /// Target FDR level α.
    pub alpha: f64,

    /// Rejected hypotheses, ascending original index.
    pub rejections: Vec<usize>,

    /// `rejections.len()`.
    pub count: usize,

    /// Length of the longest admissible prefix (0 when none is admissible).
    pub prefix_len: usize,

    /// False when no prefix, not even the empty one, reaches α.
    pub admissible: bool,

    /// FDP estimate at `prefix_len`.
    pub fdp_hat: f64,
}

/// Why the reveal loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Every hypothesis was revealed.
    Exhausted,
    /// No longer prefix could be admissible at any requested level.
    EarlyStop,
    /// Stopped before completion; rejection sets cover the revealed prefix only.
    Cancelled {
        /// What triggered the stop.
        reason: CancelReason,
    },
}

/// Source of a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// A [`CancellationToken`](crate::CancellationToken) was triggered.
    Requested,
    /// `max_duration_ms` elapsed.
    DeadlineExceeded,
}

impl StopReason {
    /// True when the loop stopped on its own (exhausted or early stop).
    pub fn is_complete(&self) -> bool {
        !matches!(self, StopReason::Cancelled { .. })
    }
}

/// Diagnostic data for plotting and debugging refit cadence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// FDP estimate after each reveal (empty when tracing is off).
    pub fdp_trace: Vec<f64>,

    /// Model version in effect after each reveal (empty when tracing is off).
    pub model_version_trace: Vec<u64>,

    /// Every refit attempt, successful or not.
    pub fit_events: Vec<FitEvent>,

    /// Number of failed refits.
    pub fit_failures: usize,

    /// Human-readable warnings (empty if preflight found nothing).
    pub warnings: Vec<String>,
}

impl Diagnostics {
    /// True when every refit succeeded and there are no warnings.
    pub fn all_checks_passed(&self) -> bool {
        self.fit_failures == 0 && self.warnings.is_empty()
    }
}

/// One refit attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitEvent {
    /// Revealed labels available to the fit.
    pub labels: usize,
    /// Model version after the attempt.
    pub model_version: u64,
    /// What happened.
    pub outcome: FitOutcome,
}

/// Result of a refit attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FitOutcome {
    /// The model was replaced.
    Fitted {
        /// Model-specific quality (e.g. out-of-bag accuracy), if reported.
        quality: Option<f64>,
    },
    /// The previous model was kept.
    Failed {
        /// Error message from the model.
        reason: String,
    },
}

/// Metadata for debugging and analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Ranking model name.
    pub model: String,
    /// Successful refits.
    pub model_version: u64,
    /// Configured refit cadence.
    pub refit_every_k_reveals: usize,
    /// Configured label threshold for the first fit.
    pub min_labels_for_fit: usize,
    /// FDP estimate offset (1 = knockoff+).
    pub offset: u32,
    /// Effective seed.
    pub seed: u64,
    /// Side-information dimension.
    pub side_info_dim: usize,
    /// Threads in the shared fit pool (1 if no parallel fit has run).
    pub fit_threads: usize,
    /// Total runtime in seconds.
    pub runtime_secs: f64,
}

impl FilterResult {
    /// Rejection set at `alpha`, if that level was requested.
    pub fn rejections_at(&self, alpha: f64) -> Option<&[usize]> {
        self.levels
            .iter()
            .find(|l| l.alpha == alpha)
            .map(|l| l.rejections.as_slice())
    }

    /// Requested levels whose rejection set contains `index`.
    pub fn levels_rejecting(&self, index: usize) -> Vec<f64> {
        self.levels
            .iter()
            .filter(|l| l.rejections.binary_search(&index).is_ok())
            .map(|l| l.alpha)
            .collect()
    }

    /// Check that rejection sets grow with α.
    pub fn is_nested(&self) -> bool {
        let mut sorted: Vec<&LevelRejection> = self.levels.iter().collect();
        sorted.sort_by(|a, b| a.alpha.total_cmp(&b.alpha));
        sorted.windows(2).all(|pair| {
            pair[0]
                .rejections
                .iter()
                .all(|i| pair[1].rejections.binary_search(i).is_ok())
        })
    }

    /// Hypotheses revealed before the loop stopped.
    pub fn revealed(&self) -> usize {
        self.reveal_order.len()
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Top-level outcome of a run.
///
/// A cancelled run still carries rejection sets, computed from the prefix
/// revealed before cancellation, but they are marked incomplete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// The reveal loop finished.
    Completed(FilterResult),
    /// Cancellation was observed; the result is partial.
    Cancelled(FilterResult),
}

impl Outcome {
    /// True for [`Outcome::Completed`].
    pub fn is_complete(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    /// The result, complete or partial.
    pub fn result(&self) -> &FilterResult {
        match self {
            Outcome::Completed(result) | Outcome::Cancelled(result) => result,
        }
    }

    /// Consume into the result, complete or partial.
    pub fn into_result(self) -> FilterResult {
        match self {
            Outcome::Completed(result) | Outcome::Cancelled(result) => result,
        }
    }

    /// Returns the result if completed, `None` if cancelled.
    pub fn completed(self) -> Option<FilterResult> {
        match self {
            Outcome::Completed(result) => Some(result),
            Outcome::Cancelled(_) => None,
        }
    }

    /// Unwrap a completed result, panicking if cancelled.
    pub fn unwrap_completed(self) -> FilterResult {
        match self {
            Outcome::Completed(result) => result,
            Outcome::Cancelled(result) => panic!(
                "run was cancelled after {} of {} reveals",
                result.revealed(),
                result.num_hypotheses
            ),
        }
    }
}
