//! # adaptive-knockoff
//!
//! Adaptive knockoff filtering with side information.
//!
//! Given one knockoff statistic W_j per feature (positive when the original
//! feature looks more important than its knockoff) and side information u_j
//! correlated with which features are non-null, this crate selects features
//! while controlling the false discovery rate at one or several target levels:
//! - Signs are masked and revealed one hypothesis at a time
//! - A ranking model, refit on the revealed signs, picks what to reveal next
//! - Rejection sets are the positives in the longest prefix of the reveal
//!   order whose estimate `(offset + #neg) / max(#pos, 1)` is at most α
//! - All levels share one reveal order, so rejection sets are nested
//!
//! Computing knockoff copies and statistics is out of scope; bring your own W.
//!
//! ## Quick Start
//!
//! ```
//! use adaptive_knockoff::{filter, helpers::Synthetic};
//!
//! let data = Synthetic::new(200).signals(40).signal_mean(4.0).generate(7);
//! let outcome = filter(&data.statistics, &data.side_info, &[0.1, 0.2]).unwrap();
//!
//! let result = outcome.result();
//! assert!(result.is_nested());
//! println!("{} rejections at 0.1", result.levels[0].count);
//! ```
//!
//! ## Configuration
//!
//! ```
//! use adaptive_knockoff::{AdaptiveKnockoff, FallbackOrder};
//!
//! let filter = AdaptiveKnockoff::forest()
//!     .fallback_order(FallbackOrder::Descending)
//!     .allow_early_stop(true)
//!     .seed(7);
//! assert_eq!(filter.config().refit_every_k_reveals, 10);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod assembler;
mod cancel;
mod config;
mod filter;
mod result;
mod types;

// Functional modules
pub mod engine;
pub mod error;
pub mod helpers;
pub mod mask;
pub mod model;
pub mod output;
pub mod preflight;
pub mod statistics;
pub mod thread_pool;

// Re-exports for public API
pub use cancel::CancellationToken;
pub use config::{Config, FallbackOrder, ModelKind, TieBreak, DEFAULT_SEED};
pub use engine::{EngineState, SequentialEngine};
pub use error::{FilterError, ModelFitError};
pub use filter::{AdaptiveKnockoff, ModelFactory};
pub use mask::{Hypothesis, MaskRegistry, RevealState};
pub use model::{ForestParams, KernelSmoother, LogisticModel, RandomForest, RankingModel};
pub use result::{
    CancelReason, Diagnostics, FilterResult, FitEvent, FitOutcome, LevelRejection, Metadata,
    Outcome, StopReason,
};
pub use types::{LabeledSample, Sign};

/// Run the filter with default configuration.
///
/// `side_info` holds one scalar per hypothesis; use
/// [`AdaptiveKnockoff::run`] for vector side information.
///
/// # Errors
///
/// See [`AdaptiveKnockoff::run`].
pub fn filter(
    statistics: &[f64],
    side_info: &[f64],
    target_levels: &[f64],
) -> Result<Outcome, FilterError> {
    AdaptiveKnockoff::new().run_scalar(statistics, side_info, target_levels)
}
