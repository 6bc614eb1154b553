//! Error types for the filter and its ranking models.

use thiserror::Error;

use crate::types::Sign;

/// Input or configuration error that aborts a run before any reveal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// `statistics` and `side_info` have different lengths.
    #[error("statistics has {statistics} entries but side information has {side_info}")]
    DimensionMismatch {
        /// Number of statistics supplied.
        statistics: usize,
        /// Number of side-information rows supplied.
        side_info: usize,
    },

    /// Side-information rows do not all have the same number of coordinates.
    #[error("side information for hypothesis {index} has {found} coordinates, expected {expected}")]
    RaggedSideInfo {
        /// First offending hypothesis.
        index: usize,
        /// Coordinates in the first row.
        expected: usize,
        /// Coordinates in the offending row.
        found: usize,
    },

    /// A statistic is NaN or infinite.
    #[error("statistic for hypothesis {index} is not finite ({value})")]
    NonFiniteStatistic {
        /// Offending hypothesis.
        index: usize,
        /// Offending value.
        value: f64,
    },

    /// A side-information coordinate is NaN or infinite.
    #[error("side information for hypothesis {index} is not finite")]
    NonFiniteSideInfo {
        /// Offending hypothesis.
        index: usize,
    },

    /// A target FDR level is outside (0, 1].
    #[error("target level {level} at position {position} is outside (0, 1]")]
    InvalidTargetLevel {
        /// Position in the caller's list.
        position: usize,
        /// Offending level.
        level: f64,
    },

    /// No target levels were requested.
    #[error("at least one target level is required")]
    EmptyTargetLevels,

    /// Configuration value out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failure of a ranking model's fit step.
///
/// Never surfaced to the caller of the filter: the engine keeps the previous
/// model version and records the failure in the run diagnostics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelFitError {
    /// Fewer labelled samples than the model needs.
    #[error("need at least {required} labelled samples, got {available}")]
    TooFewSamples {
        /// Samples available.
        available: usize,
        /// Samples required.
        required: usize,
    },

    /// Every revealed label has the same sign.
    #[error("all {count} revealed labels are {label}")]
    SingleClass {
        /// Number of labels.
        count: usize,
        /// The shared label.
        label: Sign,
    },

    /// Training data or fitted parameters contain NaN/infinite values.
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    /// The normal equations could not be factorised.
    #[error("linear system is singular")]
    SingularSystem,

    /// Iterative fit did not reach tolerance.
    #[error("no convergence after {iterations} iterations")]
    NotConverged {
        /// Iterations performed.
        iterations: usize,
    },
}
