//! Type aliases and common types.

use std::fmt;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Dense design matrix (rows = samples, columns = features).
pub type DesignMatrix = DMatrix<f64>;

/// Dense column vector for coefficients, responses and weights.
pub type Coefficients = DVector<f64>;

/// Reveal state of a hypothesis's sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    /// Not yet revealed; only the magnitude is visible.
    Masked,
    /// Revealed with W_j > 0.
    Positive,
    /// Revealed with W_j <= 0.
    Negative,
}

impl Sign {
    /// Sign of a raw knockoff statistic. Exact zeros count as negative.
    pub fn of_statistic(w: f64) -> Self {
        if w > 0.0 {
            Sign::Positive
        } else {
            Sign::Negative
        }
    }

    /// True for [`Sign::Positive`].
    pub fn is_positive(self) -> bool {
        self == Sign::Positive
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sign::Masked => "masked",
            Sign::Positive => "positive",
            Sign::Negative => "negative",
        })
    }
}

/// One revealed hypothesis as seen by a ranking model's `fit`.
#[derive(Debug, Clone, Copy)]
pub struct LabeledSample<'a> {
    /// |W_j|.
    pub magnitude: f64,
    /// Side-information vector u_j.
    pub side_info: &'a [f64],
    /// True when the revealed sign is positive.
    pub positive: bool,
}

impl LabeledSample<'_> {
    /// Feature row `[|W|, u_1, ..., u_d]` shared by the ranking models.
    pub fn features(&self) -> Vec<f64> {
        feature_row(self.magnitude, self.side_info)
    }

    /// Label as 0.0 / 1.0.
    pub fn label(&self) -> f64 {
        if self.positive {
            1.0
        } else {
            0.0
        }
    }
}

/// Build the feature row `[|W|, u_1, ..., u_d]`.
pub fn feature_row(magnitude: f64, side_info: &[f64]) -> Vec<f64> {
    let mut row = Vec::with_capacity(side_info.len() + 1);
    row.push(magnitude);
    row.extend_from_slice(side_info);
    row
}
