//! Mirror-mask registry: magnitude/sign decomposition and reveal state.
//!
//! Every hypothesis starts with its magnitude |W_j| and side information
//! visible and its sign masked. Revealing a hypothesis fixes its sign for the
//! rest of the run and appends it to the reveal order. The running
//! positive/negative counts are only ever touched by [`MaskRegistry::reveal`],
//! so `pos_count + neg_count == order.len()` holds at every point.

use serde::{Deserialize, Serialize};

use crate::engine::prefix::CumulativeCounts;
use crate::error::FilterError;
use crate::types::{LabeledSample, Sign};

/// One feature's null hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    /// Original feature index.
    pub index: usize,
    /// Raw knockoff statistic W_j.
    statistic: f64,
    /// |W_j|.
    pub magnitude: f64,
    /// Current sign state.
    sign: Sign,
    /// Side information u_j.
    pub side_info: Vec<f64>,
}

impl Hypothesis {
    /// Current sign, [`Sign::Masked`] until revealed.
    pub fn sign(&self) -> Sign {
        self.sign
    }

    /// Whether the sign has been revealed.
    pub fn is_revealed(&self) -> bool {
        self.sign != Sign::Masked
    }

    /// Key used by the side-information fallback order.
    pub fn side_key(&self) -> f64 {
        self.side_info.first().copied().unwrap_or(0.0)
    }
}

/// Per-run reveal bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealState {
    /// Revealed indices in reveal order.
    pub order: Vec<usize>,
    /// Revealed positive signs.
    pub pos_count: usize,
    /// Revealed negative signs (zeros included).
    pub neg_count: usize,
    /// Successful model refits so far.
    pub model_version: u64,
}

/// Owner of all hypotheses for one run.
#[derive(Debug, Clone)]
pub struct MaskRegistry {
    hypotheses: Vec<Hypothesis>,
    state: RevealState,
}

impl MaskRegistry {
    /// Build the registry from index-aligned statistics and side information.
    ///
    /// `p = 0` is valid and yields an empty registry.
    pub fn initialize<S: AsRef<[f64]>>(
        statistics: &[f64],
        side_info: &[S],
    ) -> Result<Self, FilterError> {
        if statistics.len() != side_info.len() {
            return Err(FilterError::DimensionMismatch {
                statistics: statistics.len(),
                side_info: side_info.len(),
            });
        }

        let dim = side_info.first().map_or(0, |row| row.as_ref().len());
        let mut hypotheses = Vec::with_capacity(statistics.len());

        for (index, (&w, row)) in statistics.iter().zip(side_info).enumerate() {
            let row = row.as_ref();
            if !w.is_finite() {
                return Err(FilterError::NonFiniteStatistic { index, value: w });
            }
            if row.len() != dim {
                return Err(FilterError::RaggedSideInfo {
                    index,
                    expected: dim,
                    found: row.len(),
                });
            }
            if row.iter().any(|u| !u.is_finite()) {
                return Err(FilterError::NonFiniteSideInfo { index });
            }
            hypotheses.push(Hypothesis {
                index,
                statistic: w,
                magnitude: w.abs(),
                sign: Sign::Masked,
                side_info: row.to_vec(),
            });
        }

        Ok(Self {
            hypotheses,
            state: RevealState {
                order: Vec::with_capacity(statistics.len()),
                ..RevealState::default()
            },
        })
    }

    /// Number of hypotheses p.
    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    /// True when p = 0.
    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }

    /// Side-information dimension (0 for an empty registry).
    pub fn side_info_dim(&self) -> usize {
        self.hypotheses.first().map_or(0, |h| h.side_info.len())
    }

    /// Hypothesis by original index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn hypothesis(&self, index: usize) -> &Hypothesis {
        &self.hypotheses[index]
    }

    /// All hypotheses in index order.
    pub fn hypotheses(&self) -> &[Hypothesis] {
        &self.hypotheses
    }

    /// Reveal bookkeeping.
    pub fn state(&self) -> &RevealState {
        &self.state
    }

    /// Hypotheses not yet revealed, in index order.
    pub fn unrevealed(&self) -> impl Iterator<Item = &Hypothesis> + '_ {
        self.hypotheses.iter().filter(|h| !h.is_revealed())
    }

    /// Number of hypotheses still masked.
    pub fn remaining(&self) -> usize {
        self.hypotheses.len() - self.state.order.len()
    }

    /// Reveal the sign of hypothesis `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range or already revealed; both are
    /// contract violations by the caller.
    pub fn reveal(&mut self, index: usize) -> Sign {
        let hypothesis = &mut self.hypotheses[index];
        assert!(
            !hypothesis.is_revealed(),
            "hypothesis {} already revealed",
            index
        );

        let sign = Sign::of_statistic(hypothesis.statistic);
        hypothesis.sign = sign;
        self.state.order.push(index);
        match sign {
            Sign::Positive => self.state.pos_count += 1,
            _ => self.state.neg_count += 1,
        }

        debug_assert_eq!(
            self.state.pos_count + self.state.neg_count,
            self.state.order.len()
        );
        sign
    }

    /// Record a successful model refit and return the new version.
    pub fn bump_model_version(&mut self) -> u64 {
        self.state.model_version += 1;
        self.state.model_version
    }

    /// Revealed hypotheses as training samples, in reveal order.
    pub fn revealed_samples(&self) -> Vec<LabeledSample<'_>> {
        self.state
            .order
            .iter()
            .map(|&i| {
                let h = &self.hypotheses[i];
                LabeledSample {
                    magnitude: h.magnitude,
                    side_info: &h.side_info,
                    positive: h.sign.is_positive(),
                }
            })
            .collect()
    }

    /// Prefix sums of revealed signs along the reveal order.
    pub fn cumulative_counts(&self) -> CumulativeCounts {
        CumulativeCounts::from_signs(self.state.order.iter().map(|&i| self.hypotheses[i].sign))
    }

    /// Consume the registry, keeping only the reveal bookkeeping.
    pub fn into_state(self) -> RevealState {
        self.state
    }
}
