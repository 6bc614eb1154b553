//! Cumulative sign counts along the reveal order and the admissible-prefix search.
//!
//! The counts are built once per run; every target level is then evaluated
//! against the same arrays with a single backward scan.

use crate::types::Sign;

/// Plug-in FDP estimate `(offset + neg) / max(pos, 1)`.
#[inline]
pub fn fdp_hat(pos: usize, neg: usize, offset: u32) -> f64 {
    (offset as f64 + neg as f64) / pos.max(1) as f64
}

/// Prefix sums of positive/negative signs; index `t` covers the first `t` reveals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CumulativeCounts {
    pos: Vec<usize>,
    neg: Vec<usize>,
}

impl CumulativeCounts {
    /// Build from revealed signs in reveal order.
    ///
    /// # Panics
    ///
    /// Panics on a masked sign; only revealed hypotheses belong in the order.
    pub fn from_signs<I>(signs: I) -> Self
    where
        I: IntoIterator<Item = Sign>,
    {
        let mut pos = vec![0];
        let mut neg = vec![0];
        for sign in signs {
            let (p, n) = (pos[pos.len() - 1], neg[neg.len() - 1]);
            match sign {
                Sign::Positive => {
                    pos.push(p + 1);
                    neg.push(n);
                }
                Sign::Negative => {
                    pos.push(p);
                    neg.push(n + 1);
                }
                Sign::Masked => panic!("masked sign in reveal order"),
            }
        }
        Self { pos, neg }
    }

    /// Number of revealed hypotheses covered.
    pub fn len(&self) -> usize {
        self.pos.len() - 1
    }

    /// True when nothing has been revealed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(pos, neg)` over the first `t` reveals.
    pub fn counts_at(&self, t: usize) -> (usize, usize) {
        (self.pos[t], self.neg[t])
    }

    /// FDP estimate over the first `t` reveals.
    pub fn fdp_hat_at(&self, t: usize, offset: u32) -> f64 {
        fdp_hat(self.pos[t], self.neg[t], offset)
    }

    /// Longest prefix `t` with `fdp_hat(t) <= alpha`, scanning `t = len, ..., 0`.
    ///
    /// The estimate is not monotone in `t`, so the scan cannot stop early
    /// from the short end.
    pub fn longest_admissible(&self, alpha: f64, offset: u32) -> Option<usize> {
        (0..=self.len())
            .rev()
            .find(|&t| self.fdp_hat_at(t, offset) <= alpha)
    }
}

/// True when no prefix longer than the current one can reach `alpha`.
///
/// Any future prefix has at least `neg` negatives and at most
/// `pos + remaining` positives, which bounds its estimate from below.
pub fn no_longer_prefix_admissible(
    pos: usize,
    neg: usize,
    remaining: usize,
    alpha: f64,
    offset: u32,
) -> bool {
    remaining == 0 || fdp_hat(pos + remaining, neg, offset) > alpha
}
