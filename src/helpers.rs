//! Synthetic knockoff statistics for tests, benches and simulations.
//!
//! Null statistics are drawn from a symmetric distribution, so their signs
//! are fair coins independent of magnitude, which is the property the filter
//! relies on. Signal statistics are shifted upward. Side information is the
//! normalized index `j / p`, and signals occupy the lowest indices, so the
//! default ascending fallback order is informative.
//!
//! # Example
//!
//! ```
//! use adaptive_knockoff::helpers::Synthetic;
//!
//! let data = Synthetic::new(100).signals(20).signal_mean(3.0).generate(1);
//! assert_eq!(data.statistics.len(), 100);
//! assert_eq!(data.is_signal.iter().filter(|&&s| s).count(), 20);
//! assert_eq!(data.realized_fdp(&[0, 1, 50]), 1.0 / 3.0);
//! ```

use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Generator settings for a synthetic problem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Synthetic {
    p: usize,
    signals: usize,
    signal_mean: f64,
    signal_sd: f64,
}

/// Generated statistics with the ground truth needed to score a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticData {
    /// Knockoff statistics W_j.
    pub statistics: Vec<f64>,
    /// Scalar side information u_j = j / p.
    pub side_info: Vec<f64>,
    /// True when hypothesis j is non-null.
    pub is_signal: Vec<bool>,
}

impl Synthetic {
    /// `p` hypotheses, 10% signals with mean 3.
    pub fn new(p: usize) -> Self {
        Self {
            p,
            signals: p / 10,
            signal_mean: 3.0,
            signal_sd: 1.0,
        }
    }

    /// Number of non-null hypotheses (clamped to `p`).
    pub fn signals(mut self, n: usize) -> Self {
        self.signals = n.min(self.p);
        self
    }

    /// Mean of signal statistics.
    pub fn signal_mean(mut self, mean: f64) -> Self {
        self.signal_mean = mean;
        self
    }

    /// Standard deviation of signal statistics.
    pub fn signal_sd(mut self, sd: f64) -> Self {
        self.signal_sd = sd.abs();
        self
    }

    /// Draw one problem instance.
    pub fn generate(&self, seed: u64) -> SyntheticData {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let p = self.p;
        let mut statistics = Vec::with_capacity(p);
        let mut is_signal = Vec::with_capacity(p);

        for j in 0..p {
            let z: f64 = rng.sample(StandardNormal);
            if j < self.signals {
                statistics.push(self.signal_mean + self.signal_sd * z);
                is_signal.push(true);
            } else {
                statistics.push(z);
                is_signal.push(false);
            }
        }

        SyntheticData {
            statistics,
            side_info: (0..p).map(|j| j as f64 / p as f64).collect(),
            is_signal,
        }
    }
}

impl SyntheticData {
    /// Fraction of `rejections` that are null (0 when nothing is rejected).
    ///
    /// # Panics
    ///
    /// Panics if a rejection is not a valid index into `is_signal`.
    pub fn realized_fdp(&self, rejections: &[usize]) -> f64 {
        if rejections.is_empty() {
            return 0.0;
        }
        let false_discoveries = rejections.iter().filter(|&&j| !self.is_signal[j]).count();
        false_discoveries as f64 / rejections.len() as f64
    }

    /// Fraction of signals found by `rejections` (0 when there are none).
    ///
    /// # Panics
    ///
    /// Panics if a rejection is not a valid index into `is_signal`.
    pub fn realized_power(&self, rejections: &[usize]) -> f64 {
        let total = self.is_signal.iter().filter(|&&s| s).count();
        if total == 0 {
            return 0.0;
        }
        let found = rejections.iter().filter(|&&j| self.is_signal[j]).count();
        found as f64 / total as f64
    }
}

/// `p` null statistics drawn from N(0, 1) with side information `j / p`.
pub fn null_statistics(p: usize, seed: u64) -> SyntheticData {
    Synthetic::new(p).signals(0).generate(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_for_seed() {
        let a = Synthetic::new(50).generate(3);
        let b = Synthetic::new(50).generate(3);
        let c = Synthetic::new(50).generate(4);
        assert_eq!(a, b);
        assert_ne!(a.statistics, c.statistics);
    }

    #[test]
    fn test_layout() {
        let data = Synthetic::new(10).signals(3).generate(1);
        assert_eq!(data.is_signal, {
            let mut v = vec![false; 10];
            v[..3].fill(true);
            v
        });
        assert_eq!(data.side_info[5], 0.5);
        assert_eq!(Synthetic::new(5).signals(9).generate(0).is_signal.iter().filter(|&&s| s).count(), 5);
    }

    #[test]
    fn test_null_signs_roughly_balanced() {
        let data = null_statistics(4000, 11);
        assert!(data.is_signal.iter().all(|&s| !s));
        let positives = data.statistics.iter().filter(|&&w| w > 0.0).count();
        assert!((1800..=2200).contains(&positives), "positives = {}", positives);
    }

    #[test]
    fn test_fdp_and_power() {
        let data = Synthetic::new(10).signals(4).generate(2);
        assert_eq!(data.realized_fdp(&[]), 0.0);
        assert_eq!(data.realized_fdp(&[0, 1, 8, 9]), 0.5);
        assert_eq!(data.realized_power(&[0, 1, 8, 9]), 0.5);
        assert_eq!(null_statistics(5, 0).realized_power(&[0]), 0.0);
    }

    #[test]
    #[should_panic]
    fn test_fdp_out_of_range_panics() {
        Synthetic::new(3).generate(0).realized_fdp(&[3]);
    }
}
