//! Statistical building blocks shared by the ranking models.
//!
//! - Quantiles (R-7) for bandwidths and split thresholds
//! - Counter-seeded bootstrap resampling for bagging

mod bootstrap;
mod quantile;

pub use bootstrap::{bootstrap_indices, bootstrap_indices_into, counter_rng_seed, out_of_bag};
pub use quantile::{candidate_thresholds, interquartile_range, quantile_sorted};
