//! Ranking models: estimate which masked hypotheses are most likely non-null.
//!
//! A model is trained on the revealed `(|W|, u, sign)` triples and scores the
//! masked `(|W|, u)` pairs; the engine reveals the highest score next. Any
//! type implementing [`RankingModel`] can drive the engine:
//!
//! 1. **Logistic** ([`LogisticModel`]): ridge-penalised GLM fitted by IRLS
//! 2. **Kernel** ([`KernelSmoother`]): Nadaraya-Watson smoother on a 1-D side-information axis
//! 3. **Forest** ([`RandomForest`]): bagged classification trees for multi-dimensional side information

mod forest;
mod kernel;
mod logistic;

pub use forest::{ForestParams, RandomForest};
pub use kernel::KernelSmoother;
pub use logistic::LogisticModel;

use std::fmt;

use crate::config::ModelKind;
use crate::error::ModelFitError;
use crate::types::{LabeledSample, Sign};

/// Capability set required by the sequential engine.
pub trait RankingModel: Send + fmt::Debug {
    /// Short name used in logs and result metadata.
    fn name(&self) -> &'static str;

    /// Train on revealed samples only.
    ///
    /// Implementations must leave their previously fitted state untouched when
    /// returning `Err`, so a failed refit keeps the last good model in place.
    fn fit(&mut self, samples: &[LabeledSample<'_>]) -> Result<(), ModelFitError>;

    /// Estimated likelihood that a hypothesis is non-null; higher reveals sooner.
    fn score(&self, magnitude: f64, side_info: &[f64]) -> f64;

    /// Whether at least one `fit` has succeeded.
    fn is_fitted(&self) -> bool;

    /// Model-specific fit quality, recorded with each successful fit.
    fn fit_quality(&self) -> Option<f64> {
        None
    }
}

/// Instantiate a built-in model.
pub fn build_model(kind: ModelKind, seed: u64) -> Box<dyn RankingModel> {
    match kind {
        ModelKind::Logistic => Box::new(LogisticModel::new()),
        ModelKind::Kernel => Box::new(KernelSmoother::new()),
        ModelKind::Forest => Box::new(RandomForest::new(ForestParams {
            seed,
            ..ForestParams::default()
        })),
    }
}

/// Common preconditions: enough samples, both classes present, finite values.
///
/// Returns the number of positive labels.
pub(crate) fn check_samples(
    samples: &[LabeledSample<'_>],
    required: usize,
) -> Result<usize, ModelFitError> {
    if samples.len() < required {
        return Err(ModelFitError::TooFewSamples {
            available: samples.len(),
            required,
        });
    }
    if samples
        .iter()
        .any(|s| !s.magnitude.is_finite() || s.side_info.iter().any(|u| !u.is_finite()))
    {
        return Err(ModelFitError::NonFinite("training samples"));
    }
    let positives = samples.iter().filter(|s| s.positive).count();
    if positives == 0 || positives == samples.len() {
        return Err(ModelFitError::SingleClass {
            count: samples.len(),
            label: if positives == 0 {
                Sign::Negative
            } else {
                Sign::Positive
            },
        });
    }
    Ok(positives)
}

/// Logistic function.
#[inline]
pub(crate) fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}
