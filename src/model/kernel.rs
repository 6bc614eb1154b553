//! Nadaraya-Watson smoother over the first side-information coordinate and |W|.
//!
//! P(+ | u, |W|) is estimated as a Gaussian-kernel weighted average of the
//! revealed labels, shrunk toward the overall positive rate with a pseudo-count
//! so sparse regions do not produce extreme scores.

use super::{check_samples, RankingModel};
use crate::error::ModelFitError;
use crate::statistics::interquartile_range;
use crate::types::LabeledSample;

/// Kernel smoother ranking model.
#[derive(Debug, Clone)]
pub struct KernelSmoother {
    prior_weight: f64,
    bandwidth_scale: f64,
    fitted: Option<FittedKernel>,
}

#[derive(Debug, Clone)]
struct FittedKernel {
    side: Vec<f64>,
    magnitude: Vec<f64>,
    labels: Vec<f64>,
    /// `None` when the axis has no spread and is ignored.
    bandwidth_side: Option<f64>,
    bandwidth_magnitude: Option<f64>,
    base_rate: f64,
}

impl Default for KernelSmoother {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelSmoother {
    /// Silverman bandwidths, one pseudo-observation of shrinkage.
    pub fn new() -> Self {
        Self {
            prior_weight: 1.0,
            bandwidth_scale: 1.0,
            fitted: None,
        }
    }

    /// Multiply both Silverman bandwidths by `scale`.
    pub fn bandwidth_scale(mut self, scale: f64) -> Self {
        self.bandwidth_scale = if scale > 0.0 { scale } else { 1.0 };
        self
    }

    /// Pseudo-count pulling estimates toward the positive rate.
    pub fn prior_weight(mut self, weight: f64) -> Self {
        self.prior_weight = weight.max(0.0);
        self
    }

    /// Fitted `(side, magnitude)` bandwidths.
    pub fn bandwidths(&self) -> Option<(Option<f64>, Option<f64>)> {
        self.fitted
            .as_ref()
            .map(|f| (f.bandwidth_side, f.bandwidth_magnitude))
    }
}

/// Silverman's rule of thumb: 0.9 * min(sd, IQR / 1.34) * n^(-1/5).
fn silverman(values: &[f64]) -> Option<f64> {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sd = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    let iqr = interquartile_range(values) / 1.34;
    let spread = if iqr > 0.0 { sd.min(iqr) } else { sd };
    (spread > 1e-12).then(|| 0.9 * spread * n.powf(-0.2))
}

#[inline]
fn gaussian(delta: f64, bandwidth: Option<f64>) -> f64 {
    match bandwidth {
        Some(h) => {
            let z = delta / h;
            (-0.5 * z * z).exp()
        }
        None => 1.0,
    }
}

impl RankingModel for KernelSmoother {
    fn name(&self) -> &'static str {
        "kernel"
    }

    fn fit(&mut self, samples: &[LabeledSample<'_>]) -> Result<(), ModelFitError> {
        let positives = check_samples(samples, 3)?;

        let side: Vec<f64> = samples
            .iter()
            .map(|s| s.side_info.first().copied().unwrap_or(0.0))
            .collect();
        let magnitude: Vec<f64> = samples.iter().map(|s| s.magnitude).collect();
        let labels: Vec<f64> = samples.iter().map(LabeledSample::label).collect();

        let scale = self.bandwidth_scale;
        self.fitted = Some(FittedKernel {
            bandwidth_side: silverman(&side).map(|h| h * scale),
            bandwidth_magnitude: silverman(&magnitude).map(|h| h * scale),
            base_rate: positives as f64 / samples.len() as f64,
            side,
            magnitude,
            labels,
        });
        Ok(())
    }

    fn score(&self, magnitude: f64, side_info: &[f64]) -> f64 {
        let Some(fitted) = &self.fitted else {
            return 0.0;
        };
        let u = side_info.first().copied().unwrap_or(0.0);

        let mut weight_sum = 0.0;
        let mut weighted_labels = 0.0;
        for ((&ui, &mi), &yi) in fitted
            .side
            .iter()
            .zip(&fitted.magnitude)
            .zip(&fitted.labels)
        {
            let w = gaussian(u - ui, fitted.bandwidth_side)
                * gaussian(magnitude - mi, fitted.bandwidth_magnitude);
            weight_sum += w;
            weighted_labels += w * yi;
        }

        (weighted_labels + self.prior_weight * fitted.base_rate)
            / (weight_sum + self.prior_weight).max(f64::MIN_POSITIVE)
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}
