//! Ridge-penalised logistic regression fitted by IRLS.
//!
//! Models logit P(sign = + | |W|, u) as a polynomial in each standardised
//! feature (no interactions). The ridge term keeps the Newton system
//! positive definite under separation, which is common early in the reveal
//! loop when only a handful of labels exist.

use nalgebra::Cholesky;

use super::{check_samples, sigmoid, RankingModel};
use crate::error::ModelFitError;
use crate::types::{feature_row, Coefficients, DesignMatrix, LabeledSample};

/// Probabilities are clamped away from 0/1 before forming IRLS weights.
const WEIGHT_FLOOR: f64 = 1e-10;

/// Largest per-coefficient Newton step.
const MAX_STEP: f64 = 5.0;

/// Logistic ranking model.
#[derive(Debug, Clone)]
pub struct LogisticModel {
    degree: usize,
    ridge: f64,
    max_iterations: usize,
    tolerance: f64,
    fitted: Option<FittedLogistic>,
}

#[derive(Debug, Clone)]
struct FittedLogistic {
    means: Vec<f64>,
    scales: Vec<f64>,
    coefficients: Coefficients,
    iterations: usize,
}

impl Default for LogisticModel {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticModel {
    /// Quadratic terms, ridge 1.0.
    pub fn new() -> Self {
        Self {
            degree: 2,
            ridge: 1.0,
            max_iterations: 50,
            tolerance: 1e-8,
            fitted: None,
        }
    }

    /// Polynomial degree per feature (minimum 1).
    pub fn degree(mut self, degree: usize) -> Self {
        self.degree = degree.max(1);
        self
    }

    /// Ridge penalty on non-intercept coefficients.
    pub fn ridge(mut self, lambda: f64) -> Self {
        self.ridge = lambda.max(0.0);
        self
    }

    /// Fitted coefficients (intercept first), if any.
    pub fn coefficients(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|f| f.coefficients.as_slice())
    }

    /// Newton iterations used by the last successful fit.
    pub fn iterations(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.iterations)
    }

    fn expand(&self, raw: &[f64], means: &[f64], scales: &[f64], out: &mut Vec<f64>) {
        out.clear();
        out.push(1.0);
        for ((&x, &mean), &scale) in raw.iter().zip(means).zip(scales) {
            let z = (x - mean) / scale;
            let mut power = 1.0;
            for _ in 0..self.degree {
                power *= z;
                out.push(power);
            }
        }
    }
}

impl RankingModel for LogisticModel {
    fn name(&self) -> &'static str {
        "logistic"
    }

    fn fit(&mut self, samples: &[LabeledSample<'_>]) -> Result<(), ModelFitError> {
        check_samples(samples, 2)?;

        let raw: Vec<Vec<f64>> = samples.iter().map(LabeledSample::features).collect();
        let d = raw[0].len();
        let n = raw.len();

        let mut means = vec![0.0; d];
        let mut scales = vec![1.0; d];
        for j in 0..d {
            let mean = raw.iter().map(|r| r[j]).sum::<f64>() / n as f64;
            let var = raw.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n as f64;
            means[j] = mean;
            // Constant columns become all-zero after centring; the ridge term handles them.
            scales[j] = if var > 1e-24 { var.sqrt() } else { 1.0 };
        }

        let mut row = Vec::new();
        let mut expanded = Vec::with_capacity(n);
        for r in &raw {
            self.expand(r, &means, &scales, &mut row);
            expanded.push(row.clone());
        }
        let k = expanded[0].len();

        let x = DesignMatrix::from_fn(n, k, |i, j| expanded[i][j]);
        let y = Coefficients::from_iterator(n, samples.iter().map(LabeledSample::label));
        let mut penalty = DesignMatrix::identity(k, k) * self.ridge;
        penalty[(0, 0)] = 0.0;

        let mut beta = Coefficients::zeros(k);
        for iteration in 1..=self.max_iterations {
            let mu = (&x * &beta).map(sigmoid);
            let weights = mu.map(|m| (m * (1.0 - m)).max(WEIGHT_FLOOR));
            let weighted = DesignMatrix::from_fn(n, k, |i, j| x[(i, j)] * weights[i]);

            let hessian = x.transpose() * &weighted + &penalty;
            let gradient = x.transpose() * (&y - &mu) - &penalty * &beta;

            let mut step = Cholesky::new(hessian)
                .ok_or(ModelFitError::SingularSystem)?
                .solve(&gradient);
            let largest = step.amax();
            if largest > MAX_STEP {
                step *= MAX_STEP / largest;
            }
            beta += &step;

            if beta.iter().any(|b| !b.is_finite()) {
                return Err(ModelFitError::NonFinite("logistic coefficients"));
            }
            if step.amax() < self.tolerance {
                self.fitted = Some(FittedLogistic {
                    means,
                    scales,
                    coefficients: beta,
                    iterations: iteration,
                });
                return Ok(());
            }
        }

        Err(ModelFitError::NotConverged {
            iterations: self.max_iterations,
        })
    }

    fn score(&self, magnitude: f64, side_info: &[f64]) -> f64 {
        let Some(fitted) = &self.fitted else {
            return 0.0;
        };
        let raw = feature_row(magnitude, side_info);
        let mut row = Vec::with_capacity(fitted.coefficients.len());
        self.expand(&raw, &fitted.means, &fitted.scales, &mut row);
        let eta: f64 = row
            .iter()
            .zip(fitted.coefficients.iter())
            .map(|(x, b)| x * b)
            .sum();
        sigmoid(eta)
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }
}
