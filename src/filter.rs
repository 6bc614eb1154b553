//! Main `AdaptiveKnockoff` entry point and builder.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::assembler::assemble;
use crate::cancel::CancellationToken;
use crate::config::{Config, FallbackOrder, ModelKind, TieBreak};
use crate::engine::SequentialEngine;
use crate::error::FilterError;
use crate::mask::MaskRegistry;
use crate::model::{build_model, RankingModel};
use crate::preflight::run_all_checks;
use crate::result::{Outcome, StopReason};

/// Constructor for a user-supplied ranking model, called once per run.
pub type ModelFactory = Arc<dyn Fn() -> Box<dyn RankingModel> + Send + Sync>;

/// Main entry point for adaptive knockoff filtering.
///
/// Use the builder pattern to configure, then call [`run`](Self::run) with
/// the knockoff statistics, side information and target FDR levels.
///
/// # Example
///
/// ```
/// use adaptive_knockoff::AdaptiveKnockoff;
///
/// let statistics = [3.0, -1.0, 5.0, -2.0, 4.0, -0.5];
/// let side_info = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
///
/// let outcome = AdaptiveKnockoff::new()
///     .min_labels_for_fit(20)
///     .run_scalar(&statistics, &side_info, &[0.5, 1.0])
///     .unwrap();
///
/// let result = outcome.into_result();
/// assert!(result.rejections_at(0.5).unwrap().is_empty());
/// assert_eq!(result.rejections_at(1.0).unwrap(), &[0, 2, 4]);
/// ```
///
/// A filter is configuration only; every call to `run` builds its own
/// registry and model, so one filter can be shared across threads.
#[derive(Clone, Default)]
pub struct AdaptiveKnockoff {
    config: Config,
    model_factory: Option<ModelFactory>,
    cancel: Option<CancellationToken>,
}

impl fmt::Debug for AdaptiveKnockoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveKnockoff")
            .field("config", &self.config)
            .field("custom_model", &self.model_factory.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl AdaptiveKnockoff {
    /// Create with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from an explicit configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Refit after every reveal.
    ///
    /// The most adaptive order; cost grows with one fit per hypothesis.
    pub fn thorough() -> Self {
        Self::with_config(Config {
            refit_every_k_reveals: 1,
            ..Config::default()
        })
    }

    /// Refit every 25 reveals with the logistic model.
    ///
    /// For large p where fit cost dominates.
    pub fn fast() -> Self {
        Self::with_config(Config {
            refit_every_k_reveals: 25,
            model: ModelKind::Logistic,
            ..Config::default()
        })
    }

    /// Random forest ranking, refit every 10 reveals.
    ///
    /// Suited to multi-dimensional side information.
    pub fn forest() -> Self {
        Self::with_config(Config {
            refit_every_k_reveals: 10,
            model: ModelKind::Forest,
            ..Config::default()
        })
    }

    /// Default configuration with `AKF_*` environment overrides applied.
    ///
    /// See [`Config::apply_overrides`] for the recognised variables.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        Self::with_config(config)
    }

    /// Set reveals between model refits.
    pub fn refit_every_k_reveals(mut self, k: usize) -> Self {
        self.config.refit_every_k_reveals = k;
        self
    }

    /// Set labels required before the first fit.
    pub fn min_labels_for_fit(mut self, n: usize) -> Self {
        self.config.min_labels_for_fit = n;
        self
    }

    /// Set the side-information fallback order.
    pub fn fallback_order(mut self, order: FallbackOrder) -> Self {
        self.config.fallback_order = order;
        self
    }

    /// Allow stopping once no longer prefix can be admissible.
    pub fn allow_early_stop(mut self, allow: bool) -> Self {
        self.config.allow_early_stop = allow;
        self
    }

    /// Set the tie-break rule.
    pub fn tie_break(mut self, rule: TieBreak) -> Self {
        self.config.tie_break = rule;
        self
    }

    /// Set the FDP estimate offset (1 = knockoff+, 0 = knockoff).
    pub fn offset(mut self, offset: u32) -> Self {
        self.config.offset = offset;
        self
    }

    /// Select a built-in ranking model.
    pub fn model(mut self, kind: ModelKind) -> Self {
        self.config.model = kind;
        self.model_factory = None;
        self
    }

    /// Use a custom ranking model; `factory` is called once per run.
    pub fn model_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn RankingModel> + Send + Sync + 'static,
    {
        self.model_factory = Some(Arc::new(factory));
        self
    }

    /// Set deterministic seed for model-internal randomness.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Set maximum duration guardrail (milliseconds).
    pub fn max_duration_ms(mut self, ms: u64) -> Self {
        self.config.max_duration_ms = Some(ms);
        self
    }

    /// Record per-step traces in the diagnostics.
    pub fn record_trace(mut self, record: bool) -> Self {
        self.config.record_trace = record;
        self
    }

    /// Observe `token` once per reveal step.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn build_model(&self) -> Box<dyn RankingModel> {
        match &self.model_factory {
            Some(factory) => factory(),
            None => build_model(self.config.model, self.config.seed_or_default()),
        }
    }

    /// Run the filter.
    ///
    /// `statistics[j]` is the knockoff statistic W_j and `side_info[j]` its
    /// side-information vector; every row must have the same length.
    /// `target_levels` may list several FDR levels in any order; each must
    /// lie in (0, 1]. The rejection sets are nested across levels.
    ///
    /// # Errors
    ///
    /// Configuration, target-level and input errors are returned before any
    /// sign is revealed. Ranking-model failures are never returned; they are
    /// recorded in [`Diagnostics::fit_events`](crate::Diagnostics::fit_events).
    ///
    /// # Returns
    ///
    /// [`Outcome::Completed`], or [`Outcome::Cancelled`] with rejection sets
    /// computed from the prefix revealed before cancellation.
    pub fn run<S: AsRef<[f64]>>(
        &self,
        statistics: &[f64],
        side_info: &[S],
        target_levels: &[f64],
    ) -> Result<Outcome, FilterError> {
        let start = Instant::now();

        self.config.validate()?;
        validate_levels(target_levels)?;
        let registry = MaskRegistry::initialize(statistics, side_info)?;

        let preflight = run_all_checks(statistics, side_info, target_levels, &self.config);
        let warnings = preflight.descriptions();
        for warning in &warnings {
            log::warn!("preflight: {}", warning);
        }

        let model = self.build_model();
        log::debug!(
            "filtering {} hypotheses at {} level(s) with {} model, refit every {}",
            registry.len(),
            target_levels.len(),
            model.name(),
            self.config.refit_every_k_reveals
        );

        let deadline = self
            .config
            .max_duration_ms
            .map(|ms| start + Duration::from_millis(ms));
        let output = SequentialEngine::new(registry, model, &self.config, target_levels)
            .run(self.cancel.as_ref(), deadline);

        let mut result = assemble(output, target_levels, &self.config, warnings);
        result.metadata.runtime_secs = start.elapsed().as_secs_f64();

        log::info!(
            "revealed {}/{} hypotheses ({:?}), rejections per level: {:?}",
            result.revealed(),
            result.num_hypotheses,
            result.stop_reason,
            result.levels.iter().map(|l| (l.alpha, l.count)).collect::<Vec<_>>()
        );

        Ok(match result.stop_reason {
            StopReason::Cancelled { .. } => Outcome::Cancelled(result),
            StopReason::Exhausted | StopReason::EarlyStop => Outcome::Completed(result),
        })
    }

    /// Run with scalar side information.
    pub fn run_scalar(
        &self,
        statistics: &[f64],
        side_info: &[f64],
        target_levels: &[f64],
    ) -> Result<Outcome, FilterError> {
        let rows: Vec<[f64; 1]> = side_info.iter().map(|&u| [u]).collect();
        self.run(statistics, &rows, target_levels)
    }
}

/// Levels must be non-empty and each in (0, 1]; NaN is rejected.
fn validate_levels(levels: &[f64]) -> Result<(), FilterError> {
    if levels.is_empty() {
        return Err(FilterError::EmptyTargetLevels);
    }
    match levels
        .iter()
        .position(|&alpha| !(alpha > 0.0 && alpha <= 1.0))
    {
        Some(position) => Err(FilterError::InvalidTargetLevel {
            position,
            level: levels[position],
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_levels() {
        assert!(validate_levels(&[0.1, 1.0]).is_ok());
        assert_eq!(validate_levels(&[]), Err(FilterError::EmptyTargetLevels));
        assert!(matches!(
            validate_levels(&[0.1, 0.0]),
            Err(FilterError::InvalidTargetLevel { position: 1, .. })
        ));
        assert!(matches!(
            validate_levels(&[f64::NAN]),
            Err(FilterError::InvalidTargetLevel { position: 0, .. })
        ));
        assert!(validate_levels(&[1.5]).is_err());
    }

    #[test]
    fn test_presets() {
        assert_eq!(AdaptiveKnockoff::new().config(), &Config::default());
        assert_eq!(AdaptiveKnockoff::thorough().config().refit_every_k_reveals, 1);
        assert_eq!(AdaptiveKnockoff::fast().config().refit_every_k_reveals, 25);
        assert_eq!(AdaptiveKnockoff::forest().config().model, ModelKind::Forest);
    }

    #[test]
    fn test_errors_before_any_reveal() {
        let filter = AdaptiveKnockoff::new();
        assert!(matches!(
            filter.run_scalar(&[1.0, 2.0], &[0.0], &[0.1]),
            Err(FilterError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            filter.run_scalar(&[1.0], &[0.0], &[2.0]),
            Err(FilterError::InvalidTargetLevel { .. })
        ));
        assert!(matches!(
            AdaptiveKnockoff::new()
                .refit_every_k_reveals(0)
                .run_scalar(&[1.0], &[0.0], &[0.1]),
            Err(FilterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_debug_hides_factory() {
        let filter = AdaptiveKnockoff::new()
            .model_factory(|| Box::new(crate::model::KernelSmoother::new()));
        assert!(format!("{:?}", filter).contains("custom_model: true"));
    }
}
