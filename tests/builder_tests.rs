//! Builder, presets, environment overrides and pluggable models.

use adaptive_knockoff::helpers::Synthetic;
use adaptive_knockoff::{
    AdaptiveKnockoff, Config, FallbackOrder, FitOutcome, LabeledSample, ModelFitError, ModelKind,
    RankingModel,
};

/// Scores by magnitude alone and never fails.
#[derive(Debug, Default)]
struct MagnitudeModel {
    fitted: bool,
}

impl RankingModel for MagnitudeModel {
    fn name(&self) -> &'static str {
        "magnitude"
    }

    fn fit(&mut self, _samples: &[LabeledSample<'_>]) -> Result<(), ModelFitError> {
        self.fitted = true;
        Ok(())
    }

    fn score(&self, magnitude: f64, _side_info: &[f64]) -> f64 {
        magnitude
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn fit_quality(&self) -> Option<f64> {
        Some(1.0)
    }
}

/// Fails every other fit, starting with the first.
#[derive(Debug, Default)]
struct Flaky {
    attempts: usize,
    fitted: bool,
}

impl RankingModel for Flaky {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn fit(&mut self, samples: &[LabeledSample<'_>]) -> Result<(), ModelFitError> {
        self.attempts += 1;
        if self.attempts % 2 == 1 {
            return Err(ModelFitError::TooFewSamples {
                available: samples.len(),
                required: usize::MAX,
            });
        }
        self.fitted = true;
        Ok(())
    }

    fn score(&self, magnitude: f64, _side_info: &[f64]) -> f64 {
        magnitude
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

#[test]
fn builder_setters() {
    let filter = AdaptiveKnockoff::new()
        .refit_every_k_reveals(3)
        .min_labels_for_fit(15)
        .fallback_order(FallbackOrder::Descending)
        .allow_early_stop(true)
        .offset(0)
        .model(ModelKind::Kernel)
        .seed(9)
        .max_duration_ms(1_000)
        .record_trace(false);

    let config = filter.config();
    assert_eq!(config.refit_every_k_reveals, 3);
    assert_eq!(config.min_labels_for_fit, 15);
    assert_eq!(config.fallback_order, FallbackOrder::Descending);
    assert!(config.allow_early_stop);
    assert_eq!(config.offset, 0);
    assert_eq!(config.model, ModelKind::Kernel);
    assert_eq!(config.seed, Some(9));
    assert_eq!(config.max_duration_ms, Some(1_000));
    assert!(!config.record_trace);
}

#[test]
fn presets_differ_from_default() {
    let default = Config::default();
    assert_ne!(AdaptiveKnockoff::thorough().config(), &default);
    assert_ne!(AdaptiveKnockoff::fast().config(), &default);
    assert_eq!(AdaptiveKnockoff::forest().config().refit_every_k_reveals, 10);
    assert_eq!(AdaptiveKnockoff::fast().config().model, ModelKind::Logistic);
}

/// The only test in this binary that touches `AKF_*` variables.
#[test]
fn from_env_overrides() {
    std::env::set_var("AKF_REFIT_EVERY", "7");
    std::env::set_var("AKF_MODEL", "forest");
    std::env::set_var("AKF_FALLBACK_ORDER", "descending");
    std::env::set_var("AKF_SEED", "not-a-number");

    let filter = AdaptiveKnockoff::from_env();

    std::env::remove_var("AKF_REFIT_EVERY");
    std::env::remove_var("AKF_MODEL");
    std::env::remove_var("AKF_FALLBACK_ORDER");
    std::env::remove_var("AKF_SEED");

    let config = filter.config();
    assert_eq!(config.refit_every_k_reveals, 7);
    assert_eq!(config.model, ModelKind::Forest);
    assert_eq!(config.fallback_order, FallbackOrder::Descending);
    assert_eq!(config.seed, None);
}

#[test]
fn custom_model_drives_order() {
    let data = Synthetic::new(60).signals(10).generate(5);
    let result = AdaptiveKnockoff::new()
        .model_factory(|| Box::new(MagnitudeModel::default()))
        .run_scalar(&data.statistics, &data.side_info, &[0.2])
        .unwrap()
        .into_result();

    assert_eq!(result.metadata.model, "magnitude");
    assert!(result.metadata.model_version >= 1);
    assert!(result
        .diagnostics
        .fit_events
        .iter()
        .all(|e| e.outcome == FitOutcome::Fitted { quality: Some(1.0) }));

    // After the first fit at 10 labels, the rest is revealed by decreasing |W|.
    let tail: Vec<f64> = result.reveal_order[10..]
        .iter()
        .map(|&j| data.statistics[j].abs())
        .collect();
    let first_block = &tail[..5];
    assert!(first_block.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn failed_fits_keep_previous_version() {
    let data = Synthetic::new(50).signals(10).generate(6);
    let result = AdaptiveKnockoff::new()
        .min_labels_for_fit(10)
        .refit_every_k_reveals(5)
        .model_factory(|| Box::new(Flaky::default()))
        .run_scalar(&data.statistics, &data.side_info, &[0.2])
        .unwrap()
        .into_result();

    let events = &result.diagnostics.fit_events;
    // Attempts at 10, 15, ..., 45 labels.
    assert_eq!(events.len(), 8);
    assert_eq!(result.diagnostics.fit_failures, 4);
    assert_eq!(result.metadata.model_version, 4);
    assert!(matches!(events[0].outcome, FitOutcome::Failed { .. }));
    assert_eq!(events[0].model_version, 0);
    assert_eq!(events[1].model_version, 1);
    assert_eq!(events[2].model_version, 1);

    // Failure does not corrupt the accounting.
    assert_eq!(result.reveal_order.len(), 50);
    assert_eq!(result.pos_count + result.neg_count, 50);
    assert!(!result.diagnostics.all_checks_passed());
}

#[test]
fn filter_is_shareable_across_threads() {
    let filter = AdaptiveKnockoff::new();
    let handles: Vec<_> = (0..4)
        .map(|seed| {
            let filter = filter.clone();
            std::thread::spawn(move || {
                let data = Synthetic::new(80).signals(15).generate(seed);
                filter
                    .run_scalar(&data.statistics, &data.side_info, &[0.1])
                    .unwrap()
                    .into_result()
                    .reveal_order
                    .len()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 80);
    }
}
