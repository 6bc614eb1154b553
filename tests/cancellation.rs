//! Cooperative cancellation, the duration guardrail and early stopping.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use adaptive_knockoff::helpers::{null_statistics, Synthetic};
use adaptive_knockoff::{
    AdaptiveKnockoff, CancelReason, CancellationToken, LabeledSample, LogisticModel,
    ModelFitError, RankingModel, StopReason,
};

/// Logistic model that cancels a token after a fixed number of fits.
#[derive(Debug)]
struct CancelAfter {
    inner: LogisticModel,
    fits: Arc<AtomicUsize>,
    limit: usize,
    token: CancellationToken,
}

impl RankingModel for CancelAfter {
    fn name(&self) -> &'static str {
        "cancel-after"
    }

    fn fit(&mut self, samples: &[LabeledSample<'_>]) -> Result<(), ModelFitError> {
        if self.fits.fetch_add(1, Ordering::SeqCst) + 1 >= self.limit {
            self.token.cancel();
        }
        self.inner.fit(samples)
    }

    fn score(&self, magnitude: f64, side_info: &[f64]) -> f64 {
        self.inner.score(magnitude, side_info)
    }

    fn is_fitted(&self) -> bool {
        self.inner.is_fitted()
    }
}

#[test]
fn cancelled_before_first_reveal() {
    let data = Synthetic::new(50).generate(1);
    let token = CancellationToken::new();
    token.cancel();

    let outcome = AdaptiveKnockoff::new()
        .cancellation_token(token)
        .run_scalar(&data.statistics, &data.side_info, &[0.1])
        .unwrap();

    assert!(!outcome.is_complete());
    let result = outcome.result();
    assert_eq!(
        result.stop_reason,
        StopReason::Cancelled {
            reason: CancelReason::Requested
        }
    );
    assert!(result.reveal_order.is_empty());
    assert!(result.levels[0].rejections.is_empty());
    assert!(outcome.completed().is_none());
}

#[test]
fn cancelled_mid_run_keeps_consistent_prefix() {
    let data = Synthetic::new(80).signals(20).signal_mean(3.0).generate(2);
    let token = CancellationToken::new();
    let fits = Arc::new(AtomicUsize::new(0));

    let factory_token = token.clone();
    let factory_fits = Arc::clone(&fits);
    let outcome = AdaptiveKnockoff::new()
        .min_labels_for_fit(10)
        .refit_every_k_reveals(5)
        .cancellation_token(token)
        .model_factory(move || {
            Box::new(CancelAfter {
                inner: LogisticModel::new(),
                fits: Arc::clone(&factory_fits),
                limit: 3,
                token: factory_token.clone(),
            })
        })
        .run_scalar(&data.statistics, &data.side_info, &[0.1, 0.3])
        .unwrap();

    // Fits at 10, 15 and 20 labels; the third cancels before the next reveal.
    assert_eq!(fits.load(Ordering::SeqCst), 3);
    assert!(!outcome.is_complete());
    let result = outcome.into_result();
    assert_eq!(result.reveal_order.len(), 20);
    assert_eq!(result.pos_count + result.neg_count, 20);
    assert_eq!(result.diagnostics.fdp_trace.len(), 20);

    // Rejection sets come from the revealed prefix only.
    for level in &result.levels {
        assert!(level.prefix_len <= 20);
        assert!(level
            .rejections
            .iter()
            .all(|j| result.reveal_order.contains(j) && data.statistics[*j] > 0.0));
    }
    assert!(result.is_nested());
}

#[test]
fn zero_duration_guardrail() {
    let data = Synthetic::new(30).generate(3);
    let outcome = AdaptiveKnockoff::new()
        .max_duration_ms(0)
        .run_scalar(&data.statistics, &data.side_info, &[0.2])
        .unwrap();
    assert_eq!(
        outcome.result().stop_reason,
        StopReason::Cancelled {
            reason: CancelReason::DeadlineExceeded
        }
    );
}

#[test]
fn generous_guardrail_completes() {
    let data = Synthetic::new(30).generate(3);
    let outcome = AdaptiveKnockoff::new()
        .max_duration_ms(600_000)
        .run_scalar(&data.statistics, &data.side_info, &[0.2])
        .unwrap();
    assert!(outcome.is_complete());
    assert_eq!(outcome.result().reveal_order.len(), 30);
}

/// Early stopping shortens the run without changing any rejection set.
#[test]
fn early_stop_preserves_rejections() {
    let levels = [0.05, 0.1];
    for seed in 0..10 {
        let data = if seed % 2 == 0 {
            null_statistics(200, seed)
        } else {
            Synthetic::new(200).signals(30).signal_mean(3.0).generate(seed)
        };

        let full = AdaptiveKnockoff::new()
            .run_scalar(&data.statistics, &data.side_info, &levels)
            .unwrap()
            .into_result();
        let early = AdaptiveKnockoff::new()
            .allow_early_stop(true)
            .run_scalar(&data.statistics, &data.side_info, &levels)
            .unwrap();

        assert!(early.is_complete());
        let early = early.into_result();
        assert_eq!(early.levels, full.levels, "seed {}", seed);
        assert_eq!(
            early.reveal_order[..],
            full.reveal_order[..early.reveal_order.len()]
        );
        if early.stop_reason == StopReason::EarlyStop {
            assert!(early.reveal_order.len() < 200);
        }
    }

    // With only nulls the bound is crossed long before the end.
    let data = null_statistics(200, 42);
    let early = AdaptiveKnockoff::new()
        .allow_early_stop(true)
        .run_scalar(&data.statistics, &data.side_info, &levels)
        .unwrap()
        .into_result();
    assert_eq!(early.stop_reason, StopReason::EarlyStop);
}
