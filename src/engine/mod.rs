//! Sequential rejection engine.
//!
//! Drives the reveal loop as a small state machine:
//!
//! ```text
//! Ranking ──► Revealing ──► Evaluating ──► Ranking ...
//!                                    └───► Done
//! ```
//!
//! - **Ranking**: rebuild the reveal queue if the model changed since the
//!   last ranking (side-information fallback until the first successful fit)
//! - **Revealing**: unmask the top-ranked hypothesis (ties to lowest index)
//! - **Evaluating**: record the running FDP estimate, decide whether to stop,
//!   and refit the model when the cadence is due
//!
//! Rejection sets are derived afterwards from the realized order by the
//! assembler, see [`prefix`].

pub mod prefix;
mod queue;

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::mask::MaskRegistry;
use crate::model::RankingModel;
use crate::result::{CancelReason, FitEvent, FitOutcome, StopReason};

use self::prefix::{fdp_hat, no_longer_prefix_admissible};
use self::queue::RevealQueue;

/// Engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// Scoring masked hypotheses.
    Ranking,
    /// Unmasking the top-ranked hypothesis.
    Revealing,
    /// Updating the estimate, stop checks and refit.
    Evaluating,
    /// Finished; see [`SequentialEngine::stop_reason`].
    Done,
}

/// Everything the assembler needs once the loop has finished.
#[derive(Debug)]
pub struct EngineOutput {
    /// Registry with final reveal state.
    pub registry: MaskRegistry,
    /// Why the loop ended.
    pub stop_reason: StopReason,
    /// FDP estimate after each reveal.
    pub fdp_trace: Vec<f64>,
    /// Model version in effect for each reveal.
    pub model_version_trace: Vec<u64>,
    /// Every fit attempt.
    pub fit_events: Vec<FitEvent>,
    /// Name of the ranking model.
    pub model_name: &'static str,
    /// Fit quality reported by the last successful fit.
    pub last_fit_quality: Option<f64>,
}

/// The reveal loop for one run.
#[derive(Debug)]
pub struct SequentialEngine<'a> {
    config: &'a Config,
    registry: MaskRegistry,
    model: Box<dyn RankingModel>,
    queue: RevealQueue,
    queue_version: Option<u64>,
    state: EngineState,
    stop_reason: Option<StopReason>,
    max_alpha: f64,
    labels_at_last_fit: Option<usize>,
    fdp_trace: Vec<f64>,
    model_version_trace: Vec<u64>,
    fit_events: Vec<FitEvent>,
    last_fit_quality: Option<f64>,
}

impl<'a> SequentialEngine<'a> {
    /// Prepare the loop. `target_levels` are only used for early stopping.
    pub fn new(
        registry: MaskRegistry,
        model: Box<dyn RankingModel>,
        config: &'a Config,
        target_levels: &[f64],
    ) -> Self {
        let max_alpha = target_levels
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let capacity = if config.record_trace { registry.len() } else { 0 };
        Self {
            config,
            registry,
            model,
            queue: RevealQueue::default(),
            queue_version: None,
            state: EngineState::Ranking,
            stop_reason: None,
            max_alpha,
            labels_at_last_fit: None,
            fdp_trace: Vec::with_capacity(capacity),
            model_version_trace: Vec::with_capacity(capacity),
            fit_events: Vec::new(),
            last_fit_quality: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Reveal bookkeeping so far.
    pub fn registry(&self) -> &MaskRegistry {
        &self.registry
    }

    /// Set once the engine reaches [`EngineState::Done`].
    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stop_reason.as_ref()
    }

    /// Advance one transition and return the new state.
    pub fn step(&mut self) -> EngineState {
        self.state = match self.state {
            EngineState::Ranking => self.rank(),
            EngineState::Revealing => self.reveal_next(),
            EngineState::Evaluating => self.evaluate(),
            EngineState::Done => EngineState::Done,
        };
        self.state
    }

    /// Run to completion, checking `cancel` and `deadline` once per reveal.
    pub fn run(mut self, cancel: Option<&CancellationToken>, deadline: Option<Instant>) -> EngineOutput {
        while self.state != EngineState::Done {
            if self.state == EngineState::Ranking {
                if let Some(reason) = check_cancelled(cancel, deadline) {
                    log::debug!(
                        "cancelled after {} of {} reveals: {:?}",
                        self.registry.state().order.len(),
                        self.registry.len(),
                        reason
                    );
                    self.finish(StopReason::Cancelled { reason });
                    break;
                }
            }
            self.step();
        }
        self.into_output()
    }

    /// Stop the loop with `reason`.
    fn finish(&mut self, reason: StopReason) {
        self.stop_reason = Some(reason);
        self.state = EngineState::Done;
    }

    fn into_output(self) -> EngineOutput {
        EngineOutput {
            registry: self.registry,
            stop_reason: self.stop_reason.unwrap_or(StopReason::Exhausted),
            fdp_trace: self.fdp_trace,
            model_version_trace: self.model_version_trace,
            fit_events: self.fit_events,
            model_name: self.model.name(),
            last_fit_quality: self.last_fit_quality,
        }
    }

    fn rank(&mut self) -> EngineState {
        if self.registry.remaining() == 0 {
            self.stop_reason = Some(StopReason::Exhausted);
            return EngineState::Done;
        }

        let version = self.registry.state().model_version;
        if self.queue_version != Some(version) {
            let model = &self.model;
            let fallback = self.config.fallback_order;
            if model.is_fitted() && version > 0 {
                self.queue.rebuild(&self.registry, self.config.tie_break, |h| {
                    model.score(h.magnitude, &h.side_info)
                });
            } else {
                self.queue.rebuild(&self.registry, self.config.tie_break, |h| {
                    fallback.score(h.side_key())
                });
            }
            self.queue_version = Some(version);
        }
        EngineState::Revealing
    }

    fn reveal_next(&mut self) -> EngineState {
        match self.queue.next(&self.registry) {
            Some(index) => {
                self.registry.reveal(index);
                EngineState::Evaluating
            }
            None => {
                // Queue drained without a refit; rank the rest again.
                self.queue_version = None;
                EngineState::Ranking
            }
        }
    }

    fn evaluate(&mut self) -> EngineState {
        let state = self.registry.state();
        let (pos, neg) = (state.pos_count, state.neg_count);
        let version = state.model_version;
        let revealed = state.order.len();
        let remaining = self.registry.remaining();

        if self.config.record_trace {
            self.fdp_trace.push(fdp_hat(pos, neg, self.config.offset));
            self.model_version_trace.push(version);
        }

        if remaining == 0 {
            self.stop_reason = Some(StopReason::Exhausted);
            return EngineState::Done;
        }

        if self.config.allow_early_stop
            && no_longer_prefix_admissible(pos, neg, remaining, self.max_alpha, self.config.offset)
        {
            log::debug!(
                "early stop after {} reveals: no longer prefix can reach alpha {}",
                revealed,
                self.max_alpha
            );
            self.stop_reason = Some(StopReason::EarlyStop);
            return EngineState::Done;
        }

        if self.refit_due(revealed) {
            self.refit(revealed);
        }
        EngineState::Ranking
    }

    fn refit_due(&self, labels: usize) -> bool {
        if labels < self.config.min_labels_for_fit {
            return false;
        }
        match self.labels_at_last_fit {
            None => true,
            Some(last) => labels - last >= self.config.refit_every_k_reveals,
        }
    }

    fn refit(&mut self, labels: usize) {
        self.labels_at_last_fit = Some(labels);
        let samples = self.registry.revealed_samples();
        let fitted = self.model.fit(&samples);
        drop(samples);

        match fitted {
            Ok(()) => {
                let version = self.registry.bump_model_version();
                let quality = self.model.fit_quality();
                self.last_fit_quality = quality;
                log::debug!(
                    "refit {} model on {} labels -> version {}",
                    self.model.name(),
                    labels,
                    version
                );
                self.fit_events.push(FitEvent {
                    labels,
                    model_version: version,
                    outcome: FitOutcome::Fitted { quality },
                });
            }
            Err(err) => {
                let version = self.registry.state().model_version;
                log::warn!(
                    "{} model fit failed on {} labels, keeping version {}: {}",
                    self.model.name(),
                    labels,
                    version,
                    err
                );
                self.fit_events.push(FitEvent {
                    labels,
                    model_version: version,
                    outcome: FitOutcome::Failed {
                        reason: err.to_string(),
                    },
                });
            }
        }
    }
}

fn check_cancelled(cancel: Option<&CancellationToken>, deadline: Option<Instant>) -> Option<CancelReason> {
    if cancel.is_some_and(CancellationToken::is_cancelled) {
        return Some(CancelReason::Requested);
    }
    if deadline.is_some_and(|d| Instant::now() >= d) {
        return Some(CancelReason::DeadlineExceeded);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelFitError;
    use crate::model::LogisticModel;
    use crate::types::LabeledSample;

    /// Model whose fit always fails.
    #[derive(Debug)]
    struct Broken;

    impl RankingModel for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn fit(&mut self, _: &[LabeledSample<'_>]) -> Result<(), ModelFitError> {
            Err(ModelFitError::SingularSystem)
        }
        fn score(&self, _: f64, _: &[f64]) -> f64 {
            0.0
        }
        fn is_fitted(&self) -> bool {
            false
        }
    }

    fn scenario() -> MaskRegistry {
        let stats = [3.0, -1.0, 5.0, -2.0, 4.0, -0.5];
        let side = [[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        MaskRegistry::initialize(&stats, &side).unwrap()
    }

    #[test]
    fn test_state_machine_transitions() {
        let config = Config {
            min_labels_for_fit: 100,
            ..Config::default()
        };
        let mut engine = SequentialEngine::new(scenario(), Box::new(LogisticModel::new()), &config, &[0.5]);
        assert_eq!(engine.state(), EngineState::Ranking);
        assert_eq!(engine.step(), EngineState::Revealing);
        assert_eq!(engine.step(), EngineState::Evaluating);
        assert_eq!(engine.registry().state().order, vec![0]);
        assert_eq!(engine.step(), EngineState::Ranking);

        while engine.step() != EngineState::Done {}
        assert_eq!(engine.stop_reason(), Some(&StopReason::Exhausted));
        assert_eq!(engine.step(), EngineState::Done);
    }

    #[test]
    fn test_fallback_orders() {
        let config = Config {
            min_labels_for_fit: 100,
            ..Config::default()
        };
        let out = SequentialEngine::new(scenario(), Box::new(LogisticModel::new()), &config, &[0.5]).run(None, None);
        assert_eq!(out.registry.state().order, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(out.fdp_trace.len(), 6);
        assert!((out.fdp_trace[5] - 4.0 / 3.0).abs() < 1e-12);

        let config = Config {
            fallback_order: crate::config::FallbackOrder::Descending,
            ..config
        };
        let out = SequentialEngine::new(scenario(), Box::new(LogisticModel::new()), &config, &[0.5]).run(None, None);
        assert_eq!(out.registry.state().order, vec![5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_fit_failures_recorded_and_loop_continues() {
        let config = Config {
            min_labels_for_fit: 2,
            refit_every_k_reveals: 2,
            ..Config::default()
        };
        let out = SequentialEngine::new(scenario(), Box::new(Broken), &config, &[0.5]).run(None, None);
        let state = out.registry.state();
        assert_eq!(state.order.len(), 6);
        assert_eq!(state.model_version, 0);
        assert_eq!(state.order, vec![0, 1, 2, 3, 4, 5]);
        // Fit attempts at 2 and 4 labels; the loop stops at 6.
        assert_eq!(out.fit_events.len(), 2);
        assert!(out
            .fit_events
            .iter()
            .all(|e| matches!(e.outcome, FitOutcome::Failed { .. })));
    }

    #[test]
    fn test_refit_cadence() {
        let stats: Vec<f64> = (0..40).map(|i| if i % 3 == 0 { -1.0 } else { 2.0 + i as f64 }).collect();
        let side: Vec<[f64; 1]> = (0..40).map(|i| [i as f64]).collect();
        let registry = MaskRegistry::initialize(&stats, &side).unwrap();
        let config = Config {
            min_labels_for_fit: 10,
            refit_every_k_reveals: 7,
            ..Config::default()
        };
        let out = SequentialEngine::new(registry, Box::new(LogisticModel::new()), &config, &[0.1]).run(None, None);
        let labels: Vec<usize> = out.fit_events.iter().map(|e| e.labels).collect();
        assert_eq!(labels, vec![10, 17, 24, 31, 38]);
        assert_eq!(out.registry.state().model_version, 5);
        assert_eq!(out.model_version_trace[9], 0);
        assert_eq!(out.model_version_trace[10], 1);
    }

    #[test]
    fn test_early_stop() {
        let config = Config {
            min_labels_for_fit: 100,
            allow_early_stop: true,
            ..Config::default()
        };
        let out = SequentialEngine::new(scenario(), Box::new(LogisticModel::new()), &config, &[0.5]).run(None, None);
        assert_eq!(out.stop_reason, StopReason::EarlyStop);
        // After 4 reveals: (1 + 2) / (2 + 2) = 0.75 > 0.5.
        assert_eq!(out.registry.state().order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_cancelled_before_first_reveal() {
        let config = Config::default();
        let token = CancellationToken::new();
        token.cancel();
        let out = SequentialEngine::new(scenario(), Box::new(LogisticModel::new()), &config, &[0.5])
            .run(Some(&token), None);
        assert_eq!(
            out.stop_reason,
            StopReason::Cancelled {
                reason: CancelReason::Requested
            }
        );
        assert!(out.registry.state().order.is_empty());
    }

    #[test]
    fn test_empty_registry_is_done_immediately() {
        let side: [[f64; 1]; 0] = [];
        let registry = MaskRegistry::initialize(&[], &side).unwrap();
        let config = Config::default();
        let mut engine = SequentialEngine::new(registry, Box::new(LogisticModel::new()), &config, &[0.1]);
        assert_eq!(engine.step(), EngineState::Done);
        assert_eq!(engine.stop_reason(), Some(&StopReason::Exhausted));
    }
}
