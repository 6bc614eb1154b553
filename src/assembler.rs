//! Result assembly: per-level rejection sets from the realized reveal order.
//!
//! Every level is evaluated against one [`CumulativeCounts`] built from the
//! same order, so the sets are nested in α by construction.

use crate::config::Config;
use crate::engine::prefix::CumulativeCounts;
use crate::engine::EngineOutput;
use crate::mask::MaskRegistry;
use crate::result::{Diagnostics, FilterResult, FitOutcome, LevelRejection, Metadata};

/// Rejection set for one level given the cumulative counts.
pub fn level_rejection(
    registry: &MaskRegistry,
    counts: &CumulativeCounts,
    alpha: f64,
    offset: u32,
) -> LevelRejection {
    let order = &registry.state().order;
    match counts.longest_admissible(alpha, offset) {
        Some(prefix_len) => {
            let mut rejections: Vec<usize> = order[..prefix_len]
                .iter()
                .copied()
                .filter(|&i| registry.hypothesis(i).sign().is_positive())
                .collect();
            rejections.sort_unstable();
            LevelRejection {
                alpha,
                count: rejections.len(),
                rejections,
                prefix_len,
                admissible: true,
                fdp_hat: counts.fdp_hat_at(prefix_len, offset),
            }
        }
        None => LevelRejection {
            alpha,
            rejections: Vec::new(),
            count: 0,
            prefix_len: 0,
            admissible: false,
            fdp_hat: counts.fdp_hat_at(0, offset),
        },
    }
}

/// Package the engine output into a [`FilterResult`].
///
/// `metadata.runtime_secs` is left for the caller to fill in.
pub fn assemble(
    output: EngineOutput,
    target_levels: &[f64],
    config: &Config,
    warnings: Vec<String>,
) -> FilterResult {
    let offset = config.offset;
    let registry = &output.registry;
    let counts = registry.cumulative_counts();
    let levels = target_levels
        .iter()
        .map(|&alpha| level_rejection(registry, &counts, alpha, offset))
        .collect();

    let num_hypotheses = registry.len();
    let side_info_dim = registry.side_info_dim();
    let state = output.registry.into_state();
    let fit_failures = output
        .fit_events
        .iter()
        .filter(|e| matches!(e.outcome, FitOutcome::Failed { .. }))
        .count();

    FilterResult {
        levels,
        num_hypotheses,
        pos_count: state.pos_count,
        neg_count: state.neg_count,
        stop_reason: output.stop_reason,
        diagnostics: Diagnostics {
            fdp_trace: output.fdp_trace,
            model_version_trace: output.model_version_trace,
            fit_events: output.fit_events,
            fit_failures,
            warnings,
        },
        metadata: Metadata {
            model: output.model_name.to_string(),
            model_version: state.model_version,
            refit_every_k_reveals: config.refit_every_k_reveals,
            min_labels_for_fit: config.min_labels_for_fit,
            offset,
            seed: config.seed_or_default(),
            side_info_dim,
            fit_threads: crate::thread_pool::fit_threads(),
            runtime_secs: 0.0,
        },
        reveal_order: state.order,
    }
}
