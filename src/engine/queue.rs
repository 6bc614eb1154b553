//! Reveal queue: masked hypotheses ordered by the current ranking.
//!
//! Scores only change when the model is refit, so the queue is rebuilt once
//! per model version and otherwise consumed front to back.

use std::cmp::Ordering;

use crate::config::TieBreak;
use crate::mask::{Hypothesis, MaskRegistry};

#[derive(Debug, Clone, Default)]
pub(crate) struct RevealQueue {
    ranked: Vec<usize>,
    cursor: usize,
}

impl RevealQueue {
    /// Re-rank every masked hypothesis, best first.
    ///
    /// NaN scores sort last; `-0.0` and `0.0` are the same score.
    pub(crate) fn rebuild<F>(&mut self, registry: &MaskRegistry, tie_break: TieBreak, score: F)
    where
        F: Fn(&Hypothesis) -> f64,
    {
        let mut scored: Vec<(f64, usize)> = registry
            .unrevealed()
            .map(|h| {
                let s = score(h) + 0.0;
                (if s.is_nan() { f64::NEG_INFINITY } else { s }, h.index)
            })
            .collect();
        scored.sort_by(|a, b| rank_order(a, b, tie_break));

        self.ranked = scored.into_iter().map(|(_, index)| index).collect();
        self.cursor = 0;
    }

    /// Next masked hypothesis in rank order.
    pub(crate) fn next(&mut self, registry: &MaskRegistry) -> Option<usize> {
        while let Some(&index) = self.ranked.get(self.cursor) {
            self.cursor += 1;
            if !registry.hypothesis(index).is_revealed() {
                return Some(index);
            }
        }
        None
    }
}

fn rank_order(a: &(f64, usize), b: &(f64, usize), tie_break: TieBreak) -> Ordering {
    b.0.total_cmp(&a.0).then_with(|| match tie_break {
        TieBreak::LowestIndex => a.1.cmp(&b.1),
    })
}
