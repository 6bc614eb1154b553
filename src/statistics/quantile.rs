//! Quantiles of feature columns.
//!
//! Used for kernel bandwidth selection (IQR) and for the candidate split
//! thresholds of the forest model.

/// R-7 quantile of already sorted data.
///
/// Returns 0.0 for empty input.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    let h = (n - 1) as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Interquartile range Q3 - Q1. Returns 0.0 for fewer than two values.
pub fn interquartile_range(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile_sorted(&sorted, 0.75) - quantile_sorted(&sorted, 0.25)
}

/// Distinct split thresholds at evenly spaced interior quantiles.
///
/// Produces at most `max_candidates` strictly increasing values, each
/// the midpoint between the quantile and the next larger observed value so a
/// `x <= t` split always separates at least one sample.
pub fn candidate_thresholds(values: &[f64], max_candidates: usize) -> Vec<f64> {
    if values.len() < 2 || max_candidates == 0 {
        return Vec::new();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.dedup();
    if sorted.len() < 2 {
        return Vec::new();
    }

    let gaps = sorted.len() - 1;
    let step = (gaps as f64 / max_candidates as f64).max(1.0);
    let mut thresholds = Vec::with_capacity(max_candidates.min(gaps));
    let mut pos = 0.0;
    while (pos as usize) < gaps && thresholds.len() < max_candidates {
        let i = pos as usize;
        let t = 0.5 * (sorted[i] + sorted[i + 1]);
        if thresholds.last().map_or(true, |&last| t > last) {
            thresholds.push(t);
        }
        pos += step;
    }
    thresholds
}
