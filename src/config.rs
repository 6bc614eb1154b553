//! Configuration for the adaptive knockoff filter.

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// Configuration options for `AdaptiveKnockoff`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Reveals between ranking-model refits (default: 5).
    ///
    /// This is the main cost/quality knob: 1 refits after every reveal and
    /// gives the most adaptive order, larger values amortise the fit cost.
    pub refit_every_k_reveals: usize,

    /// Revealed labels required before the model is fitted at all (default: 10).
    ///
    /// Below this the order comes purely from side information.
    pub min_labels_for_fit: usize,

    /// Direction of the side-information fallback order (default: Ascending).
    pub fallback_order: FallbackOrder,

    /// Stop revealing once no longer prefix can change any rejection set
    /// (default: false).
    pub allow_early_stop: bool,

    /// Tie-break rule for equal scores.
    pub tie_break: TieBreak,

    /// Numerator offset of the FDP estimate (default: 1, the knockoff+ estimate).
    pub offset: u32,

    /// Ranking model used once enough labels exist (default: Logistic).
    pub model: ModelKind,

    /// Seed for model-internal randomness (default: none, meaning 42).
    pub seed: Option<u64>,

    /// Optional guardrail for max duration in milliseconds.
    pub max_duration_ms: Option<u64>,

    /// Record the per-step FDP and model-version traces (default: true).
    pub record_trace: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refit_every_k_reveals: 5,
            min_labels_for_fit: 10,
            fallback_order: FallbackOrder::Ascending,
            allow_early_stop: false,
            tie_break: TieBreak::LowestIndex,
            offset: 1,
            model: ModelKind::Logistic,
            seed: None,
            max_duration_ms: None,
            record_trace: true,
        }
    }
}

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 42;

impl Config {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.refit_every_k_reveals == 0 {
            return Err(FilterError::InvalidConfig(
                "refit_every_k_reveals must be at least 1".to_string(),
            ));
        }
        if self.min_labels_for_fit == 0 {
            return Err(FilterError::InvalidConfig(
                "min_labels_for_fit must be at least 1".to_string(),
            ));
        }
        if self.offset > 1 {
            return Err(FilterError::InvalidConfig(format!(
                "offset must be 0 or 1, got {}",
                self.offset
            )));
        }
        Ok(())
    }

    /// Effective seed.
    pub fn seed_or_default(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_SEED)
    }

    /// Merge overrides from `AKF_*` environment variables.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Merge overrides from an arbitrary key lookup.
    ///
    /// Recognised keys: `AKF_REFIT_EVERY`, `AKF_MIN_LABELS`, `AKF_FALLBACK_ORDER`,
    /// `AKF_EARLY_STOP`, `AKF_OFFSET`, `AKF_MODEL`, `AKF_SEED`, `AKF_MAX_DURATION_MS`.
    /// Values that fail to parse are skipped with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(k) = parse_override(&lookup, "AKF_REFIT_EVERY") {
            self.refit_every_k_reveals = k;
        }
        if let Some(n) = parse_override(&lookup, "AKF_MIN_LABELS") {
            self.min_labels_for_fit = n;
        }
        if let Some(order) = parse_override(&lookup, "AKF_FALLBACK_ORDER") {
            self.fallback_order = order;
        }
        if let Some(flag) = parse_override::<Flag, _>(&lookup, "AKF_EARLY_STOP") {
            self.allow_early_stop = flag.0;
        }
        if let Some(offset) = parse_override(&lookup, "AKF_OFFSET") {
            self.offset = offset;
        }
        if let Some(model) = parse_override(&lookup, "AKF_MODEL") {
            self.model = model;
        }
        if let Some(seed) = parse_override(&lookup, "AKF_SEED") {
            self.seed = Some(seed);
        }
        if let Some(ms) = parse_override(&lookup, "AKF_MAX_DURATION_MS") {
            self.max_duration_ms = Some(ms);
        }
    }
}

fn parse_override<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring {}={:?}: unparsable value", key, raw);
            None
        }
    }
}

struct Flag(bool);

impl FromStr for Flag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Flag(true)),
            "0" | "false" | "no" | "off" => Ok(Flag(false)),
            _ => Err(()),
        }
    }
}

/// Order used to rank hypotheses before the model has enough labels.
///
/// Keys on the first side-information coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FallbackOrder {
    /// Smallest side information first.
    #[default]
    Ascending,
    /// Largest side information first.
    Descending,
}

impl FallbackOrder {
    /// Score of a side-information key; higher is revealed sooner.
    pub fn score(self, key: f64) -> f64 {
        match self {
            Self::Ascending => -key,
            Self::Descending => key,
        }
    }
}

impl FromStr for FallbackOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            other => Err(format!("unknown fallback order '{}'", other)),
        }
    }
}

/// Rule for breaking score ties when picking the next hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TieBreak {
    /// Lowest original index wins.
    #[default]
    LowestIndex,
}

/// Built-in ranking model selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelKind {
    /// Ridge-penalised logistic regression on `[|W|, u]`.
    #[default]
    Logistic,
    /// Nadaraya-Watson smoother on the first side-information coordinate and |W|.
    Kernel,
    /// Bagged classification trees.
    Forest,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Logistic => "logistic",
            Self::Kernel => "kernel",
            Self::Forest => "forest",
        })
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "logistic" | "glm" => Ok(Self::Logistic),
            "kernel" | "smooth" | "gam" => Ok(Self::Kernel),
            "forest" | "rf" | "random_forest" => Ok(Self::Forest),
            other => Err(format!("unknown model '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_is_valid() {
        assert!(Config::default().validate().is_ok());
        assert_eq!(Config::default().seed_or_default(), DEFAULT_SEED);
        assert_eq!(FallbackOrder::default(), FallbackOrder::Ascending);
    }

    #[test]
    fn test_validate_rejects_zero_cadence() {
        let config = Config {
            refit_every_k_reveals: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(FilterError::InvalidConfig(_))));

        let config = Config {
            offset: 2,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("AKF_REFIT_EVERY", "3"),
            ("AKF_MIN_LABELS", "20"),
            ("AKF_FALLBACK_ORDER", "desc"),
            ("AKF_EARLY_STOP", "yes"),
            ("AKF_OFFSET", "0"),
            ("AKF_MODEL", "rf"),
            ("AKF_SEED", "7"),
            ("AKF_MAX_DURATION_MS", "1500"),
        ]));

        assert_eq!(config.refit_every_k_reveals, 3);
        assert_eq!(config.min_labels_for_fit, 20);
        assert_eq!(config.fallback_order, FallbackOrder::Descending);
        assert!(config.allow_early_stop);
        assert_eq!(config.offset, 0);
        assert_eq!(config.model, ModelKind::Forest);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.max_duration_ms, Some(1500));
    }

    #[test]
    fn test_bad_override_ignored() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("AKF_REFIT_EVERY", "often"),
            ("AKF_MODEL", "svm"),
            ("AKF_EARLY_STOP", "maybe"),
        ]));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_fallback_score_direction() {
        assert!(FallbackOrder::Ascending.score(1.0) > FallbackOrder::Ascending.score(2.0));
        assert!(FallbackOrder::Descending.score(2.0) > FallbackOrder::Descending.score(1.0));
    }
}
