//! Random forest of CART classification trees.
//!
//! Each tree is grown on a bootstrap sample with a random feature subset per
//! split (Gini impurity, quantile candidate thresholds). Tree `t` draws from
//! an RNG seeded with `counter_rng_seed(seed, t)`, so a fit is reproducible
//! for a given seed whether trees are built sequentially or on the rayon pool.

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::{check_samples, RankingModel};
use crate::error::ModelFitError;
use crate::statistics::{bootstrap_indices, candidate_thresholds, counter_rng_seed, out_of_bag};
use crate::types::{feature_row, LabeledSample};

/// Forest hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    /// Number of trees (default: 50).
    pub n_trees: usize,
    /// Maximum tree depth (default: 6).
    pub max_depth: usize,
    /// Minimum samples per leaf (default: 3).
    pub min_leaf: usize,
    /// Features tried per split; `None` means ceil(sqrt(d)).
    pub max_features: Option<usize>,
    /// Bootstrap size as a fraction of the training set (default: 1.0).
    pub sample_ratio: f64,
    /// Candidate thresholds per feature and node (default: 16).
    pub max_thresholds: usize,
    /// Base seed for bagging and feature subsampling.
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 50,
            max_depth: 6,
            min_leaf: 3,
            max_features: None,
            sample_ratio: 1.0,
            max_thresholds: 16,
            seed: crate::config::DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        prob: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut at = 0;
        loop {
            match self.nodes[at] {
                Node::Leaf { prob } => return prob,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        fn walk(nodes: &[Node], at: usize) -> usize {
            match nodes[at] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [bool],
    params: &'a ForestParams,
    mtry: usize,
    rng: Xoshiro256PlusPlus,
    nodes: Vec<Node>,
}

#[inline]
fn gini(positives: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = positives as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

impl TreeBuilder<'_> {
    fn grow(mut self, sample: Vec<usize>) -> Tree {
        self.build(sample, 0);
        Tree { nodes: self.nodes }
    }

    fn build(&mut self, sample: Vec<usize>, depth: usize) -> usize {
        let n = sample.len();
        let positives = sample.iter().filter(|&&i| self.labels[i]).count();
        let node = self.nodes.len();
        self.nodes.push(Node::Leaf {
            prob: (positives as f64 + 1.0) / (n as f64 + 2.0),
        });

        let min_leaf = self.params.min_leaf.max(1);
        if depth >= self.params.max_depth
            || n < 2 * min_leaf
            || positives == 0
            || positives == n
        {
            return node;
        }

        let Some((feature, threshold)) = self.best_split(&sample, positives) else {
            return node;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| self.rows[i][feature] <= threshold);
        let left = self.build(left, depth + 1);
        let right = self.build(right, depth + 1);
        self.nodes[node] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        node
    }

    fn best_split(&mut self, sample: &[usize], positives: usize) -> Option<(usize, f64)> {
        let n = sample.len();
        let d = self.rows[0].len();
        let min_leaf = self.params.min_leaf.max(1);
        let parent = n as f64 * gini(positives, n);

        let features = rand::seq::index::sample(&mut self.rng, d, self.mtry.min(d));
        let mut best: Option<(usize, f64, f64)> = None;

        for feature in features.iter() {
            let values: Vec<f64> = sample.iter().map(|&i| self.rows[i][feature]).collect();
            for threshold in candidate_thresholds(&values, self.params.max_thresholds) {
                let mut n_left = 0;
                let mut pos_left = 0;
                for (&i, &v) in sample.iter().zip(&values) {
                    if v <= threshold {
                        n_left += 1;
                        pos_left += usize::from(self.labels[i]);
                    }
                }
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                let impurity = n_left as f64 * gini(pos_left, n_left)
                    + n_right as f64 * gini(positives - pos_left, n_right);
                if best.map_or(true, |(_, _, b)| impurity < b) {
                    best = Some((feature, threshold, impurity));
                }
            }
        }

        best.filter(|&(_, _, impurity)| impurity < parent - 1e-12)
            .map(|(feature, threshold, _)| (feature, threshold))
    }
}

/// Bagged classification-tree ranking model.
#[derive(Debug, Clone)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<Tree>,
    oob_accuracy: Option<f64>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(ForestParams::default())
    }
}

impl RandomForest {
    /// Create an unfitted forest.
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            oob_accuracy: None,
        }
    }

    /// Hyper-parameters in use.
    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Number of fitted trees.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Deepest fitted tree.
    pub fn max_fitted_depth(&self) -> usize {
        self.trees.iter().map(Tree::depth).max().unwrap_or(0)
    }

    /// Out-of-bag classification accuracy of the last fit.
    pub fn oob_accuracy(&self) -> Option<f64> {
        self.oob_accuracy
    }
}

impl RankingModel for RandomForest {
    fn name(&self) -> &'static str {
        "forest"
    }

    fn fit(&mut self, samples: &[LabeledSample<'_>]) -> Result<(), ModelFitError> {
        let params = self.params;
        check_samples(samples, 2 * params.min_leaf.max(1))?;

        let rows: Vec<Vec<f64>> = samples.iter().map(LabeledSample::features).collect();
        let labels: Vec<bool> = samples.iter().map(|s| s.positive).collect();
        let n = rows.len();
        let d = rows[0].len();
        let mtry = params
            .max_features
            .unwrap_or_else(|| (d as f64).sqrt().ceil() as usize)
            .clamp(1, d);
        let bag_size = ((n as f64 * params.sample_ratio).round() as usize).max(1);

        let grow = |t: usize| -> (Tree, Vec<usize>) {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(params.seed, t as u64));
            let drawn = bootstrap_indices(n, bag_size, &mut rng);
            let builder = TreeBuilder {
                rows: &rows,
                labels: &labels,
                params: &params,
                mtry,
                rng,
                nodes: Vec::new(),
            };
            (builder.grow(drawn.clone()), drawn)
        };

        #[cfg(feature = "parallel")]
        let grown: Vec<(Tree, Vec<usize>)> =
            crate::thread_pool::install(|| (0..params.n_trees.max(1)).into_par_iter().map(grow).collect());

        #[cfg(not(feature = "parallel"))]
        let grown: Vec<(Tree, Vec<usize>)> = (0..params.n_trees.max(1)).map(grow).collect();

        let mut votes = vec![(0.0_f64, 0_usize); n];
        for (tree, drawn) in &grown {
            for i in out_of_bag(n, drawn) {
                votes[i].0 += tree.predict(&rows[i]);
                votes[i].1 += 1;
            }
        }
        let (correct, scored) = votes
            .iter()
            .zip(&labels)
            .filter(|((_, count), _)| *count > 0)
            .fold((0usize, 0usize), |(c, s), ((sum, count), &label)| {
                let predicted = sum / *count as f64 > 0.5;
                (c + usize::from(predicted == label), s + 1)
            });

        self.trees = grown.into_iter().map(|(tree, _)| tree).collect();
        self.oob_accuracy = (scored > 0).then(|| correct as f64 / scored as f64);
        Ok(())
    }

    fn score(&self, magnitude: f64, side_info: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let row = feature_row(magnitude, side_info);
        self.trees.iter().map(|t| t.predict(&row)).sum::<f64>() / self.trees.len() as f64
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn fit_quality(&self) -> Option<f64> {
        self.oob_accuracy
    }
}
