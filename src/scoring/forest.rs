//! A small seeded ensemble of binary decision trees.
//!
//! Each tree is grown on a bootstrap resample of the training set with a
//! random subset of features tried at every split (gini impurity criterion).
//! The ensemble's positive-class probability is the mean of the per-tree leaf
//! positive fractions. Growth is fully deterministic for a given RNG seed.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{FeatureVector, FEATURE_COUNT};

/// Hyperparameters for forest growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees in the ensemble.
    pub n_trees: usize,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Minimum number of samples required to attempt a split.
    pub min_samples_split: usize,
    /// Number of features tried at each split.
    pub features_per_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 12,
            min_samples_split: 2,
            features_per_split: 2,
        }
    }
}

/// One node of a fitted decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    /// Terminal node holding the positive-class fraction of its training
    /// samples.
    Leaf { probability: f64 },
    /// Internal split: samples with `feature < threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn probability(&self, features: &FeatureVector) -> f64 {
        match self {
            Self::Leaf { probability } => *probability,
            Self::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if features[*feature] < *threshold {
                    left.probability(features)
                } else {
                    right.probability(features)
                }
            }
        }
    }

    fn node_count(&self) -> usize {
        match self {
            Self::Leaf { .. } => 1,
            Self::Split { left, right, .. } => 1 + left.node_count() + right.node_count(),
        }
    }
}

/// A fitted ensemble of decision trees for binary classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<Node>,
    params: ForestParams,
}

impl RandomForest {
    /// Fit the ensemble on pre-scaled samples and binary labels.
    ///
    /// Samples and labels must have equal, non-zero length; the caller (the
    /// training routine) guarantees this.
    #[must_use]
    pub fn fit(
        samples: &[FeatureVector],
        labels: &[u8],
        params: ForestParams,
        rng: &mut StdRng,
    ) -> Self {
        let n = samples.len().min(labels.len());
        let mut trees = Vec::with_capacity(params.n_trees);

        for _ in 0..params.n_trees {
            let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            trees.push(grow(samples, labels, indices, 0, params, rng));
        }

        Self { trees, params }
    }

    /// Mean positive-class probability across all trees, in [0, 1].
    #[must_use]
    pub fn predict_probability(&self, features: &FeatureVector) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .trees
            .iter()
            .map(|tree| tree.probability(features))
            .sum();
        (sum / self.trees.len() as f64).clamp(0.0, 1.0)
    }

    /// Number of trees in the ensemble.
    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Total node count across all trees.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.trees.iter().map(Node::node_count).sum()
    }
}

/// Recursively grow one tree on the given sample indices.
fn grow(
    samples: &[FeatureVector],
    labels: &[u8],
    indices: Vec<usize>,
    depth: usize,
    params: ForestParams,
    rng: &mut StdRng,
) -> Node {
    let positives = indices.iter().filter(|&&i| labels[i] == 1).count();
    let probability = positives as f64 / indices.len() as f64;

    let pure = positives == 0 || positives == indices.len();
    if pure || depth >= params.max_depth || indices.len() < params.min_samples_split {
        return Node::Leaf { probability };
    }

    let Some((feature, threshold)) = best_split(samples, labels, &indices, params, rng) else {
        return Node::Leaf { probability };
    };

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| samples[i][feature] < threshold);

    // Guarded by best_split, which only proposes thresholds strictly between
    // observed values.
    if left.is_empty() || right.is_empty() {
        return Node::Leaf { probability };
    }

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(samples, labels, left, depth + 1, params, rng)),
        right: Box::new(grow(samples, labels, right, depth + 1, params, rng)),
    }
}

/// Find the impurity-minimizing split over a random feature subset.
///
/// Returns `None` when no threshold separates the samples.
fn best_split(
    samples: &[FeatureVector],
    labels: &[u8],
    indices: &[usize],
    params: ForestParams,
    rng: &mut StdRng,
) -> Option<(usize, f64)> {
    let k = params.features_per_split.min(FEATURE_COUNT);
    let candidates = rand::seq::index::sample(rng, FEATURE_COUNT, k);

    let total = indices.len() as f64;
    let mut best: Option<(usize, f64, f64)> = None;

    for feature in candidates {
        // Sort (value, label) pairs for this feature, then sweep every
        // boundary between distinct values.
        let mut column: Vec<(f64, u8)> = indices
            .iter()
            .map(|&i| (samples[i][feature], labels[i]))
            .collect();
        column.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let total_positives = column.iter().filter(|(_, label)| *label == 1).count() as f64;

        let mut left_count = 0.0;
        let mut left_positives = 0.0;
        for window in column.windows(2) {
            left_count += 1.0;
            if window[0].1 == 1 {
                left_positives += 1.0;
            }
            if window[0].0 >= window[1].0 {
                continue;
            }

            let right_count = total - left_count;
            let right_positives = total_positives - left_positives;
            let impurity = left_count / total * gini(left_positives, left_count)
                + right_count / total * gini(right_positives, right_count);

            if best.map_or(true, |(_, _, best_impurity)| impurity < best_impurity) {
                let threshold = (window[0].0 + window[1].0) / 2.0;
                best = Some((feature, threshold, impurity));
            }
        }
    }

    best.map(|(feature, threshold, _)| (feature, threshold))
}

/// Gini impurity of a binary partition.
fn gini(positives: f64, count: f64) -> f64 {
    if count == 0.0 {
        return 0.0;
    }
    let p = positives / count;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}
