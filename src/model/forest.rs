//! Random forest over the scaled feature triple.
//!
//! Each tree is a CART classifier:
//!
//! - trained on a bootstrap resample of the training rows
//! - at each node, candidate features are visited in random order and the first
//!   non-constant one is split at its best Gini threshold (one feature per
//!   split, i.e. `floor(sqrt(3))`)
//! - grown until a node is pure, too small to split, or at `max_depth`
//!
//! Leaves store their class distribution; the forest averages distributions and
//! picks the most probable class, breaking ties toward the lower tier.
//!
//! Tree seeds are drawn sequentially from the master seed before the trees are
//! grown in parallel, so the fitted forest depends only on the data and seed.

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::math::N_FEATURES;

/// Number of classes (risk tiers).
pub const N_CLASSES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub seed: u64,
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
            max_depth: 48,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        distribution: [f64; N_CLASSES],
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn fit(
        rows: &[[f64; N_FEATURES]],
        labels: &[usize],
        sample: Vec<usize>,
        params: &ForestParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        let mut sample = sample;
        tree.grow(rows, labels, &mut sample, 0, params, rng);
        tree
    }

    fn grow(
        &mut self,
        rows: &[[f64; N_FEATURES]],
        labels: &[usize],
        idx: &mut [usize],
        depth: usize,
        params: &ForestParams,
        rng: &mut StdRng,
    ) -> usize {
        let counts = class_counts(labels, idx);
        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            distribution: normalize_counts(&counts),
        });

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        if pure || depth >= params.max_depth || idx.len() < params.min_samples_split.max(2) {
            return node_id;
        }

        let mut features: Vec<usize> = (0..N_FEATURES).collect();
        features.shuffle(rng);
        let Some((feature, threshold)) = features
            .into_iter()
            .find_map(|f| best_threshold(rows, labels, idx, f).map(|t| (f, t)))
        else {
            return node_id;
        };

        let split = partition(idx, |i| rows[i][feature] <= threshold);
        let (left_idx, right_idx) = idx.split_at_mut(split);
        let left = self.grow(rows, labels, left_idx, depth + 1, params, rng);
        let right = self.grow(rows, labels, right_idx, depth + 1, params, rng);

        self.nodes[node_id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        node_id
    }

    fn leaf_distribution(&self, row: &[f64; N_FEATURES]) -> &[f64; N_CLASSES] {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check the node table is walkable: every split points forward to an
    /// existing node, so prediction always terminates at a leaf.
    fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        let len = self.nodes.len();
        for (id, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { distribution } => {
                    if distribution.iter().any(|p| !p.is_finite() || *p < 0.0) {
                        return Err(format!("leaf {id} has an invalid class distribution"));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= N_FEATURES {
                        return Err(format!("split {id} uses feature {feature}, expected < {N_FEATURES}"));
                    }
                    if threshold.is_nan() {
                        return Err(format!("split {id} has a NaN threshold"));
                    }
                    for child in [*left, *right] {
                        if child <= id || child >= len {
                            return Err(format!("split {id} points to node {child} of {len}"));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit on scaled rows and class labels (`< N_CLASSES`).
    ///
    /// Returns `None` if there are no rows or `rows` and `labels` disagree in length.
    pub fn fit(rows: &[[f64; N_FEATURES]], labels: &[usize], params: ForestParams) -> Option<Self> {
        if rows.is_empty() || rows.len() != labels.len() || labels.iter().any(|&l| l >= N_CLASSES) {
            return None;
        }

        let mut master = StdRng::seed_from_u64(params.seed);
        let seeds: Vec<u64> = (0..params.n_trees.max(1)).map(|_| master.next_u64()).collect();
        let n = rows.len();

        let trees = seeds
            .par_iter()
            .map(|&seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit(rows, labels, sample, &params, &mut rng)
            })
            .collect();

        Some(Self { params, trees })
    }

    /// Averaged class distribution for one scaled row.
    pub fn predict_proba(&self, row: &[f64; N_FEATURES]) -> [f64; N_CLASSES] {
        let mut acc = [0.0; N_CLASSES];
        for tree in &self.trees {
            for (a, p) in acc.iter_mut().zip(tree.leaf_distribution(row)) {
                *a += p;
            }
        }
        let n = self.trees.len().max(1) as f64;
        acc.map(|v| v / n)
    }

    pub fn predict(&self, row: &[f64; N_FEATURES]) -> usize {
        let proba = self.predict_proba(row);
        let mut best = 0;
        for (class, &p) in proba.iter().enumerate().skip(1) {
            if p > proba[best] {
                best = class;
            }
        }
        best
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Structural check for a forest read back from storage.
    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        for (k, tree) in self.trees.iter().enumerate() {
            tree.validate().map_err(|reason| format!("tree {k}: {reason}"))?;
        }
        Ok(())
    }
}

fn class_counts(labels: &[usize], idx: &[usize]) -> [usize; N_CLASSES] {
    let mut counts = [0; N_CLASSES];
    for &i in idx {
        counts[labels[i]] += 1;
    }
    counts
}

fn normalize_counts(counts: &[usize; N_CLASSES]) -> [f64; N_CLASSES] {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return [0.0; N_CLASSES];
    }
    counts.map(|c| c as f64 / total as f64)
}

fn gini(counts: &[usize; N_CLASSES], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let t = total as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / t).powi(2)).sum::<f64>()
}

/// Best Gini threshold on one feature, or `None` if the feature is constant here.
fn best_threshold(rows: &[[f64; N_FEATURES]], labels: &[usize], idx: &[usize], feature: usize) -> Option<f64> {
    let mut sorted: Vec<(f64, usize)> = idx.iter().map(|&i| (rows[i][feature], labels[i])).collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = sorted.len();
    let mut right = [0usize; N_CLASSES];
    for &(_, label) in &sorted {
        right[label] += 1;
    }
    let mut left = [0usize; N_CLASSES];

    let mut best: Option<(f64, f64)> = None;
    for k in 0..n - 1 {
        let label = sorted[k].1;
        left[label] += 1;
        right[label] -= 1;

        let (lo, hi) = (sorted[k].0, sorted[k + 1].0);
        if lo >= hi {
            continue;
        }
        let n_left = k + 1;
        let n_right = n - n_left;
        let impurity = (n_left as f64 * gini(&left, n_left) + n_right as f64 * gini(&right, n_right)) / n as f64;
        if best.is_none_or(|(b, _)| impurity < b) {
            best = Some((impurity, lo + (hi - lo) / 2.0));
        }
    }
    best.map(|(_, threshold)| threshold)
}

/// Move elements satisfying `pred` to the front; returns how many there are.
fn partition(idx: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut split = 0;
    for k in 0..idx.len() {
        if pred(idx[k]) {
            idx.swap(split, k);
            split += 1;
        }
    }
    split
}
