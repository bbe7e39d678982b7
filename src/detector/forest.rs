// AstraGuard - Isolation forest
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Isolation forest novelty model.
//!
//! Points that are isolated by few random axis-aligned splits are anomalous.
//! Each tree is grown on a sub-sample drawn without replacement; the expected
//! path length across trees is normalised by the average path length of an
//! unsuccessful BST search over the sub-sample size.

use crate::telemetry::CHANNEL_COUNT;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Average path length of an unsuccessful search in a BST of `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

/// One isolation tree, stored as a flat node arena rooted at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow(
        data: &[[f64; CHANNEL_COUNT]],
        rows: Vec<usize>,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.build(data, rows, 0, max_depth, rng);
        tree
    }

    fn build(
        &mut self,
        data: &[[f64; CHANNEL_COUNT]],
        rows: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { size: rows.len() });

        if rows.len() <= 1 || depth >= max_depth {
            return id;
        }

        // Only features that still vary inside this node can split it.
        let candidates: Vec<(usize, f64, f64)> = (0..CHANNEL_COUNT)
            .filter_map(|f| {
                let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, &r| {
                    (acc.0.min(data[r][f]), acc.1.max(data[r][f]))
                });
                (hi > lo).then_some((f, lo, hi))
            })
            .collect();

        if candidates.is_empty() {
            return id;
        }

        let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(lo..hi);
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| data[r][feature] <= threshold);

        let left = self.build(data, left_rows, depth + 1, max_depth, rng);
        let right = self.build(data, right_rows, depth + 1, max_depth, rng);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    /// Path length of `point`, adjusted for the size of the leaf it lands in.
    pub fn path_length(&self, point: &[f64; CHANNEL_COUNT]) -> f64 {
        let mut idx = 0;
        let mut depth = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { size } => return depth as f64 + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if point[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                    depth += 1;
                }
            }
        }
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// An ensemble of isolation trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
}

impl IsolationForest {
    /// Grow `n_trees` trees over `data`, each on at most `max_samples` rows.
    ///
    /// The forest is a pure function of `(data, n_trees, max_samples, seed)`.
    pub fn fit(
        data: &[[f64; CHANNEL_COUNT]],
        n_trees: usize,
        max_samples: usize,
        seed: u64,
    ) -> Self {
        if data.is_empty() {
            return Self {
                trees: Vec::new(),
                sample_size: 0,
            };
        }

        let sample_size = max_samples.min(data.len()).max(1);
        let max_depth = (sample_size as f64).log2().ceil().max(0.0) as usize;
        let mut rng = StdRng::seed_from_u64(seed);

        let trees = (0..n_trees)
            .map(|_| {
                let mut tree_rng = StdRng::seed_from_u64(rng.gen());
                let rows = index::sample(&mut tree_rng, data.len(), sample_size).into_vec();
                IsolationTree::grow(data, rows, max_depth, &mut tree_rng)
            })
            .collect();

        Self { trees, sample_size }
    }

    /// Mean path length of `point` over all trees.
    pub fn mean_path_length(&self, point: &[f64; CHANNEL_COUNT]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.path_length(point)).sum::<f64>() / self.trees.len() as f64
    }

    /// Normality score in `[-1, 0)`: lower is more anomalous.
    pub fn normality(&self, point: &[f64; CHANNEL_COUNT]) -> f64 {
        let c = average_path_length(self.sample_size);
        if c == 0.0 {
            return -1.0;
        }
        -(2f64.powf(-self.mean_path_length(point) / c))
    }

    /// Number of trees.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Check if the forest has no trees.
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Sub-sample size each tree was grown on.
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }
}
