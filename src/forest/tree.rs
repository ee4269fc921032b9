//! Single regression tree grown on a bootstrap sample.

use ndarray::{ArrayView1, ArrayView2};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::ForestParams;

/// Splits must reduce squared error by more than this.
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
}

/// Regression tree stored as a flat node arena; node 0 is the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f32,
    gain: f64,
}

impl RegressionTree {
    /// Grow a tree on `indices` (rows of `x`, repeats allowed for bootstrap samples).
    pub(crate) fn fit(
        x: ArrayView2<f32>,
        y: &[f64],
        mut indices: Vec<usize>,
        params: &ForestParams,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, y, &mut indices, 0, params, rng);
        tree
    }

    fn grow(
        &mut self,
        x: ArrayView2<f32>,
        y: &[f64],
        indices: &mut [usize],
        depth: usize,
        params: &ForestParams,
        rng: &mut ChaCha8Rng,
    ) -> usize {
        let n = indices.len();
        let sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let mean = if n > 0 { sum / n as f64 } else { 0.0 };
        let sse: f64 = indices.iter().map(|&i| (y[i] - mean).powi(2)).sum();

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        if depth >= params.max_depth
            || n < params.min_samples_split.max(2)
            || n < 2 * params.min_samples_leaf.max(1)
            || sse <= MIN_GAIN
        {
            return id;
        }

        let Some(split) = find_best_split(x, y, indices, params, rng) else {
            return id;
        };

        let mid = partition(indices, |i| x[[i, split.feature]] <= split.threshold);
        let (left_rows, right_rows) = indices.split_at_mut(mid);
        let left = self.grow(x, y, left_rows, depth + 1, params, rng);
        let right = self.grow(x, y, right_rows, depth + 1, params, rng);

        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    pub fn predict_one(&self, row: ArrayView1<f32>) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes.get(id) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    /// Depth counted in edges; a single leaf has depth 0.
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

/// Best variance-reduction split over a random ordering of candidate features.
fn find_best_split(
    x: ArrayView2<f32>,
    y: &[f64],
    indices: &[usize],
    params: &ForestParams,
    rng: &mut ChaCha8Rng,
) -> Option<BestSplit> {
    let n_features = x.ncols();
    let mut features: Vec<usize> = (0..n_features).collect();
    features.shuffle(rng);
    features.truncate(params.max_features.unwrap_or(n_features).clamp(1, n_features.max(1)));

    let n = indices.len();
    let min_leaf = params.min_samples_leaf.max(1);
    let total: f64 = indices.iter().map(|&i| y[i]).sum();
    let parent_score = total * total / n as f64;

    let mut best: Option<BestSplit> = None;
    let mut column: Vec<(f32, f64)> = Vec::with_capacity(n);

    for feature in features {
        column.clear();
        column.extend(indices.iter().map(|&i| (x[[i, feature]], y[i])));
        column.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_sum = 0.0;
        for k in 0..n - 1 {
            left_sum += column[k].1;
            let left_n = k + 1;
            let right_n = n - left_n;
            if left_n < min_leaf || right_n < min_leaf {
                continue;
            }
            let (lo, hi) = (column[k].0, column[k + 1].0);
            if lo >= hi {
                continue;
            }

            let right_sum = total - left_sum;
            let score = left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64;
            let gain = score - parent_score;
            if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                let mut threshold = lo + (hi - lo) / 2.0;
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some(BestSplit {
                    feature,
                    threshold,
                    gain,
                });
            }
        }
    }

    best
}

/// Reorder `indices` so rows matching `goes_left` come first; returns the boundary.
fn partition(indices: &mut [usize], goes_left: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0;
    for k in 0..indices.len() {
        if goes_left(indices[k]) {
            indices.swap(mid, k);
            mid += 1;
        }
    }
    mid
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::SeedableRng;

    fn params(max_depth: usize) -> ForestParams {
        ForestParams {
            max_depth,
            ..ForestParams::default()
        }
    }

    #[test]
    fn step_function_is_learned_exactly() {
        let x = Array2::from_shape_fn((20, 1), |(i, _)| i as f32);
        let y: Vec<f64> = (0..20).map(|i| if i < 10 { -1.0 } else { 1.0 }).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let tree = RegressionTree::fit(x.view(), &y, (0..20).collect(), &params(5), &mut rng);

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.predict_one(ndarray::arr1(&[3.0f32]).view()), -1.0);
        assert_eq!(tree.predict_one(ndarray::arr1(&[15.0f32]).view()), 1.0);
        // threshold sits at the midpoint between 9 and 10
        assert_eq!(tree.predict_one(ndarray::arr1(&[9.4f32]).view()), -1.0);
        assert_eq!(tree.predict_one(ndarray::arr1(&[9.6f32]).view()), 1.0);
    }

    #[test]
    fn depth_is_capped() {
        let x = Array2::from_shape_fn((64, 1), |(i, _)| i as f32);
        let y: Vec<f64> = (0..64).map(|i| (i as f64).sin()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = RegressionTree::fit(x.view(), &y, (0..64).collect(), &params(3), &mut rng);
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn constant_labels_make_a_single_leaf() {
        let x = Array2::from_shape_fn((5, 2), |(i, j)| (i + j) as f32);
        let y = vec![0.25; 5];
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let tree = RegressionTree::fit(x.view(), &y, (0..5).collect(), &params(5), &mut rng);
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict_one(ndarray::arr1(&[100.0f32, -3.0]).view()), 0.25);
    }

    #[test]
    fn partition_moves_matches_to_front() {
        let mut idx = vec![5, 2, 8, 1, 9];
        let mid = partition(&mut idx, |i| i < 5);
        assert_eq!(mid, 2);
        assert!(idx[..mid].iter().all(|&i| i < 5));
        assert!(idx[mid..].iter().all(|&i| i >= 5));
    }
}
