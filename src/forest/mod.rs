//! Bagged ensemble of regression trees.
//!
//! Every tree sees a bootstrap sample drawn from a ChaCha8 stream seeded with
//! `seed + tree_index`, so a fit is reproducible regardless of how rayon
//! schedules the trees.

pub mod tree;

use ndarray::{ArrayView1, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use tree::RegressionTree;

#[derive(Debug, Error, PartialEq)]
pub enum ForestError {
    #[error("cannot fit a forest on zero rows")]
    EmptyTrainingSet,

    #[error("forest needs at least one tree")]
    NoTrees,

    #[error("{rows} feature rows but {labels} labels")]
    LabelCountMismatch { rows: usize, labels: usize },

    #[error("expected {expected} features, got {found}")]
    FeatureCountMismatch { expected: usize, found: usize },

    #[error("label at row {0} is not finite")]
    NonFiniteLabel(usize),
}

/// Forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split. `None` considers all of them.
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 5,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl RandomForestRegressor {
    /// Fit on the rows of `x` against `y`. Trees are built in parallel.
    pub fn fit(params: &ForestParams, x: ArrayView2<f32>, y: &[f64]) -> Result<Self, ForestError> {
        let n = x.nrows();
        if n == 0 {
            return Err(ForestError::EmptyTrainingSet);
        }
        if params.n_trees == 0 {
            return Err(ForestError::NoTrees);
        }
        if y.len() != n {
            return Err(ForestError::LabelCountMismatch {
                rows: n,
                labels: y.len(),
            });
        }
        if let Some(row) = y.iter().position(|v| !v.is_finite()) {
            return Err(ForestError::NonFiniteLabel(row));
        }

        let trees = (0..params.n_trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(i as u64));
                let indices: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                RegressionTree::fit(x, y, indices, params, &mut rng)
            })
            .collect();

        Ok(Self {
            n_features: x.ncols(),
            trees,
        })
    }

    /// Mean of the tree outputs for one sample.
    pub fn predict_one(&self, row: ArrayView1<f32>) -> Result<f64, ForestError> {
        if row.len() != self.n_features {
            return Err(ForestError::FeatureCountMismatch {
                expected: self.n_features,
                found: row.len(),
            });
        }
        let total: f64 = self.trees.iter().map(|t| t.predict_one(row)).sum();
        Ok(total / self.trees.len() as f64)
    }

    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Vec<f64>, ForestError> {
        x.rows().into_iter().map(|row| self.predict_one(row)).collect()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}
