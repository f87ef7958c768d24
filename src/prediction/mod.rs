//! Prediction strategies
//!
//! A prediction strategy turns a query's forest kernel (the normalized
//! per-sample weight list) into a point estimate, and replays the per-tree
//! leaf memberships across confidence-interval groups to estimate variance.

mod local_linear;
mod regression;
pub(crate) mod variance;

pub use local_linear::{LocalLinearPredictionStrategy, RidgeType};
pub use regression::RegressionPredictionStrategy;

use crate::data::Data;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Normalized forest kernel for one query: `(sample id, weight)` pairs
/// sorted by id, weights summing to one.
pub type SampleWeights = Vec<(usize, f64)>;

/// The result of predicting one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Point estimates; length 1 for regression, one entry per ridge
    /// penalty for local linear prediction.
    pub estimates: Vec<f64>,
    /// Debiased half-sample variance, present when CI groups were requested.
    /// `NaN` marks a query with no CI available.
    pub variance: Option<f64>,
    /// True when no tree reached the query (an out-of-bag prediction with an
    /// empty OOB set); the estimates are `NaN`.
    pub undefined: bool,
}

/// Task-specific estimator plugged into the forest predictor.
pub trait PredictionStrategy: Send + Sync {
    /// Number of point estimates produced per query.
    fn num_outputs(&self) -> usize;

    /// Point estimate from the normalized weight list.
    fn predict(
        &self,
        train_data: &Data,
        query_data: &Data,
        query_row: usize,
        weights: &SampleWeights,
    ) -> Result<Vec<f64>>;

    /// Half-sample variance from the per-tree leaf memberships. `leaves[t]`
    /// is `None` when tree `t` was not used for this query (OOB skip), and
    /// holds the tree's prediction samples otherwise.
    fn compute_variance(
        &self,
        train_data: &Data,
        query_data: &Data,
        query_row: usize,
        weights: &SampleWeights,
        leaves: &[Option<&[usize]>],
        ci_group_size: usize,
    ) -> f64;
}
