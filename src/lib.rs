#![deny(clippy::all)]
#![warn(clippy::doc_markdown, clippy::unwrap_used, clippy::expect_used)]

//! # GRF Core
//!
//! The numerical core of a generalized random forest engine. A forest of
//! honest, randomized regression trees induces a per-query kernel over the
//! training samples; prediction strategies plug that kernel into a weighted
//! mean (regression) or a weighted ridge regression on centered covariates
//! (local linear). Trees grown in groups over shared half-samples drive the
//! half-sampling variance estimator behind confidence intervals.
//!
//! Training is deterministic: the same data, options, and seed produce the
//! same serialized forest for any thread count.

pub mod analysis;
pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod forest;
pub mod prediction;
pub mod relabel;
pub mod sampling;
pub mod splitting;
pub mod tree;

pub use api::{local_linear_predict, local_linear_predict_oob, predict, predict_oob, train};
pub use config::{ForestOptions, SamplingOptions, TreeOptions};
pub use data::{Data, SparseColumns};
pub use error::{GrfError, Result};
pub use forest::{Forest, ForestPredictor, ForestTrainer};
pub use prediction::{
    LocalLinearPredictionStrategy, Prediction, PredictionStrategy, RegressionPredictionStrategy,
    RidgeType,
};
