//! Crate entry points
//!
//! The operations a binding layer wraps: train a forest, predict in-sample
//! or out-of-bag with the regression strategy, and the local linear
//! variants. Configuration flows exclusively through [`ForestOptions`].

use crate::config::ForestOptions;
use crate::data::Data;
use crate::error::Result;
use crate::forest::{Forest, ForestPredictor, ForestTrainer};
use crate::prediction::{
    LocalLinearPredictionStrategy, Prediction, RegressionPredictionStrategy, RidgeType,
};

/// Train a regression forest on `data`.
pub fn train(data: &Data, options: &ForestOptions) -> Result<Forest> {
    ForestTrainer::train(data, options)
}

/// Predict every row of `query_data` with the regression strategy.
/// `ci_group_size > 1` adds the half-sample variance to each prediction.
pub fn predict(
    forest: &Forest,
    train_data: &Data,
    query_data: &Data,
    num_threads: usize,
    ci_group_size: usize,
) -> Result<Vec<Prediction>> {
    let predictor = ForestPredictor::new(forest, train_data, num_threads, ci_group_size)?;
    predictor.predict(query_data, &RegressionPredictionStrategy)
}

/// Out-of-bag regression prediction on the training data.
pub fn predict_oob(
    forest: &Forest,
    data: &Data,
    num_threads: usize,
    ci_group_size: usize,
) -> Result<Vec<Prediction>> {
    let predictor = ForestPredictor::new(forest, data, num_threads, ci_group_size)?;
    predictor.predict_oob(&RegressionPredictionStrategy)
}

/// Local linear prediction of `test_data`: one estimate per ridge penalty,
/// with variance (for the first penalty) when the forest was trained with
/// CI groups.
pub fn local_linear_predict(
    forest: &Forest,
    train_data: &Data,
    test_data: &Data,
    lambdas: &[f64],
    ridge_type: RidgeType,
    variables: &[usize],
    num_threads: usize,
) -> Result<Vec<Prediction>> {
    let strategy =
        LocalLinearPredictionStrategy::new(lambdas.to_vec(), ridge_type, variables.to_vec())?;
    let predictor =
        ForestPredictor::new(forest, train_data, num_threads, forest.ci_group_size())?;
    predictor.predict(test_data, &strategy)
}

/// Out-of-bag local linear prediction on the training data.
pub fn local_linear_predict_oob(
    forest: &Forest,
    data: &Data,
    lambdas: &[f64],
    ridge_type: RidgeType,
    variables: &[usize],
    num_threads: usize,
) -> Result<Vec<Prediction>> {
    let strategy =
        LocalLinearPredictionStrategy::new(lambdas.to_vec(), ridge_type, variables.to_vec())?;
    let predictor = ForestPredictor::new(forest, data, num_threads, forest.ci_group_size())?;
    predictor.predict_oob(&strategy)
}
