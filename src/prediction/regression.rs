//! Regression prediction strategy

use super::variance::half_sample_variance;
use super::{PredictionStrategy, SampleWeights};
use crate::data::Data;
use crate::error::Result;

/// Weighted mean of training outcomes under the forest kernel.
pub struct RegressionPredictionStrategy;

impl PredictionStrategy for RegressionPredictionStrategy {
    fn num_outputs(&self) -> usize {
        1
    }

    fn predict(
        &self,
        train_data: &Data,
        _query_data: &Data,
        _query_row: usize,
        weights: &SampleWeights,
    ) -> Result<Vec<f64>> {
        let estimate = weights
            .iter()
            .map(|&(sample, weight)| weight * train_data.outcome(sample))
            .sum();
        Ok(vec![estimate])
    }

    fn compute_variance(
        &self,
        train_data: &Data,
        _query_data: &Data,
        _query_row: usize,
        weights: &SampleWeights,
        leaves: &[Option<&[usize]>],
        ci_group_size: usize,
    ) -> f64 {
        let average: f64 = weights
            .iter()
            .map(|&(sample, weight)| weight * train_data.outcome(sample))
            .sum();
        // Per-tree statistic: the leaf mean of the outcome, centered at the
        // forest estimate. Unused trees and empty leaves spoil their group.
        let psi: Vec<Option<f64>> = leaves
            .iter()
            .map(|leaf| {
                leaf.and_then(|samples| {
                    if samples.is_empty() {
                        None
                    } else {
                        let mean = samples
                            .iter()
                            .map(|&s| train_data.outcome(s))
                            .sum::<f64>()
                            / samples.len() as f64;
                        Some(mean - average)
                    }
                })
            })
            .collect();
        half_sample_variance(&psi, ci_group_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_weighted_mean() {
        let data = Data::dense(array![[0.0, 1.0], [0.0, 3.0], [0.0, 5.0]], 1).unwrap();
        let weights = vec![(0, 0.5), (1, 0.25), (2, 0.25)];
        let estimate = RegressionPredictionStrategy
            .predict(&data, &data, 0, &weights)
            .unwrap();
        assert!((estimate[0] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_constant_outcome_has_zero_variance() {
        let data = Data::dense(array![[0.0, 7.0], [0.0, 7.0], [0.0, 7.0], [0.0, 7.0]], 1).unwrap();
        let samples: Vec<usize> = vec![0, 1, 2, 3];
        let leaves: Vec<Option<&[usize]>> = (0..4).map(|_| Some(samples.as_slice())).collect();
        let weights = vec![(0, 0.25), (1, 0.25), (2, 0.25), (3, 0.25)];
        let variance =
            RegressionPredictionStrategy.compute_variance(&data, &data, 0, &weights, &leaves, 2);
        assert_eq!(variance, 0.0);
    }
}
