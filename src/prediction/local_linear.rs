//! Local linear prediction strategy

use super::variance::half_sample_variance;
use super::{PredictionStrategy, SampleWeights};
use crate::data::Data;
use crate::error::{GrfError, Result};
use nalgebra::{Cholesky, DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How the ridge penalty scales the off-intercept diagonal of the normal
/// equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RidgeType {
    /// Every penalized coordinate gets `lambda * trace(M) / (|V| + 1)`.
    Unweighted,
    /// Each coordinate is scaled by its own diagonal entry,
    /// `M[j,j] *= 1 + lambda`.
    Covariance,
}

/// Weighted ridge regression of outcomes on covariates centered at the
/// query. The intercept of the fit is the prediction; the slope coordinates
/// absorb the local trend of the chosen correction variables.
pub struct LocalLinearPredictionStrategy {
    lambdas: Vec<f64>,
    ridge_type: RidgeType,
    /// Linear correction variables: the covariate columns entering the
    /// design matrix as centered regressors.
    variables: Vec<usize>,
}

impl LocalLinearPredictionStrategy {
    pub fn new(lambdas: Vec<f64>, ridge_type: RidgeType, variables: Vec<usize>) -> Result<Self> {
        if lambdas.is_empty() {
            return Err(GrfError::Configuration(
                "at least one ridge penalty is required".to_string(),
            ));
        }
        for &lambda in &lambdas {
            if !lambda.is_finite() || lambda < 0.0 {
                return Err(GrfError::Configuration(format!(
                    "ridge penalty must be finite and non-negative, got {}",
                    lambda
                )));
            }
        }
        Ok(Self {
            lambdas,
            ridge_type,
            variables,
        })
    }

    /// Design row for one training sample: intercept plus covariates
    /// centered at the query point.
    fn design_row(
        &self,
        train_data: &Data,
        sample: usize,
        query_data: &Data,
        query_row: usize,
        row: &mut [f64],
    ) {
        row[0] = 1.0;
        for (j, &variable) in self.variables.iter().enumerate() {
            row[j + 1] = train_data.get(sample, variable) - query_data.get(query_row, variable);
        }
    }

    /// Accumulate `M = X^T W X` and `X^T W Y` over the non-zero weights.
    fn normal_equations(
        &self,
        train_data: &Data,
        query_data: &Data,
        query_row: usize,
        weights: &SampleWeights,
    ) -> (DMatrix<f64>, DVector<f64>) {
        let dim = self.variables.len() + 1;
        let mut m = DMatrix::<f64>::zeros(dim, dim);
        let mut rhs = DVector::<f64>::zeros(dim);
        let mut row = vec![0.0; dim];
        for &(sample, weight) in weights {
            self.design_row(train_data, sample, query_data, query_row, &mut row);
            let outcome = train_data.outcome(sample);
            for i in 0..dim {
                let wi = weight * row[i];
                rhs[i] += wi * outcome;
                for j in 0..dim {
                    m[(i, j)] += wi * row[j];
                }
            }
        }
        (m, rhs)
    }

    /// Ridge-regularize a copy of `M` on the off-intercept diagonal only.
    fn regularized(&self, m: &DMatrix<f64>, lambda: f64) -> DMatrix<f64> {
        let dim = m.nrows();
        let mut reg = m.clone();
        match self.ridge_type {
            RidgeType::Unweighted => {
                let amount = lambda * m.trace() / dim as f64;
                for j in 1..dim {
                    reg[(j, j)] += amount;
                }
            }
            RidgeType::Covariance => {
                for j in 1..dim {
                    reg[(j, j)] += lambda * reg[(j, j)];
                }
            }
        }
        reg
    }

    /// Point-estimate fallback when the regularized system is singular or
    /// indefinite: the intercept of the unpenalized least-squares solution,
    /// or the weighted outcome mean if even that fails.
    fn fallback_estimate(
        &self,
        m: &DMatrix<f64>,
        rhs: &DVector<f64>,
        train_data: &Data,
        weights: &SampleWeights,
    ) -> f64 {
        if let Some(theta) = m.clone().lu().solve(rhs) {
            if theta[0].is_finite() {
                return theta[0];
            }
        }
        weights
            .iter()
            .map(|&(sample, weight)| weight * train_data.outcome(sample))
            .sum()
    }
}

impl PredictionStrategy for LocalLinearPredictionStrategy {
    fn num_outputs(&self) -> usize {
        self.lambdas.len()
    }

    fn predict(
        &self,
        train_data: &Data,
        query_data: &Data,
        query_row: usize,
        weights: &SampleWeights,
    ) -> Result<Vec<f64>> {
        let (m, rhs) = self.normal_equations(train_data, query_data, query_row, weights);
        let mut estimates = Vec::with_capacity(self.lambdas.len());
        for &lambda in &self.lambdas {
            let reg = self.regularized(&m, lambda);
            let estimate = match Cholesky::new(reg) {
                Some(cholesky) => cholesky.solve(&rhs)[0],
                None => self.fallback_estimate(&m, &rhs, train_data, weights),
            };
            estimates.push(estimate);
        }
        Ok(estimates)
    }

    fn compute_variance(
        &self,
        train_data: &Data,
        query_data: &Data,
        query_row: usize,
        weights: &SampleWeights,
        leaves: &[Option<&[usize]>],
        ci_group_size: usize,
    ) -> f64 {
        let dim = self.variables.len() + 1;
        let (m, rhs) = self.normal_equations(train_data, query_data, query_row, weights);
        let reg = self.regularized(&m, self.lambdas[0]);
        let cholesky = match Cholesky::new(reg) {
            Some(cholesky) => cholesky,
            None => return f64::NAN,
        };
        let theta = cholesky.solve(&rhs);
        let mut unit = DVector::<f64>::zeros(dim);
        unit[0] = 1.0;
        let zeta = cholesky.solve(&unit);

        // Influence-function pseudo-residuals for every kernel sample.
        let mut residuals: HashMap<usize, f64> = HashMap::with_capacity(weights.len());
        let mut row = vec![0.0; dim];
        for &(sample, _) in weights {
            self.design_row(train_data, sample, query_data, query_row, &mut row);
            let projected: f64 = (0..dim).map(|i| row[i] * zeta[i]).sum();
            let fitted: f64 = (0..dim).map(|i| row[i] * theta[i]).sum();
            residuals.insert(sample, projected * (train_data.outcome(sample) - fitted));
        }

        let psi: Vec<Option<f64>> = leaves
            .iter()
            .map(|leaf| {
                leaf.and_then(|samples| {
                    if samples.is_empty() {
                        None
                    } else {
                        let sum: f64 = samples
                            .iter()
                            .map(|s| residuals.get(s).copied().unwrap_or(0.0))
                            .sum();
                        Some(sum / samples.len() as f64)
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
    use crate::prediction::RegressionPredictionStrategy;
    use ndarray::Array2;

    fn linear_data() -> Data {
        // y = 3x over x in [0.1, 1.0].
        let rows = 10;
        let mut values = Vec::new();
        for i in 1..=rows {
            let x = i as f64 / 10.0;
            values.push(x);
            values.push(3.0 * x);
        }
        Data::dense(Array2::from_shape_vec((rows, 2), values).unwrap(), 1).unwrap()
    }

    fn uniform_weights(n: usize) -> SampleWeights {
        (0..n).map(|i| (i, 1.0 / n as f64)).collect()
    }

    #[test]
    fn test_recovers_linear_function_exactly() {
        let data = linear_data();
        // Query at x = 0.3: column 0 is the covariate, outcome is column 1.
        let query = Data::dense(Array2::from_shape_vec((1, 2), vec![0.3, 0.0]).unwrap(), 1).unwrap();
        let strategy =
            LocalLinearPredictionStrategy::new(vec![0.0], RidgeType::Unweighted, vec![0]).unwrap();
        let estimates = strategy
            .predict(&data, &query, 0, &uniform_weights(10))
            .unwrap();
        assert!((estimates[0] - 0.9).abs() < 1e-9, "estimate {}", estimates[0]);
    }

    #[test]
    fn test_no_correction_variables_matches_regression() {
        let data = linear_data();
        let weights = uniform_weights(10);
        let strategy =
            LocalLinearPredictionStrategy::new(vec![0.0], RidgeType::Unweighted, vec![]).unwrap();
        let local = strategy.predict(&data, &data, 0, &weights).unwrap();
        let plain = RegressionPredictionStrategy
            .predict(&data, &data, 0, &weights)
            .unwrap();
        assert!((local[0] - plain[0]).abs() < 1e-9);
    }

    #[test]
    fn test_multiple_lambdas_produce_one_estimate_each() {
        let data = linear_data();
        let strategy = LocalLinearPredictionStrategy::new(
            vec![0.0, 0.1, 1.0],
            RidgeType::Covariance,
            vec![0],
        )
        .unwrap();
        let query = Data::dense(Array2::from_shape_vec((1, 2), vec![0.5, 0.0]).unwrap(), 1).unwrap();
        let estimates = strategy
            .predict(&data, &query, 0, &uniform_weights(10))
            .unwrap();
        assert_eq!(estimates.len(), 3);
        assert!(estimates.iter().all(|e| e.is_finite()));
        // The unpenalized fit interpolates exactly; penalties shrink the
        // slope so the estimates move away from the truth monotonically.
        assert!((estimates[0] - 1.5).abs() <= (estimates[1] - 1.5).abs());
        assert!((estimates[1] - 1.5).abs() <= (estimates[2] - 1.5).abs());
    }

    #[test]
    fn test_singular_system_falls_back_to_weighted_mean() {
        // Every sample sits exactly at the query, so the centered column is
        // zero and the normal equations are singular.
        let values = vec![0.5, 1.0, 0.5, 2.0, 0.5, 3.0];
        let data = Data::dense(Array2::from_shape_vec((3, 2), values).unwrap(), 1).unwrap();
        let query = Data::dense(Array2::from_shape_vec((1, 2), vec![0.5, 0.0]).unwrap(), 1).unwrap();
        let strategy =
            LocalLinearPredictionStrategy::new(vec![0.0], RidgeType::Unweighted, vec![0]).unwrap();
        let estimates = strategy
            .predict(&data, &query, 0, &uniform_weights(3))
            .unwrap();
        assert!((estimates[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_negative_lambda() {
        assert!(
            LocalLinearPredictionStrategy::new(vec![-0.5], RidgeType::Unweighted, vec![0]).is_err()
        );
    }
}
