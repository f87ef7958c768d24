//! Forest prediction pipeline

use super::Forest;
use crate::data::Data;
use crate::error::{GrfError, Result};
use crate::prediction::{Prediction, PredictionStrategy, SampleWeights};
use rayon::prelude::*;
use std::collections::HashMap;

/// Computes per-query forest kernels and feeds them to a prediction
/// strategy. All per-query state is local; the forest and the data are
/// shared read-only across the worker pool.
pub struct ForestPredictor<'a> {
    forest: &'a Forest,
    train_data: &'a Data,
    num_threads: usize,
    ci_group_size: usize,
}

impl<'a> ForestPredictor<'a> {
    /// `ci_group_size` of 1 disables variance estimation; larger values
    /// must divide the number of trees and replay the grouping the forest
    /// was trained with.
    pub fn new(
        forest: &'a Forest,
        train_data: &'a Data,
        num_threads: usize,
        ci_group_size: usize,
    ) -> Result<Self> {
        if ci_group_size == 0 || forest.num_trees() % ci_group_size != 0 {
            return Err(GrfError::Configuration(format!(
                "ci_group_size ({}) must be positive and divide the tree count ({})",
                ci_group_size,
                forest.num_trees()
            )));
        }
        if train_data.num_cols() != forest.num_features() {
            return Err(GrfError::DataProcessing(format!(
                "forest was trained on {} columns, data has {}",
                forest.num_features(),
                train_data.num_cols()
            )));
        }
        Ok(Self {
            forest,
            train_data,
            num_threads,
            ci_group_size,
        })
    }

    /// Predict every row of `query_data` using all trees.
    pub fn predict(
        &self,
        query_data: &Data,
        strategy: &dyn PredictionStrategy,
    ) -> Result<Vec<Prediction>> {
        if query_data.num_cols() != self.forest.num_features() {
            return Err(GrfError::DataProcessing(format!(
                "forest was trained on {} columns, queries have {}",
                self.forest.num_features(),
                query_data.num_cols()
            )));
        }
        self.run(query_data, false, strategy)
    }

    /// Out-of-bag prediction on the training data: each row is predicted
    /// only by the trees that did not train on it.
    pub fn predict_oob(&self, strategy: &dyn PredictionStrategy) -> Result<Vec<Prediction>> {
        self.run(self.train_data, true, strategy)
    }

    fn run(
        &self,
        query_data: &Data,
        oob: bool,
        strategy: &dyn PredictionStrategy,
    ) -> Result<Vec<Prediction>> {
        log::debug!(
            "predicting {} queries over {} trees (oob: {})",
            query_data.num_rows(),
            self.forest.num_trees(),
            oob
        );
        let rows: Vec<usize> = (0..query_data.num_rows()).collect();
        let predict_all = || -> Result<Vec<Prediction>> {
            rows.par_iter()
                .map(|&row| self.predict_query(query_data, row, oob, strategy))
                .collect()
        };
        if self.num_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.num_threads)
                .build()
                .map_err(|e| GrfError::Internal(format!("worker pool: {}", e)))?;
            pool.install(predict_all)
        } else {
            predict_all()
        }
    }

    fn predict_query(
        &self,
        query_data: &Data,
        row: usize,
        oob: bool,
        strategy: &dyn PredictionStrategy,
    ) -> Result<Prediction> {
        // Leaf memberships per tree; None marks a tree skipped because the
        // query row was in its bag.
        let mut leaves: Vec<Option<&[usize]>> = Vec::with_capacity(self.forest.num_trees());
        for tree in self.forest.trees() {
            if oob && !tree.is_oob(row) {
                leaves.push(None);
                continue;
            }
            let leaf = tree.find_leaf(query_data, row);
            leaves.push(tree.leaf_samples(leaf));
        }

        let weights = match Self::kernel_weights(&leaves) {
            Some(weights) => weights,
            None => {
                return Ok(Prediction {
                    estimates: vec![f64::NAN; strategy.num_outputs()],
                    variance: if self.ci_group_size > 1 {
                        Some(f64::NAN)
                    } else {
                        None
                    },
                    undefined: true,
                })
            }
        };

        let estimates = strategy.predict(self.train_data, query_data, row, &weights)?;
        let variance = if self.ci_group_size > 1 {
            Some(strategy.compute_variance(
                self.train_data,
                query_data,
                row,
                &weights,
                &leaves,
                self.ci_group_size,
            ))
        } else {
            None
        };
        Ok(Prediction {
            estimates,
            variance,
            undefined: false,
        })
    }

    /// Sum normalized leaf-membership weights over the contributing trees.
    /// Returns `None` when no tree reached the query. The map stays sparse;
    /// normalization to a unit sum is one pass at the end.
    fn kernel_weights(leaves: &[Option<&[usize]>]) -> Option<SampleWeights> {
        let mut map: HashMap<usize, f64> = HashMap::new();
        let mut used = false;
        for leaf in leaves.iter().flatten() {
            used = true;
            if leaf.is_empty() {
                continue;
            }
            let share = 1.0 / leaf.len() as f64;
            for &sample in *leaf {
                *map.entry(sample).or_insert(0.0) += share;
            }
        }
        if !used || map.is_empty() {
            return None;
        }
        let total: f64 = map.values().sum();
        let mut weights: SampleWeights = map
            .into_iter()
            .map(|(sample, weight)| (sample, weight / total))
            .collect();
        weights.sort_unstable_by_key(|&(sample, _)| sample);
        Some(weights)
    }
}
