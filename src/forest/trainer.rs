//! Parallel forest training

use super::Forest;
use crate::config::{ForestOptions, TreeOptions};
use crate::data::Data;
use crate::error::{GrfError, Result};
use crate::relabel::{RegressionRelabeler, RelabelingStrategy};
use crate::sampling::RandomSampler;
use crate::splitting::{SplittingRule, SplittingRuleFactory};
use crate::tree::{Tree, TreeTrainer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// First-stage fraction for confidence-interval groups: each group of trees
/// shares one half-sample of the data.
const CI_GROUP_FRACTION: f64 = 0.5;

/// Orchestrates tree training across a bounded worker pool and assembles
/// the result into a [`Forest`].
pub struct ForestTrainer;

impl ForestTrainer {
    /// Train a regression forest.
    pub fn train(data: &Data, options: &ForestOptions) -> Result<Forest> {
        Self::validate(data, options)?;
        let tree_options = options.tree_options();
        let splitter = SplittingRuleFactory::regression();
        let relabeler = RegressionRelabeler;

        let group_size = options.ci_group_size;
        let num_groups = options.num_trees / group_size;
        // Group seeds are derived sequentially from the forest seed before
        // any parallelism, so the output is identical for every thread
        // count.
        let mut seed_rng = StdRng::seed_from_u64(options.seed);
        let group_seeds: Vec<u64> = (0..num_groups).map(|_| seed_rng.gen()).collect();

        log::info!(
            "training {} trees in {} groups of {}",
            options.num_trees,
            num_groups,
            group_size
        );
        let train_groups = || -> Result<Vec<Vec<Tree>>> {
            group_seeds
                .par_iter()
                .map(|&seed| {
                    Self::train_group(data, options, &tree_options, splitter.as_ref(), &relabeler, seed)
                })
                .collect()
        };
        let groups = if options.num_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(options.num_threads)
                .build()
                .map_err(|e| GrfError::Internal(format!("worker pool: {}", e)))?;
            pool.install(train_groups)?
        } else {
            train_groups()?
        };

        let trees: Vec<Tree> = groups.into_iter().flatten().collect();
        log::debug!("assembled forest of {} trees", trees.len());
        Ok(Forest::new(
            trees,
            data.num_cols(),
            data.outcome_index(),
            group_size,
        ))
    }

    /// Grow one CI group. The group owns the shared first-stage subsample;
    /// each of its trees draws an independent sub-subsample from it.
    fn train_group(
        data: &Data,
        options: &ForestOptions,
        tree_options: &TreeOptions,
        splitter: &dyn SplittingRule,
        relabeler: &dyn RelabelingStrategy,
        seed: u64,
    ) -> Result<Vec<Tree>> {
        let mut sampler = RandomSampler::new(seed, options.sampling.clone());
        let trainer = TreeTrainer::new(data, tree_options, splitter, relabeler);
        let num_rows = data.num_rows();
        let clustered = options.sampling.clustered();

        let mut trees = Vec::with_capacity(options.ci_group_size);
        if options.ci_group_size == 1 {
            let drawn = sampler.sample_clusters(num_rows, options.sample_fraction)?;
            let oob = sampler.out_of_bag(num_rows, &drawn);
            let in_bag = if clustered {
                sampler.sample_from_clusters(&drawn)
            } else {
                drawn
            };
            trees.push(trainer.train(&mut sampler, in_bag, oob));
        } else {
            let shared = sampler.sample_clusters(num_rows, CI_GROUP_FRACTION)?;
            for _ in 0..options.ci_group_size {
                let (drawn, _) =
                    sampler.subsample(&shared, options.sample_fraction / CI_GROUP_FRACTION);
                let oob = sampler.out_of_bag(num_rows, &drawn);
                let in_bag = if clustered {
                    sampler.sample_from_clusters(&drawn)
                } else {
                    drawn
                };
                trees.push(trainer.train(&mut sampler, in_bag, oob));
            }
        }
        Ok(trees)
    }

    fn validate(data: &Data, options: &ForestOptions) -> Result<()> {
        options.validate()?;
        if options.mtry > data.num_cols() {
            return Err(GrfError::Configuration(format!(
                "mtry ({}) exceeds the number of columns ({})",
                options.mtry,
                data.num_cols()
            )));
        }
        let sampling = &options.sampling;
        if !sampling.sample_weights.is_empty() {
            let units = if sampling.clustered() {
                sampling.clusters.len()
            } else {
                data.num_rows()
            };
            if sampling.sample_weights.len() != units {
                return Err(GrfError::Configuration(format!(
                    "{} sample weights supplied for {} sampling units",
                    sampling.sample_weights.len(),
                    units
                )));
            }
        }
        for (cluster, members) in sampling.clusters.iter().enumerate() {
            if members.is_empty() {
                return Err(GrfError::Configuration(format!(
                    "cluster {} is empty",
                    cluster
                )));
            }
            if let Some(&row) = members.iter().find(|&&row| row >= data.num_rows()) {
                return Err(GrfError::Configuration(format!(
                    "cluster {} references row {} outside the data",
                    cluster, row
                )));
            }
        }
        Ok(())
    }
}
