//! Configuration structures for GRF Core
//!
//! Immutable option bundles consumed by the forest trainer, the per-tree
//! trainer, and the sampler. All configuration flows through these structs;
//! nothing is read from the environment.

use crate::error::{GrfError, Result};
use serde::{Deserialize, Serialize};

/// Sampling configuration shared by every tree of a forest.
///
/// `clusters` maps cluster id (the outer index) to the row indices that
/// belong to it. An empty vector disables cluster sampling. `sample_weights`
/// are per-row draw weights for the first-stage bootstrap; empty means
/// uniform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SamplingOptions {
    pub sample_weights: Vec<f64>,
    pub clusters: Vec<Vec<usize>>,
    pub samples_per_cluster: usize,
}

impl SamplingOptions {
    /// True when cluster sampling is enabled.
    pub fn clustered(&self) -> bool {
        !self.clusters.is_empty()
    }
}

/// Forest-level training configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestOptions {
    pub num_trees: usize,
    /// Size of the confidence-interval tree groups; 1 disables CIs.
    pub ci_group_size: usize,
    pub sample_fraction: f64,
    /// Number of candidate features drawn at each split; 0 picks
    /// `ceil(sqrt(num_features))`.
    pub mtry: usize,
    /// Minimum number of prediction samples in a leaf.
    pub min_node_size: usize,
    pub honesty: bool,
    /// Minimum child fraction for a legal split, in (0, 0.25].
    pub alpha: f64,
    /// Penalty added to the split score as `penalty * (1/|L| + 1/|R|)`.
    pub imbalance_penalty: f64,
    /// Worker threads for training and prediction; 0 uses all cores.
    pub num_threads: usize,
    pub seed: u64,
    pub sampling: SamplingOptions,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            num_trees: 100,
            ci_group_size: 1,
            sample_fraction: 0.5,
            mtry: 0,
            min_node_size: 5,
            honesty: true,
            alpha: 0.05,
            imbalance_penalty: 0.0,
            num_threads: 0,
            seed: 42,
            sampling: SamplingOptions::default(),
        }
    }
}

impl ForestOptions {
    /// Parse options from a JSON document produced by a binding layer.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        Ok(options)
    }

    /// Serialize options to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Validate the data-independent invariants. Data-dependent checks
    /// (`mtry` against the column count, outcome index range) run in
    /// the trainer once the data dimensions are known.
    pub fn validate(&self) -> Result<()> {
        if self.num_trees == 0 {
            return Err(GrfError::Configuration(
                "num_trees must be positive".to_string(),
            ));
        }
        if self.ci_group_size == 0 || self.num_trees % self.ci_group_size != 0 {
            return Err(GrfError::Configuration(format!(
                "ci_group_size ({}) must be positive and divide num_trees ({})",
                self.ci_group_size, self.num_trees
            )));
        }
        if !(self.alpha > 0.0 && self.alpha <= 0.25) {
            return Err(GrfError::Configuration(format!(
                "alpha must lie in (0, 0.25], got {}",
                self.alpha
            )));
        }
        if !(self.sample_fraction > 0.0 && self.sample_fraction <= 1.0) {
            return Err(GrfError::Configuration(format!(
                "sample_fraction must lie in (0, 1], got {}",
                self.sample_fraction
            )));
        }
        if self.ci_group_size > 1 && self.sample_fraction > 0.5 {
            return Err(GrfError::Configuration(
                "sample_fraction must be at most 0.5 when ci_group_size > 1".to_string(),
            ));
        }
        if self.imbalance_penalty < 0.0 {
            return Err(GrfError::Configuration(format!(
                "imbalance_penalty must be non-negative, got {}",
                self.imbalance_penalty
            )));
        }
        if self.min_node_size == 0 {
            return Err(GrfError::Configuration(
                "min_node_size must be positive".to_string(),
            ));
        }
        for (i, &w) in self.sampling.sample_weights.iter().enumerate() {
            if !w.is_finite() || w < 0.0 {
                return Err(GrfError::Configuration(format!(
                    "sample weight {} is invalid: {}",
                    i, w
                )));
            }
        }
        if self.sampling.clustered() && self.sampling.samples_per_cluster == 0 {
            return Err(GrfError::Configuration(
                "samples_per_cluster must be positive when clusters are provided".to_string(),
            ));
        }
        Ok(())
    }

    /// Derive the per-tree option bundle.
    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            mtry: self.mtry,
            min_node_size: self.min_node_size,
            honesty: self.honesty,
            alpha: self.alpha,
            imbalance_penalty: self.imbalance_penalty,
        }
    }
}

/// Per-tree training configuration, derived from [`ForestOptions`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeOptions {
    pub mtry: usize,
    pub min_node_size: usize,
    pub honesty: bool,
    pub alpha: f64,
    pub imbalance_penalty: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_validate() {
        assert!(ForestOptions::default().validate().is_ok());
    }

    #[test]
    fn test_alpha_out_of_range_rejected() {
        let options = ForestOptions {
            alpha: 0.3,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = ForestOptions {
            alpha: 0.0,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_ci_group_size_must_divide_num_trees() {
        let options = ForestOptions {
            num_trees: 10,
            ci_group_size: 3,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = ForestOptions {
            num_trees: 12,
            ci_group_size: 3,
            ..Default::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_grouped_forest_caps_sample_fraction() {
        let options = ForestOptions {
            ci_group_size: 2,
            num_trees: 10,
            sample_fraction: 0.7,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let options = ForestOptions {
            num_trees: 250,
            seed: 7,
            ..Default::default()
        };
        let json = options.to_json().unwrap();
        let parsed = ForestOptions::from_json(&json).unwrap();
        assert_eq!(parsed.num_trees, 250);
        assert_eq!(parsed.seed, 7);
    }
}
