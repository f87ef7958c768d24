//! Trained forests
//!
//! A forest is an ordered sequence of trees plus the metadata needed to
//! predict: the training column count, the outcome index, and the
//! confidence-interval group size it was grown with.

mod predictor;
mod trainer;

pub use predictor::ForestPredictor;
pub use trainer::ForestTrainer;

use crate::error::{GrfError, Result};
use crate::tree::Tree;
use serde::{Deserialize, Serialize};

/// Version byte prefixed to serialized forests.
const FOREST_FORMAT_VERSION: u8 = 1;

/// An immutable trained forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forest {
    trees: Vec<Tree>,
    num_features: usize,
    outcome_index: usize,
    ci_group_size: usize,
}

impl Forest {
    pub(crate) fn new(
        trees: Vec<Tree>,
        num_features: usize,
        outcome_index: usize,
        ci_group_size: usize,
    ) -> Self {
        debug_assert!(trees.len() % ci_group_size == 0);
        Self {
            trees,
            num_features,
            outcome_index,
            ci_group_size,
        }
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn outcome_index(&self) -> usize {
        self.outcome_index
    }

    /// Group size the forest was trained with; 1 means no CI groups.
    pub fn ci_group_size(&self) -> usize {
        self.ci_group_size
    }

    /// Serialize to a versioned byte stream sufficient to restore the trees,
    /// their out-of-bag sets, and the forest metadata.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = vec![FOREST_FORMAT_VERSION];
        bytes.extend(bincode::serialize(self)?);
        Ok(bytes)
    }

    /// Restore a forest serialized by [`Forest::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes.first() {
            Some(&FOREST_FORMAT_VERSION) => Ok(bincode::deserialize(&bytes[1..])?),
            Some(&version) => Err(GrfError::Serialization(format!(
                "unsupported forest format version {}",
                version
            ))),
            None => Err(GrfError::Serialization(
                "empty forest byte stream".to_string(),
            )),
        }
    }
}
