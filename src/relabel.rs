//! Relabeling strategies
//!
//! A relabeling strategy maps a node's training samples to the
//! pseudo-outcomes the splitting rule scores. Regression uses the outcomes
//! unchanged; causal, instrumental, and survival forests substitute their own
//! pseudo-outcomes here without touching the splitter.

use crate::data::Data;

/// Produces pseudo-outcomes for a node, or `None` to signal that the node
/// cannot be split and must become a leaf.
pub trait RelabelingStrategy: Send + Sync {
    fn relabel(&self, samples: &[usize], data: &Data) -> Option<Vec<f64>>;
}

/// Identity relabeling for regression forests.
pub struct RegressionRelabeler;

impl RelabelingStrategy for RegressionRelabeler {
    fn relabel(&self, samples: &[usize], data: &Data) -> Option<Vec<f64>> {
        Some(samples.iter().map(|&s| data.outcome(s)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regression_relabeler_is_identity() {
        let data = Data::dense(array![[0.0, 1.5], [0.0, -2.0], [0.0, 0.25]], 1).unwrap();
        let relabeled = RegressionRelabeler.relabel(&[0, 2], &data).unwrap();
        assert_eq!(relabeled, vec![1.5, 0.25]);
    }
}
