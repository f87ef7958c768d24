//! Growing a single tree

use super::{Node, Tree};
use crate::config::TreeOptions;
use crate::data::Data;
use crate::relabel::RelabelingStrategy;
use crate::sampling::RandomSampler;
use crate::splitting::{min_child_size, Split, SplittingRule};

/// Fraction of the in-bag rows used to choose splits when honesty is on;
/// the remainder populates the leaves.
const HONESTY_FRACTION: f64 = 0.5;

/// Grows one tree from an in-bag draw using the sampler for feature
/// selection, the relabeler for pseudo-outcomes, and the splitting rule for
/// the per-node search.
pub struct TreeTrainer<'a> {
    data: &'a Data,
    options: &'a TreeOptions,
    splitter: &'a dyn SplittingRule,
    relabeler: &'a dyn RelabelingStrategy,
    disallowed_features: Vec<usize>,
    mtry: usize,
}

struct Partition {
    split_left: Vec<usize>,
    split_right: Vec<usize>,
    honest_left: Vec<usize>,
    honest_right: Vec<usize>,
}

impl<'a> TreeTrainer<'a> {
    pub fn new(
        data: &'a Data,
        options: &'a TreeOptions,
        splitter: &'a dyn SplittingRule,
        relabeler: &'a dyn RelabelingStrategy,
    ) -> Self {
        let disallowed_features = data.disallowed_split_columns();
        let available = data.num_cols() - disallowed_features.len();
        // mtry = 0 asks for the square-root heuristic.
        let mtry = match options.mtry {
            0 => (available as f64).sqrt().ceil() as usize,
            m => m,
        };
        Self {
            data,
            options,
            splitter,
            relabeler,
            disallowed_features,
            mtry: mtry.min(available).max(1),
        }
    }

    /// Train a tree on `in_bag`. With honesty, the in-bag rows are split
    /// 50/50 into a splitting sample and an honest sample; leaves record the
    /// honest rows that reach them.
    pub fn train(
        &self,
        sampler: &mut RandomSampler,
        in_bag: Vec<usize>,
        oob_samples: Vec<usize>,
    ) -> Tree {
        let (split_set, honest_set) = if self.options.honesty {
            sampler.subsample(&in_bag, HONESTY_FRACTION)
        } else {
            (in_bag.clone(), in_bag)
        };
        let mut nodes = Vec::new();
        self.grow(&mut nodes, sampler, split_set, honest_set);
        Tree::new(nodes, oob_samples)
    }

    /// Depth-first expansion; the node takes its slot before its children so
    /// the root lands at id 0 and child order is fixed by construction.
    fn grow(
        &self,
        nodes: &mut Vec<Node>,
        sampler: &mut RandomSampler,
        split_samples: Vec<usize>,
        honest_samples: Vec<usize>,
    ) -> usize {
        let id = nodes.len();
        nodes.push(Node::Leaf { samples: Vec::new() });
        match self.try_split(sampler, &split_samples, &honest_samples) {
            Some((split, partition)) => {
                let left = self.grow(nodes, sampler, partition.split_left, partition.honest_left);
                let right = self.grow(nodes, sampler, partition.split_right, partition.honest_right);
                nodes[id] = Node::Split {
                    feature: split.feature,
                    value: split.value,
                    send_missing_left: split.send_missing_left,
                    left,
                    right,
                };
            }
            None => {
                nodes[id] = Node::Leaf {
                    samples: honest_samples,
                };
            }
        }
        id
    }

    fn try_split(
        &self,
        sampler: &mut RandomSampler,
        split_samples: &[usize],
        honest_samples: &[usize],
    ) -> Option<(Split, Partition)> {
        if split_samples.len() < 2 * self.options.min_node_size {
            return None;
        }
        let responses = self.relabeler.relabel(split_samples, self.data)?;
        let features = sampler.draw(self.mtry, self.data.num_cols(), &self.disallowed_features);
        let split = self.splitter.find_best_split(
            self.data,
            split_samples,
            &responses,
            &features,
            self.options,
        )?;

        let (split_left, split_right) = self.partition(split_samples, &split);
        let (honest_left, honest_right) = if self.options.honesty {
            let halves = self.partition(honest_samples, &split);
            // The same balance guards apply to the honest partition, so
            // every finalized leaf keeps at least min_node_size prediction
            // samples without post-hoc pruning.
            let floor = min_child_size(honest_samples.len(), self.options);
            if halves.0.len() < floor || halves.1.len() < floor {
                return None;
            }
            halves
        } else {
            (split_left.clone(), split_right.clone())
        };

        Some((
            split,
            Partition {
                split_left,
                split_right,
                honest_left,
                honest_right,
            },
        ))
    }

    fn partition(&self, samples: &[usize], split: &Split) -> (Vec<usize>, Vec<usize>) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        for &sample in samples {
            let observed = self.data.get(sample, split.feature);
            let go_left = if observed.is_nan() {
                split.send_missing_left
            } else {
                observed <= split.value
            };
            if go_left {
                left.push(sample);
            } else {
                right.push(sample);
            }
        }
        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplingOptions;
    use crate::relabel::RegressionRelabeler;
    use crate::splitting::SplittingRuleFactory;
    use ndarray::Array2;

    fn linear_data(rows: usize) -> Data {
        let mut values = Vec::new();
        for i in 0..rows {
            let x = i as f64 / rows as f64;
            values.push(x);
            values.push(2.0 * x);
        }
        Data::dense(Array2::from_shape_vec((rows, 2), values).unwrap(), 1).unwrap()
    }

    fn tree_options(honesty: bool) -> TreeOptions {
        TreeOptions {
            mtry: 1,
            min_node_size: 5,
            honesty,
            alpha: 0.05,
            imbalance_penalty: 0.0,
        }
    }

    fn grow_tree(data: &Data, options: &TreeOptions, seed: u64) -> Tree {
        let splitter = SplittingRuleFactory::regression();
        let relabeler = RegressionRelabeler;
        let trainer = TreeTrainer::new(data, options, splitter.as_ref(), &relabeler);
        let mut sampler = RandomSampler::new(seed, SamplingOptions::default());
        let in_bag: Vec<usize> = (0..data.num_rows()).collect();
        trainer.train(&mut sampler, in_bag, Vec::new())
    }

    fn collect_leaf_samples(tree: &Tree) -> Vec<usize> {
        let mut all = Vec::new();
        for id in 0..tree.num_nodes() {
            if let Some(samples) = tree.leaf_samples(id) {
                all.extend_from_slice(samples);
            }
        }
        all.sort_unstable();
        all
    }

    #[test]
    fn test_leaves_partition_prediction_samples() {
        let data = linear_data(200);
        for honesty in [false, true] {
            let tree = grow_tree(&data, &tree_options(honesty), 11);
            let leaf_samples = collect_leaf_samples(&tree);
            let mut unique = leaf_samples.clone();
            unique.dedup();
            assert_eq!(leaf_samples.len(), unique.len());
            if !honesty {
                assert_eq!(leaf_samples, (0..200).collect::<Vec<usize>>());
            }
        }
    }

    #[test]
    fn test_leaves_meet_min_node_size() {
        let data = linear_data(300);
        let options = tree_options(true);
        let tree = grow_tree(&data, &options, 13);
        let mut found_leaf = false;
        for id in 0..tree.num_nodes() {
            if let Some(samples) = tree.leaf_samples(id) {
                found_leaf = true;
                assert!(
                    samples.len() >= options.min_node_size,
                    "leaf {} holds {} samples",
                    id,
                    samples.len()
                );
            }
        }
        assert!(found_leaf);
    }

    #[test]
    fn test_honest_leaves_exclude_splitting_half() {
        let data = linear_data(100);
        let options = tree_options(true);
        let splitter = SplittingRuleFactory::regression();
        let relabeler = RegressionRelabeler;
        let trainer = TreeTrainer::new(&data, &options, splitter.as_ref(), &relabeler);

        let mut sampler = RandomSampler::new(17, SamplingOptions::default());
        let in_bag: Vec<usize> = (0..100).collect();
        let mut replay = RandomSampler::new(17, SamplingOptions::default());
        let (splitting_half, _) = replay.subsample(&in_bag, 0.5);

        let tree = trainer.train(&mut sampler, in_bag, Vec::new());
        let leaf_samples = collect_leaf_samples(&tree);
        for sample in splitting_half {
            assert!(!leaf_samples.contains(&sample));
        }
    }

    #[test]
    fn test_small_node_becomes_leaf() {
        let data = linear_data(8);
        let tree = grow_tree(&data, &tree_options(false), 19);
        assert_eq!(tree.num_nodes(), 1);
        assert_eq!(tree.leaf_samples(0).unwrap().len(), 8);
    }
}
