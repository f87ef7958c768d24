//! Forest introspection

use crate::forest::Forest;
use crate::tree::Node;
use ndarray::Array2;

/// Count how often each feature is split on in the first `max_depth` levels
/// of the forest. Row `d` of the result holds the per-feature split counts
/// at depth `d`, accumulated over all trees.
pub fn split_frequencies(forest: &Forest, max_depth: usize) -> Array2<usize> {
    let mut counts = Array2::zeros((max_depth, forest.num_features()));
    for tree in forest.trees() {
        let mut frontier = vec![(0usize, 0usize)];
        while let Some((id, depth)) = frontier.pop() {
            if depth >= max_depth {
                continue;
            }
            if let Node::Split {
                feature,
                left,
                right,
                ..
            } = tree.node(id)
            {
                counts[[depth, *feature]] += 1;
                frontier.push((*left, depth + 1));
                frontier.push((*right, depth + 1));
            }
        }
    }
    counts
}
