//! Regression splitting criterion

use super::{Split, SplittingRule};
use crate::config::TreeOptions;
use crate::data::Data;

/// Scores a split of node samples `S` into `L` and `R` as
/// `(sum_L)^2 / |L| + (sum_R)^2 / |R| - penalty * (1/|L| + 1/|R|)` over the
/// pseudo-outcomes, the decrease-of-impurity criterion for weighted means.
pub struct RegressionSplittingRule;

struct Candidate {
    feature: usize,
    value: f64,
    send_missing_left: bool,
    decrease: f64,
}

impl SplittingRule for RegressionSplittingRule {
    fn find_best_split(
        &self,
        data: &Data,
        samples: &[usize],
        responses: &[f64],
        candidate_features: &[usize],
        options: &TreeOptions,
    ) -> Option<Split> {
        let mut best: Option<Candidate> = None;
        for &feature in candidate_features {
            if let Some(candidate) = best_split_on_feature(data, samples, responses, feature, options)
            {
                // Strict comparison keeps the earlier candidate on ties,
                // which is the smaller-|L| (lower-threshold) split.
                if best.as_ref().map_or(true, |b| candidate.decrease > b.decrease) {
                    best = Some(candidate);
                }
            }
        }
        best.filter(|b| b.decrease > 0.0).map(|b| Split {
            feature: b.feature,
            value: b.value,
            send_missing_left: b.send_missing_left,
        })
    }
}

fn best_split_on_feature(
    data: &Data,
    samples: &[usize],
    responses: &[f64],
    feature: usize,
    options: &TreeOptions,
) -> Option<Candidate> {
    let num_samples = samples.len();
    let mut present: Vec<(f64, f64)> = Vec::with_capacity(num_samples);
    let mut missing_count = 0usize;
    let mut missing_sum = 0.0;
    for (i, &sample) in samples.iter().enumerate() {
        let value = data.get(sample, feature);
        if value.is_nan() {
            missing_count += 1;
            missing_sum += responses[i];
        } else {
            present.push((value, responses[i]));
        }
    }
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.0.total_cmp(&b.0));

    let total_sum = present.iter().map(|&(_, r)| r).sum::<f64>() + missing_sum;
    let min_child = min_child_size(num_samples, options);

    let mut best: Option<Candidate> = None;
    let mut left_count = 0usize;
    let mut left_sum = 0.0;
    for i in 0..present.len() {
        left_count += 1;
        left_sum += present[i].1;
        // Thresholds sit between distinct consecutive values.
        if i + 1 < present.len() && present[i + 1].0 <= present[i].0 {
            continue;
        }
        let threshold = present[i].0;
        // Missing values go en bloc to whichever side scores higher; with
        // no missing values the flag is an inert default.
        let sides: &[bool] = if missing_count == 0 { &[true] } else { &[false, true] };
        for &missing_left in sides {
            let n_left = left_count + if missing_left { missing_count } else { 0 };
            let n_right = num_samples - n_left;
            if n_left < min_child || n_right < min_child {
                continue;
            }
            let sum_left = left_sum + if missing_left { missing_sum } else { 0.0 };
            let sum_right = total_sum - sum_left;
            let decrease = sum_left * sum_left / n_left as f64
                + sum_right * sum_right / n_right as f64
                - options.imbalance_penalty * (1.0 / n_left as f64 + 1.0 / n_right as f64);
            if best.as_ref().map_or(true, |b| decrease > b.decrease) {
                best = Some(Candidate {
                    feature,
                    value: threshold,
                    send_missing_left: missing_left,
                    decrease,
                });
            }
        }
    }
    best
}

/// Both children of a legal split must hold at least
/// `max(min_node_size, ceil(alpha * |S|))` samples.
pub(crate) fn min_child_size(num_samples: usize, options: &TreeOptions) -> usize {
    let balance_floor = (options.alpha * num_samples as f64).ceil() as usize;
    options.min_node_size.max(balance_floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn options() -> TreeOptions {
        TreeOptions {
            mtry: 1,
            min_node_size: 1,
            honesty: false,
            alpha: 0.05,
            imbalance_penalty: 0.0,
        }
    }

    fn step_data() -> Data {
        // x in column 0, y = step(x > 0.45) in column 1.
        let rows = 20;
        let mut values = Vec::new();
        for i in 0..rows {
            let x = i as f64 / rows as f64;
            values.push(x);
            values.push(if x > 0.45 { 1.0 } else { 0.0 });
        }
        Data::dense(Array2::from_shape_vec((rows, 2), values).unwrap(), 1).unwrap()
    }

    #[test]
    fn test_recovers_step_threshold() {
        let data = step_data();
        let samples: Vec<usize> = (0..20).collect();
        let responses: Vec<f64> = samples.iter().map(|&s| data.outcome(s)).collect();
        let split = RegressionSplittingRule
            .find_best_split(&data, &samples, &responses, &[0], &options())
            .unwrap();
        assert_eq!(split.feature, 0);
        assert!((split.value - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_min_child_size_blocks_edge_splits() {
        let data = step_data();
        let samples: Vec<usize> = (0..20).collect();
        let responses: Vec<f64> = samples.iter().map(|&s| data.outcome(s)).collect();
        let strict = TreeOptions {
            min_node_size: 11,
            ..options()
        };
        // No split can give both children 11 of 20 samples.
        assert!(RegressionSplittingRule
            .find_best_split(&data, &samples, &responses, &[0], &strict)
            .is_none());
    }

    #[test]
    fn test_constant_feature_yields_no_split() {
        let values = vec![1.0, 5.0, 1.0, 6.0, 1.0, 7.0, 1.0, 8.0];
        let data = Data::dense(Array2::from_shape_vec((4, 2), values).unwrap(), 1).unwrap();
        let samples: Vec<usize> = (0..4).collect();
        let responses: Vec<f64> = samples.iter().map(|&s| data.outcome(s)).collect();
        assert!(RegressionSplittingRule
            .find_best_split(&data, &samples, &responses, &[0], &options())
            .is_none());
    }

    #[test]
    fn test_missing_values_routed_to_better_side() {
        // Rows with missing x share the high outcome of large x; sending
        // them right separates the outcomes cleanly.
        let values = vec![
            0.1, 0.0, //
            0.2, 0.0, //
            0.3, 0.0, //
            0.8, 1.0, //
            0.9, 1.0, //
            f64::NAN, 1.0, //
            f64::NAN, 1.0, //
            f64::NAN, 1.0, //
        ];
        let data = Data::dense(Array2::from_shape_vec((8, 2), values).unwrap(), 1).unwrap();
        let samples: Vec<usize> = (0..8).collect();
        let responses: Vec<f64> = samples.iter().map(|&s| data.outcome(s)).collect();
        let split = RegressionSplittingRule
            .find_best_split(&data, &samples, &responses, &[0], &options())
            .unwrap();
        assert!(!split.send_missing_left);
        assert!(split.value >= 0.3 && split.value < 0.8);
    }

    #[test]
    fn test_ties_prefer_smaller_left_child() {
        // Constant outcome makes every legal split score identically.
        let values = vec![0.0, 7.0, 1.0, 7.0, 2.0, 7.0, 3.0, 7.0, 4.0, 7.0, 5.0, 7.0];
        let data = Data::dense(Array2::from_shape_vec((6, 2), values).unwrap(), 1).unwrap();
        let samples: Vec<usize> = (0..6).collect();
        let responses: Vec<f64> = samples.iter().map(|&s| data.outcome(s)).collect();
        let split = RegressionSplittingRule
            .find_best_split(&data, &samples, &responses, &[0], &options())
            .unwrap();
        assert_eq!(split.value, 0.0);
    }
}
