//! Half-sample variance accumulation
//!
//! Trees are grown in groups sharing a first-stage half-sample. Comparing
//! the spread of per-group kernel averages against the spread across single
//! trees separates sampling variance from within-group noise; an objective
//! Bayes shrinkage keeps the estimate non-negative.

use statrs::function::erf::erfc;

/// Threshold on the standardized initial estimate above which no shrinkage
/// is applied.
const SHRINKAGE_CUTOFF: f64 = 3.5;

/// Combine per-tree statistics `psi[t]` (`None` for trees that did not
/// contribute to the query) into the debiased between-group variance. A
/// group is good when every one of its trees contributed; fewer than two
/// good groups yields `NaN`.
pub(crate) fn half_sample_variance(psi: &[Option<f64>], group_size: usize) -> f64 {
    let num_groups = psi.len() / group_size;
    let mut good_groups = 0usize;
    let mut sum_group = 0.0;
    let mut sum_group_sq = 0.0;
    let mut sum_tree = 0.0;
    let mut sum_tree_sq = 0.0;
    for group in 0..num_groups {
        let members = &psi[group * group_size..(group + 1) * group_size];
        if members.iter().any(|p| p.is_none()) {
            continue;
        }
        good_groups += 1;
        let mut group_psi = 0.0;
        for p in members.iter().flatten() {
            sum_tree += p;
            sum_tree_sq += p * p;
            group_psi += p;
        }
        group_psi /= group_size as f64;
        sum_group += group_psi;
        sum_group_sq += group_psi * group_psi;
    }
    if good_groups < 2 {
        return f64::NAN;
    }

    let num_groups = good_groups as f64;
    let num_trees = num_groups * group_size as f64;
    let group_mean = sum_group / num_groups;
    let var_between = sum_group_sq / num_groups - group_mean * group_mean;
    let tree_mean = sum_tree / num_trees;
    let var_total = sum_tree_sq / num_trees - tree_mean * tree_mean;
    let group_noise = (var_total - var_between) / (group_size as f64 - 1.0);
    debias(var_between, group_noise, num_groups)
}

/// Objective Bayes debiaser: the posterior mean of the true between-group
/// variance under a flat prior on `[0, inf)`, with the raw estimate
/// `var_between - group_noise` treated as normal with scale
/// `sqrt(2 / num_good_groups) * group_noise`. Equals the raw estimate when
/// it is comfortably positive, shrinks toward zero as the noise dominates,
/// and never goes negative.
pub(crate) fn debias(var_between: f64, group_noise: f64, num_good_groups: f64) -> f64 {
    let initial = var_between - group_noise;
    let scale = (2.0 / num_good_groups).sqrt() * group_noise;
    if !(scale > 0.0) || !scale.is_finite() {
        return initial.max(0.0);
    }
    let standardized = initial / scale;
    if standardized >= SHRINKAGE_CUTOFF {
        return initial;
    }
    let density = (-standardized * standardized / 2.0).exp() / (2.0 * std::f64::consts::PI).sqrt();
    let mass = 0.5 * erfc(-standardized / std::f64::consts::SQRT_2);
    if mass <= f64::MIN_POSITIVE {
        return 0.0;
    }
    (initial + scale * density / mass).max(0.0)
}
