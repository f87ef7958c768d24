//! Seeded sampler used by tree training

use crate::config::SamplingOptions;
use crate::error::{GrfError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Mean at which Poisson sampling switches from inversion by sequential
/// search to the rounded-normal rejection method.
const POISSON_NORMAL_APPROX_MEAN: f64 = 30.0;

/// Deterministic sampler. Given the same seed, options, and row count, every
/// draw sequence is bit-identical regardless of how many worker threads the
/// enclosing trainer runs.
pub struct RandomSampler {
    rng: StdRng,
    options: SamplingOptions,
}

impl RandomSampler {
    pub fn new(seed: u64, options: SamplingOptions) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            options,
        }
    }

    /// First-stage bootstrap draw. Returns cluster ids when clustering is
    /// enabled, row ids otherwise; `floor(count * fraction)` units without
    /// replacement, weighted when draw weights are configured.
    pub fn sample_clusters(&mut self, num_rows: usize, sample_fraction: f64) -> Result<Vec<usize>> {
        let count = if self.options.clustered() {
            self.options.clusters.len()
        } else {
            num_rows
        };
        let num_samples = (count as f64 * sample_fraction) as usize;
        if self.options.sample_weights.is_empty() {
            Ok(self.draw(num_samples, count, &[]))
        } else {
            self.draw_weighted(num_samples, count)
        }
    }

    /// Expand first-stage cluster ids into row ids: `samples_per_cluster`
    /// rows drawn uniformly per cluster, or the whole cluster when it is
    /// smaller.
    pub fn sample_from_clusters(&mut self, cluster_ids: &[usize]) -> Vec<usize> {
        let samples_per_cluster = self.options.samples_per_cluster;
        let mut rows = Vec::new();
        for &cluster in cluster_ids {
            let cluster_size = self.options.clusters[cluster].len();
            if cluster_size <= samples_per_cluster {
                rows.extend_from_slice(&self.options.clusters[cluster]);
            } else {
                let chosen = self.draw(samples_per_cluster, cluster_size, &[]);
                let members = &self.options.clusters[cluster];
                rows.extend(chosen.into_iter().map(|i| members[i]));
            }
        }
        rows
    }

    /// Rows that are out of bag for a tree whose first-stage draw was
    /// `drawn` (cluster ids when clustering is on, row ids otherwise).
    pub fn out_of_bag(&self, num_rows: usize, drawn: &[usize]) -> Vec<usize> {
        let mut in_bag = vec![false; num_rows];
        if self.options.clustered() {
            for &cluster in drawn {
                for &row in &self.options.clusters[cluster] {
                    in_bag[row] = true;
                }
            }
        } else {
            for &row in drawn {
                in_bag[row] = true;
            }
        }
        (0..num_rows).filter(|&row| !in_bag[row]).collect()
    }

    /// Shuffle `pool` and split it into a prefix of `ceil(|pool| * fraction)`
    /// elements and the remainder.
    pub fn subsample(&mut self, pool: &[usize], fraction: f64) -> (Vec<usize>, Vec<usize>) {
        let mut shuffled = pool.to_vec();
        shuffled.shuffle(&mut self.rng);
        let cutoff = (pool.len() as f64 * fraction).ceil() as usize;
        let rest = shuffled.split_off(cutoff.min(shuffled.len()));
        (shuffled, rest)
    }

    /// Draw `num_samples` distinct integers from `[0, max)` excluding
    /// `skip` (sorted ascending). Rejection sampling when the request is
    /// sparse, Knuth selection sampling when it is dense; both are uniform
    /// conditional on the skip set. The result is sorted.
    pub fn draw(&mut self, num_samples: usize, max: usize, skip: &[usize]) -> Vec<usize> {
        if num_samples < max / 2 {
            self.draw_simple(num_samples, max, skip)
        } else {
            self.draw_knuth(num_samples, max, skip)
        }
    }

    fn draw_simple(&mut self, num_samples: usize, max: usize, skip: &[usize]) -> Vec<usize> {
        let mut selected = vec![false; max];
        let mut result = Vec::with_capacity(num_samples);
        while result.len() < num_samples {
            let candidate = self.rng.gen_range(0..max);
            if selected[candidate] || skip.binary_search(&candidate).is_ok() {
                continue;
            }
            selected[candidate] = true;
            result.push(candidate);
        }
        result.sort_unstable();
        result
    }

    fn draw_knuth(&mut self, num_samples: usize, max: usize, skip: &[usize]) -> Vec<usize> {
        let mut candidates_left = max - skip.len();
        let mut needed = num_samples;
        let mut result = Vec::with_capacity(num_samples);
        for candidate in 0..max {
            if needed == 0 {
                break;
            }
            if skip.binary_search(&candidate).is_ok() {
                continue;
            }
            if self.rng.gen::<f64>() * (candidates_left as f64) < (needed as f64) {
                result.push(candidate);
                needed -= 1;
            }
            candidates_left -= 1;
        }
        result
    }

    /// Weighted draw without replacement from `[0, max)`.
    fn draw_weighted(&mut self, num_samples: usize, max: usize) -> Result<Vec<usize>> {
        let Self { rng, options } = self;
        let weights = &options.sample_weights;
        if weights.len() < max {
            return Err(GrfError::Configuration(format!(
                "{} sample weights supplied for {} sampling units",
                weights.len(),
                max
            )));
        }
        let chosen = rand::seq::index::sample_weighted(rng, max, |i| weights[i], num_samples)
            .map_err(|e| GrfError::Configuration(format!("invalid sample weights: {}", e)))?;
        let mut result = chosen.into_vec();
        result.sort_unstable();
        Ok(result)
    }

    /// Draw a Poisson variate. Small means use inversion by sequential
    /// search; means at or above [`POISSON_NORMAL_APPROX_MEAN`] use a
    /// rounded-normal proposal with rejection of negatives.
    pub fn sample_poisson(&mut self, mean: f64) -> usize {
        if mean < POISSON_NORMAL_APPROX_MEAN {
            let floor = (-mean).exp();
            let mut product = 1.0;
            let mut count = 0usize;
            loop {
                product *= self.rng.gen::<f64>();
                if product <= floor {
                    return count;
                }
                count += 1;
            }
        }
        loop {
            let z: f64 = self.rng.sample(StandardNormal);
            let proposal = mean + mean.sqrt() * z;
            if proposal >= 0.0 {
                return proposal.round() as usize;
            }
        }
    }
}
