//! Partial resampling of the low-weight tail of the particle population.
//!
//! Instead of regenerating the whole population every cycle, only particles
//! at or below a weight-percentile cutoff are replaced. Each one is moved
//! onto a donor drawn from the current population in proportion to weight,
//! with a uniform heading perturbation so replacements spread out instead of
//! stacking exactly. Weights are not modified here; the next measurement
//! update rescores the whole population.

use rand::Rng;
use rand::rngs::StdRng;

use crate::filter::particle::Particle;

/// Percentile of a sample using linear interpolation between closest ranks.
///
/// The rank of the requested percentile is `pct / 100 * (n - 1)`; when it
/// falls between two sorted values the result is interpolated linearly.
/// `pct` is clamped to `0..=100`. `values` must be non-empty.
pub(crate) fn percentile(values: &[f64], pct: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = pct.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    if lo + 1 >= sorted.len() {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + frac * (sorted[lo + 1] - sorted[lo])
}

/// Draw `count` indices in proportion to `weights`, with replacement.
///
/// When the weights cannot form a distribution (zero, negative, NaN or
/// infinite sum) every index is drawn uniformly instead.
pub(crate) fn weighted_indices(weights: &[f64], count: usize, rng: &mut StdRng) -> Vec<usize> {
    let n = weights.len();

    // Cumulative weights
    let mut cumulative: Vec<f64> = Vec::with_capacity(n);
    let mut sum = 0.0;
    for &w in weights {
        sum += w;
        cumulative.push(sum);
    }

    // Normalize cumulative weights
    if sum > 0.0 && sum.is_finite() {
        for c in &mut cumulative {
            *c /= sum;
        }
    } else {
        // Uniform weights if the sum is degenerate
        for (i, c) in cumulative.iter_mut().enumerate() {
            *c = (i + 1) as f64 / n as f64;
        }
    }

    (0..count)
        .map(|_| {
            let r = rng.random::<f64>();
            let mut idx = 0;
            while r > cumulative[idx] && idx < n - 1 {
                idx += 1;
            }
            idx
        })
        .collect()
}

/// Replace every particle at or below the `tail_percentile` weight cutoff
/// with a weight-proportional donor from the current population.
///
/// Donor indices are all drawn before any replacement happens, but donor
/// state is read at replacement time, so a donor that was itself replaced
/// earlier in the pass donates its new pose. Each replacement gets the
/// donor heading perturbed by a uniform draw from
/// `-heading_jitter..heading_jitter`. Weights are left untouched.
pub(crate) fn resample_low_weight(
    particles: &mut [Particle],
    tail_percentile: f64,
    heading_jitter: f32,
    rng: &mut StdRng,
) {
    if particles.is_empty() {
        return;
    }

    let weights: Vec<f64> = particles.iter().map(|p| p.w).collect();
    let cutoff = percentile(&weights, tail_percentile);

    let tail: Vec<usize> = weights
        .iter()
        .enumerate()
        .filter(|&(_, &w)| w <= cutoff)
        .map(|(i, _)| i)
        .collect();
    if tail.is_empty() {
        return;
    }

    let donors = weighted_indices(&weights, tail.len(), rng);

    for (&slot, &donor) in tail.iter().zip(&donors) {
        // Donor read from the live population, not a snapshot
        let source = particles[donor];
        let jitter = if heading_jitter > 0.0 {
            rng.random_range(-heading_jitter..heading_jitter)
        } else {
            0.0
        };
        particles[slot].x = source.x;
        particles[slot].y = source.y;
        particles[slot].theta = source.theta + jitter;
        // Weight is left as-is
    }
}
