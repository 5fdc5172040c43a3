//! Range-observation weighting against a map distance field.
//!
//! The observation is reduced to a single number, the shortest range in the
//! scan, and compared with the distance each particle would expect to its
//! closest mapped obstacle. Weights follow from how those errors relate to
//! the error of the first particle in the population.

use crate::core::types::Point2D;

use super::Particle;

/// Error magnitude substituted when the map has no distance for a particle,
/// or when the arithmetic produces NaN (e.g. a NaN observed range).
pub const UNKNOWN_DISTANCE_PENALTY: f64 = 5.0;

/// Map-side distance queries used by the measurement update.
///
/// Implemented by whatever owns the map. The filter only ever asks one
/// question: how far is each of these points from the closest obstacle.
pub trait DistanceField {
    /// Distance in meters from each query point to the closest mapped
    /// obstacle. `None` marks a point the map cannot answer for (outside
    /// the map, or in unknown space).
    ///
    /// The returned vector must have one entry per query point.
    fn closest_obstacle_distances(&self, points: &[Point2D]) -> Vec<Option<f32>>;
}

/// Reweight the population from the observed minimum range.
///
/// The weight computation mirrors IEEE-754 array arithmetic end to end:
///
/// 1. `e_i = |observed - d_i|`, with `UNKNOWN_DISTANCE_PENALTY` substituted
///    for unknown distances and NaN errors.
/// 2. `ratio_i = e_0 / e_i`, anchored on the first particle's error. A zero
///    anchor divides to NaN against itself and zero against the rest; a
///    zero error elsewhere divides to infinity.
/// 3. `w_i = ratio_i / Σ ratio`. NaN and infinity propagate through the sum.
/// 4. Any NaN weight is coerced to exactly 0.0.
///
/// Weights are not renormalized afterwards. A population where every weight
/// collapsed to zero is left that way; the resampler handles it.
pub fn reweight<F: DistanceField + ?Sized>(particles: &mut [Particle], observed: f32, field: &F) {
    if particles.is_empty() {
        return;
    }

    let points: Vec<Point2D> = particles.iter().map(|p| p.position()).collect();
    let distances = field.closest_obstacle_distances(&points);

    let errors: Vec<f64> = particles
        .iter()
        .enumerate()
        .map(|(i, _)| match distances.get(i).copied().flatten() {
            Some(d) => {
                let e = (observed as f64 - d as f64).abs();
                if e.is_nan() { UNKNOWN_DISTANCE_PENALTY } else { e }
            }
            None => UNKNOWN_DISTANCE_PENALTY,
        })
        .collect();

    let anchor = errors[0];
    let ratios: Vec<f64> = errors.iter().map(|&e| anchor / e).collect();
    let total: f64 = ratios.iter().sum();

    for (p, &ratio) in particles.iter_mut().zip(&ratios) {
        let w = ratio / total;
        p.w = if w.is_nan() { 0.0 } else { w };
    }
}
