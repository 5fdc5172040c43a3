//! Particle population management for Monte Carlo localization.
//!
//! Owns the particle cloud and the random number stream, and exposes the
//! per-scan steps implemented by the sibling modules.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::core::types::Pose2D;

use super::measurement::{self, DistanceField};
use super::motion;
use super::particle::Particle;
use super::resample;

/// Configuration for the particle filter.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Number of particles in the population.
    /// Typical: 100
    pub num_particles: usize,

    /// Weight percentile at or below which particles are replaced
    /// during resampling.
    /// Typical: 20.0
    pub tail_percentile: f64,

    /// Half-width of the uniform heading perturbation applied to each
    /// resampled particle, in radians.
    /// Typical: pi/4
    pub heading_jitter: f32,

    /// Random seed for deterministic behavior (0 for OS entropy).
    pub seed: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            num_particles: 100,
            tail_percentile: 20.0,
            heading_jitter: std::f32::consts::FRAC_PI_4,
            seed: 0,
        }
    }
}

/// Monte Carlo localization particle filter.
///
/// Created empty; call [`seed`](Self::seed) once an initial pose estimate
/// is available.
#[derive(Debug)]
pub struct ParticleFilter {
    config: FilterConfig,
    particles: Vec<Particle>,
    rng: StdRng,
}

impl ParticleFilter {
    /// Create a new, unseeded particle filter.
    pub fn new(config: FilterConfig) -> Self {
        let rng = if config.seed == 0 {
            StdRng::from_os_rng()
        } else {
            StdRng::seed_from_u64(config.seed)
        };

        Self {
            config,
            particles: Vec::new(),
            rng,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Get current particles (for visualization).
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Get the number of particles currently in the population.
    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }

    /// Whether the population has been seeded.
    pub fn is_seeded(&self) -> bool {
        !self.particles.is_empty()
    }

    /// Replace the population with `num_particles` unit-weight particles
    /// at the mean position, headings fanned evenly over a full turn
    /// starting from the mean heading.
    ///
    /// Fan headings are stored as generated; they are not wrapped back
    /// into `(-pi, pi]`.
    pub fn seed(&mut self, mean: &Pose2D) {
        let n = self.config.num_particles;
        let delta_theta = std::f32::consts::TAU / n as f32;

        self.particles.clear();
        self.particles.reserve(n);
        for i in 0..n {
            let theta = mean.theta + i as f32 * delta_theta;
            self.particles.push(Particle::new(mean.x, mean.y, theta));
        }
    }

    /// Prediction step: apply an odometry delta to every particle in its
    /// own local frame. Weights are unchanged.
    pub fn apply_motion(&mut self, delta: &Pose2D) {
        motion::propagate(&mut self.particles, delta);
    }

    /// Update step: reweight the population against the observed closest
    /// obstacle range.
    pub fn reweight<F: DistanceField + ?Sized>(&mut self, observed: f32, field: &F) {
        measurement::reweight(&mut self.particles, observed, field);
    }

    /// Replace the low-weight tail of the population with
    /// weight-proportional donors.
    pub fn resample(&mut self) {
        resample::resample_low_weight(
            &mut self.particles,
            self.config.tail_percentile,
            self.config.heading_jitter,
            &mut self.rng,
        );
    }

    /// The highest-weight particle, first occurrence on ties.
    ///
    /// Returns `None` until the population is seeded.
    pub fn best_particle(&self) -> Option<&Particle> {
        let mut best: Option<&Particle> = None;
        for p in &self.particles {
            match best {
                Some(b) if p.w > b.w => best = Some(p),
                None => best = Some(p),
                _ => {}
            }
        }
        best
    }
}
