//! Particle filter for Monte Carlo localization.
//!
//! Maintains a population of weighted pose hypotheses and refines it as the
//! robot moves and observes its surroundings.
//!
//! # Components
//!
//! - [`Particle`]: A single weighted pose hypothesis
//! - [`OdometryTracker`]: Incremental odometry deltas and the motion gate
//! - [`DistanceField`]: Map-side closest-obstacle queries for reweighting
//! - [`ParticleFilter`]: The population with seed, motion, measurement and
//!   resampling steps
//!
//! # Example
//!
//! ```ignore
//! use dhruva_mcl::filter::{FilterConfig, ParticleFilter};
//!
//! let mut filter = ParticleFilter::new(FilterConfig::default());
//! filter.seed(&initial_pose);
//!
//! // Each localization cycle:
//! filter.apply_motion(&odom_delta);
//! filter.reweight(closest_range, &map);
//! let best = filter.best_particle();
//! filter.resample();
//! ```

mod measurement;
mod motion;
mod particle;
mod particle_filter;
mod resample;

pub use measurement::{DistanceField, UNKNOWN_DISTANCE_PENALTY};
pub use motion::OdometryTracker;
pub use particle::Particle;
pub use particle_filter::{FilterConfig, ParticleFilter};
