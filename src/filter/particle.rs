//! Pose hypothesis carried by the filter.

use crate::core::types::{MapPose, Point2D, Pose2D};

/// A single pose hypothesis with an importance weight.
///
/// Position and heading are stored as raw fields rather than a [`Pose2D`]
/// because the filter deliberately keeps headings unwrapped: seeding spreads
/// them across a full turn (values past π included) and only the motion
/// update's angle re-extraction brings them back into [-π, π]. Weights use
/// `f64` since all weight arithmetic runs in double precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// X coordinate in the map frame, meters.
    pub x: f32,
    /// Y coordinate in the map frame, meters.
    pub y: f32,
    /// Heading in radians. Not normalized.
    pub theta: f32,
    /// Importance weight (unnormalized).
    pub w: f64,
}

impl Particle {
    /// Create a particle with unit weight.
    #[inline]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self {
            x,
            y,
            theta,
            w: 1.0,
        }
    }

    /// Create a particle with an explicit weight.
    #[inline]
    pub fn with_weight(x: f32, y: f32, theta: f32, w: f64) -> Self {
        Self { x, y, theta, w }
    }

    /// Position component as a point.
    #[inline]
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Pose component. The heading comes back normalized to [-π, π],
    /// which is equivalent under composition (sin/cos are unchanged).
    #[inline]
    pub fn pose(&self) -> Pose2D {
        Pose2D::new(self.x, self.y, self.theta)
    }

    /// Convert to a full map-frame pose with a quaternion orientation.
    ///
    /// Pure conversion, no side effects.
    #[inline]
    pub fn as_pose(&self) -> MapPose {
        MapPose::new(self.x, self.y, self.theta)
    }
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            theta: 0.0,
            w: 1.0,
        }
    }
}
