//! Pose, point and orientation types for 2D localization.

use serde::{Deserialize, Serialize};

/// A 2D point in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    /// X coordinate in meters
    pub x: f32,
    /// Y coordinate in meters
    pub y: f32,
}

impl Point2D {
    /// Create a new point.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared distance to another point (avoids sqrt).
    #[inline]
    pub fn distance_squared(&self, other: &Point2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point2D) -> f32 {
        self.distance_squared(other).sqrt()
    }
}

impl Default for Point2D {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

/// Robot pose in 2D space.
///
/// Represents position (x, y) in meters and heading (theta) in radians.
/// Theta is normalized to [-π, π].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// X position in meters
    pub x: f32,
    /// Y position in meters
    pub y: f32,
    /// Heading in radians, normalized to [-π, π]
    pub theta: f32,
}

impl Pose2D {
    /// Create a new pose with theta normalized to [-π, π].
    #[inline]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self {
            x,
            y,
            theta: crate::core::math::normalize_angle(theta),
        }
    }

    /// Identity pose at origin with zero heading.
    #[inline]
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            theta: 0.0,
        }
    }

    /// Compose two poses: self ⊕ other
    ///
    /// Applies `other` transform relative to `self` frame.
    /// ```text
    /// C = A ⊕ B:
    ///   C.x = A.x + B.x * cos(A.θ) - B.y * sin(A.θ)
    ///   C.y = A.y + B.x * sin(A.θ) + B.y * cos(A.θ)
    ///   C.θ = normalize(A.θ + B.θ)
    /// ```
    #[inline]
    pub fn compose(&self, other: &Pose2D) -> Pose2D {
        let (sin_t, cos_t) = self.theta.sin_cos();
        Pose2D::new(
            self.x + other.x * cos_t - other.y * sin_t,
            self.y + other.x * sin_t + other.y * cos_t,
            self.theta + other.theta,
        )
    }

    /// Inverse of this pose.
    ///
    /// Returns the transform that undoes this pose.
    /// ```text
    /// A⁻¹:
    ///   x = -A.x * cos(A.θ) - A.y * sin(A.θ)
    ///   y =  A.x * sin(A.θ) - A.y * cos(A.θ)
    ///   θ = -A.θ
    /// ```
    #[inline]
    pub fn inverse(&self) -> Pose2D {
        let (sin_t, cos_t) = self.theta.sin_cos();
        Pose2D::new(
            -self.x * cos_t - self.y * sin_t,
            self.x * sin_t - self.y * cos_t,
            -self.theta,
        )
    }
}

impl Default for Pose2D {
    fn default() -> Self {
        Self::identity()
    }
}

/// Orientation quaternion.
///
/// Only yaw rotations occur in a planar setup, so quaternions here always
/// have the form (0, 0, sin(θ/2), cos(θ/2)). The full four components are
/// kept because downstream transform stacks consume 3D orientations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    /// Identity rotation.
    #[inline]
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }

    /// Build from a yaw angle in radians (roll and pitch zero).
    #[inline]
    pub fn from_yaw(theta: f32) -> Self {
        let (sin_h, cos_h) = (theta * 0.5).sin_cos();
        Self {
            x: 0.0,
            y: 0.0,
            z: sin_h,
            w: cos_h,
        }
    }

    /// Extract the yaw angle in radians, in [-π, π].
    #[inline]
    pub fn yaw(&self) -> f32 {
        let siny_cosp = 2.0 * (self.w * self.z + self.x * self.y);
        let cosy_cosp = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        siny_cosp.atan2(cosy_cosp)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

/// Full pose in the map frame: position plus orientation quaternion.
///
/// This is the representation handed to the transform stack when the
/// map→odom correction is published.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPose {
    /// Position in meters.
    pub position: Point2D,
    /// Orientation as a yaw-only quaternion.
    pub orientation: Quaternion,
}

impl MapPose {
    /// Create a pose from a position and heading.
    #[inline]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self {
            position: Point2D::new(x, y),
            orientation: Quaternion::from_yaw(theta),
        }
    }

    /// Heading in radians, recovered from the orientation quaternion.
    #[inline]
    pub fn yaw(&self) -> f32 {
        self.orientation.yaw()
    }
}
