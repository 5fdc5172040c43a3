//! LiDAR scan types.

use serde::{Deserialize, Serialize};

/// Raw LiDAR scan in polar coordinates, as delivered by the sensor.
///
/// Bearings are implicit: reading `i` sits at `angle_min + i * angle_increment`
/// in the sensor frame. Conversion to the robot base frame is the transform
/// stack's job and produces a [`RobotFrameScan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserScan {
    /// Start angle in radians
    pub angle_min: f32,
    /// End angle in radians
    pub angle_max: f32,
    /// Angular resolution (radians between consecutive readings)
    pub angle_increment: f32,
    /// Minimum valid range in meters
    pub range_min: f32,
    /// Maximum valid range in meters
    pub range_max: f32,
    /// Range measurements in meters (0 or NaN = invalid)
    pub ranges: Vec<f32>,
}

impl LaserScan {
    /// Create a new laser scan with the given parameters.
    pub fn new(
        angle_min: f32,
        angle_max: f32,
        angle_increment: f32,
        range_min: f32,
        range_max: f32,
        ranges: Vec<f32>,
    ) -> Self {
        Self {
            angle_min,
            angle_max,
            angle_increment,
            range_min,
            range_max,
            ranges,
        }
    }

    /// Number of range measurements.
    #[inline]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Check if scan is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Bearing for a given reading index.
    #[inline]
    pub fn angle_at(&self, index: usize) -> f32 {
        self.angle_min + index as f32 * self.angle_increment
    }
}

impl Default for LaserScan {
    fn default() -> Self {
        Self {
            angle_min: 0.0,
            angle_max: std::f32::consts::TAU, // 2π for full 360°
            angle_increment: std::f32::consts::TAU / 360.0, // 1° resolution
            range_min: 0.15,
            range_max: 12.0,
            ranges: Vec::new(),
        }
    }
}

/// A scan expressed in the robot base frame as parallel (range, bearing)
/// arrays.
///
/// The measurement update only consumes the minimum range, but the full
/// arrays are kept since they are what the transform stack hands back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotFrameScan {
    /// Range measurements in meters.
    pub ranges: Vec<f32>,
    /// Bearing of each measurement in radians, robot frame.
    pub bearings: Vec<f32>,
}

impl RobotFrameScan {
    /// Create from parallel range/bearing arrays.
    pub fn new(ranges: Vec<f32>, bearings: Vec<f32>) -> Self {
        debug_assert_eq!(ranges.len(), bearings.len());
        Self { ranges, bearings }
    }

    /// Number of measurements.
    #[inline]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Check if the scan has no measurements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Minimum range in the scan, or `None` when empty.
    ///
    /// NaN ranges propagate: a single NaN reading makes the minimum NaN.
    /// Callers decide how to treat that (the measurement update folds it
    /// into the unknown-distance penalty).
    pub fn min_range(&self) -> Option<f32> {
        if self.ranges.is_empty() {
            return None;
        }
        let mut min = f32::INFINITY;
        for &r in &self.ranges {
            if r.is_nan() {
                return Some(f32::NAN);
            }
            if r < min {
                min = r;
            }
        }
        Some(min)
    }
}
