//! Core data types for localization.
//!
//! - [`Point2D`]: 2D point in meters
//! - [`Pose2D`]: Robot pose (x, y, theta) in meters and radians
//! - [`Quaternion`]: Yaw-only orientation for transform stack consumers
//! - [`MapPose`]: Position plus quaternion in the map frame
//! - [`LaserScan`]: Raw LiDAR scan in polar coordinates
//! - [`RobotFrameScan`]: Scan converted into the robot base frame
//! - [`Timestamped<T>`]: Generic timestamp wrapper

mod pose;
mod scan;
mod timestamped;

pub use pose::{MapPose, Point2D, Pose2D, Quaternion};
pub use scan::{LaserScan, RobotFrameScan};
pub use timestamped::Timestamped;
