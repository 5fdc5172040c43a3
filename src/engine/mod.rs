//! Localization orchestration layer.
//!
//! Drives the particle filter from timestamped laser scans and keeps the
//! map frame anchored to the odometry frame.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        PER-SCAN CYCLE                        │
//! │                                                              │
//! │  Scan ─▶ Match odom pose ─▶ Record / Seed / Motion gate      │
//! │                                        │                     │
//! │                                 gate fired?                  │
//! │                                        │                     │
//! │              ┌─────────────────────────┴──────┐              │
//! │              ▼                                ▼              │
//! │   Motion ▶ Measurement ▶ Estimate ▶      (skip update)       │
//! │            ▶ Resample                         │              │
//! │              │                                │              │
//! │              └──────────────┬─────────────────┘              │
//! │                             ▼                                │
//! │                      Cycle snapshot                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The estimate step pushes a map->odom correction into the transform
//! provider, so consumers that track the odometry frame see the robot in
//! map coordinates without waiting on the filter.
//!
//! # Components
//!
//! - [`TransformProvider`]: Frame bookkeeping the localizer delegates to
//! - [`Localizer`]: The scan-driven localization engine
//! - [`CycleReport`]: Population snapshot emitted for every consumed scan
//!
//! # Example
//!
//! ```ignore
//! use dhruva_mcl::engine::{Localizer, LocalizerConfig, ScanOutcome};
//!
//! let config = LocalizerConfig::default();
//! let mut localizer = Localizer::new(config, transforms, map)?;
//!
//! // In the sensor loop
//! match localizer.process_scan(&scan) {
//!     ScanOutcome::Processed(report) => publish(report),
//!     ScanOutcome::Deferred => retry_later(scan),
//!     ScanOutcome::Dropped => {}
//! }
//! ```

pub mod localizer;

pub use localizer::{
    CycleReport, Localizer, LocalizerConfig, LocalizerError, ScanOutcome, Stage,
};

use crate::core::types::{LaserScan, MapPose, Pose2D, RobotFrameScan};

/// Outcome of looking up the odometry pose for a scan timestamp.
#[derive(Debug, Clone)]
pub enum PoseMatch<P> {
    /// A pose matching the timestamp is available.
    Matched(P),
    /// The transform history has not reached the timestamp yet.
    Pending,
    /// The timestamp has aged out of the transform history.
    Expired,
}

/// Trait for the transform collaborator the localizer delegates frame
/// bookkeeping to.
///
/// The localizer never integrates odometry itself. It asks the provider
/// for the odom-frame pose matching each scan timestamp, and pushes the
/// map->odom correction back once it has formed an estimate.
pub trait TransformProvider {
    /// Provider-side representation of an odometry-frame pose.
    type OdomPose: Clone;

    /// Look up the pose of `base_frame` in `odom_frame` at `timestamp_us`.
    fn matching_pose(
        &self,
        odom_frame: &str,
        base_frame: &str,
        timestamp_us: u64,
    ) -> PoseMatch<Self::OdomPose>;

    /// Express a scan as ranges and bearings in the robot base frame.
    fn scan_to_robot_frame(&self, scan: &LaserScan, base_frame: &str) -> RobotFrameScan;

    /// Flatten a provider pose to planar x, y, theta.
    fn pose_to_xy_theta(&self, pose: &Self::OdomPose) -> Pose2D;

    /// Update the map->odom correction from an estimated map pose and the
    /// odometry pose it was formed against.
    fn correct_map_to_odom(
        &mut self,
        map_frame: &str,
        odom_frame: &str,
        best: &MapPose,
        odom: &Self::OdomPose,
    );
}
