//! DhruvaMCL - Monte Carlo localization for 2D mobile robots
//!
//! # Architecture
//!
//! The crate is organized into 5 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    threads/                         │  ← Thread infrastructure
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     state/                          │  ← Shared state
//! │           (pending-scan slot, snapshots)            │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    engine/                          │  ← Orchestration
//! │            (localizer, transform seam)              │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    filter/                          │  ← Particle filter
//! │     (particles, motion, measurement, resample)      │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                 (types, math)                       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Localization cycle
//!
//! Scans arrive timestamped and wait in a single-slot mailbox until the
//! localizer thread polls them into the engine. A consumed scan walks the
//! filter through up to four steps:
//!
//! - Motion: apply the odometry delta to each particle in its own frame
//! - Measurement: reweight particles by closest-obstacle agreement
//! - Estimate: adopt the best particle and correct the map->odom transform
//! - Resample: redraw the low-weight tail from the surviving population
//!
//! The motion and measurement steps run only once the robot has moved far
//! enough since the previous update; every consumed scan still produces a
//! population snapshot for consumers.

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Particle filter (depends on core)
// ============================================================================
pub mod filter;

// ============================================================================
// Layer 3: Localization engine (depends on core, filter)
// ============================================================================
pub mod engine;

// ============================================================================
// Layer 4: Multi-threaded state management
// ============================================================================
pub mod state;

// ============================================================================
// Layer 5: Thread infrastructure
// ============================================================================
pub mod threads;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use core::math;
pub use core::types::{LaserScan, RobotFrameScan};
pub use core::types::{MapPose, Point2D, Pose2D, Quaternion, Timestamped};

// Filter
pub use filter::{
    DistanceField, FilterConfig, OdometryTracker, Particle, ParticleFilter,
    UNKNOWN_DISTANCE_PENALTY,
};

// Engine
pub use engine::{
    CycleReport, Localizer, LocalizerConfig, LocalizerError, PoseMatch, ScanOutcome, Stage,
    TransformProvider,
};

// State
pub use state::{
    SharedLocalizer, SharedLocalizerHandle, SnapshotReceiver, SnapshotSender,
    create_shared_localizer, create_snapshot_channel,
};

// Threads
pub use threads::{LocalizerThread, LocalizerThreadConfig};
