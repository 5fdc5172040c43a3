//! Odometry tracking and the motion half of the filter update.
//!
//! The filter never sees absolute odometry. It sees the relative motion
//! between the odometry pose at the last update and the odometry pose now,
//! and applies that delta to every particle in the particle's own frame.

use crate::core::types::Pose2D;

use super::Particle;

/// Tracks the odometry pose that the next motion delta is measured from.
///
/// The reference is recorded on the first observation and then advanced
/// every time a delta is taken. Between updates it stays put, so motion
/// accumulates until the movement gate fires.
#[derive(Debug, Clone, Default)]
pub struct OdometryTracker {
    reference: Option<Pose2D>,
}

impl OdometryTracker {
    /// Create a tracker with no reference recorded.
    pub fn new() -> Self {
        Self { reference: None }
    }

    /// The current reference pose, if one has been recorded.
    pub fn reference(&self) -> Option<Pose2D> {
        self.reference
    }

    /// Whether a reference pose has been recorded.
    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Record `current` as the new reference and return the relative motion
    /// since the previous one: `reference⁻¹ ∘ current`.
    ///
    /// The first call only records and returns `None`.
    pub fn advance(&mut self, current: Pose2D) -> Option<Pose2D> {
        let delta = self.reference.map(|r| r.inverse().compose(&current));
        self.reference = Some(current);
        delta
    }

    /// Movement gate: has `current` moved beyond the thresholds since the
    /// reference?
    ///
    /// Comparisons are strict and componentwise on raw differences. The
    /// heading difference is deliberately unwrapped, so a reference near +π
    /// against a pose near -π reads as a large jump and fires the gate.
    /// Returns false when no reference exists.
    pub fn moved_beyond(&self, current: &Pose2D, d_thresh: f32, a_thresh: f32) -> bool {
        match self.reference {
            Some(r) => {
                (current.x - r.x).abs() > d_thresh
                    || (current.y - r.y).abs() > d_thresh
                    || (current.theta - r.theta).abs() > a_thresh
            }
            None => false,
        }
    }
}

/// Apply a relative motion to every particle.
///
/// The delta composes onto each particle's own transform (local frame), so
/// a particle facing +y moves in +y when the robot drove straight ahead.
/// Headings come out of the composition normalized to [-π, π]; weights are
/// untouched.
pub fn propagate(particles: &mut [Particle], delta: &Pose2D) {
    for p in particles.iter_mut() {
        let moved = p.pose().compose(delta);
        p.x = moved.x;
        p.y = moved.y;
        p.theta = moved.theta;
    }
}
