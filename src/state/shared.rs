//! Thread-safe shared state for the localization daemon.
//!
//! This module provides `SharedLocalizer`, which is shared between:
//! - Sensor ingest: pushes scans and initial pose requests as they arrive
//! - Localizer thread: polls the pending scan into the engine
//!
//! The pending-scan slot holds at most one scan. A scan arriving while
//! another is still waiting is dropped, so the filter always works on the
//! freshest data it can keep up with.

use std::sync::{Arc, Mutex};

use crate::core::types::{LaserScan, Pose2D, Timestamped};
use crate::engine::{CycleReport, Localizer, ScanOutcome, TransformProvider};
use crate::filter::DistanceField;

/// The localization engine plus the single-scan mailbox feeding it.
pub struct SharedLocalizer<TF: TransformProvider, DF: DistanceField> {
    localizer: Localizer<TF, DF>,
    pending_scan: Option<Timestamped<LaserScan>>,
}

impl<TF, DF> SharedLocalizer<TF, DF>
where
    TF: TransformProvider,
    DF: DistanceField,
{
    /// Wrap a localizer with an empty pending-scan slot.
    pub fn new(localizer: Localizer<TF, DF>) -> Self {
        Self {
            localizer,
            pending_scan: None,
        }
    }

    /// Offer a scan for the next poll. Dropped if one is already waiting.
    pub fn scan_received(&mut self, scan: Timestamped<LaserScan>) {
        if self.pending_scan.is_none() {
            self.pending_scan = Some(scan);
        } else {
            log::debug!(
                "Dropping scan at {}us: previous scan still pending",
                scan.timestamp_us
            );
        }
    }

    /// Re-seed the population around `mean`, or around the last matched
    /// odometry pose when `mean` is `None`. Requests that cannot be
    /// honored yet are logged and ignored.
    pub fn set_initial_pose(&mut self, mean: Option<Pose2D>) {
        if let Err(err) = self.localizer.set_initial_pose(mean) {
            log::warn!("Ignoring initial pose request: {err}");
        }
    }

    /// Hand the pending scan to the engine, if there is one.
    ///
    /// A deferred scan goes back into the slot for the next poll; consumed
    /// and discarded scans clear it.
    pub fn poll(&mut self) -> Option<CycleReport> {
        let scan = self.pending_scan.take()?;
        match self.localizer.process_scan(&scan) {
            ScanOutcome::Processed(report) => Some(report),
            ScanOutcome::Deferred => {
                self.pending_scan = Some(scan);
                None
            }
            ScanOutcome::Dropped => None,
        }
    }

    /// Whether a scan is waiting for the next poll.
    pub fn has_pending_scan(&self) -> bool {
        self.pending_scan.is_some()
    }

    /// The wrapped localizer.
    pub fn localizer(&self) -> &Localizer<TF, DF> {
        &self.localizer
    }

    /// Mutable access to the wrapped localizer.
    pub fn localizer_mut(&mut self) -> &mut Localizer<TF, DF> {
        &mut self.localizer
    }
}

/// Handle type for the shared localizer (Arc<Mutex<SharedLocalizer>>).
pub type SharedLocalizerHandle<TF, DF> = Arc<Mutex<SharedLocalizer<TF, DF>>>;

/// Create a shared localizer wrapped in Arc<Mutex>.
pub fn create_shared_localizer<TF, DF>(
    localizer: Localizer<TF, DF>,
) -> SharedLocalizerHandle<TF, DF>
where
    TF: TransformProvider,
    DF: DistanceField,
{
    Arc::new(Mutex::new(SharedLocalizer::new(localizer)))
}
