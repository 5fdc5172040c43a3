//! Channel plumbing for per-cycle population snapshots.
//!
//! The localizer thread pushes a [`CycleReport`] for every scan the engine
//! consumes. The channel is bounded and sends are non-blocking: a slow
//! consumer loses snapshots rather than stalling the filter.

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::engine::CycleReport;

/// Channel capacity for cycle snapshots (small to avoid buffering old
/// population state).
const SNAPSHOT_CHANNEL_CAPACITY: usize = 8;

/// Sender end of the snapshot channel (held by the localizer thread).
pub type SnapshotSender = Sender<CycleReport>;

/// Receiver end of the snapshot channel (held by the consumer).
pub type SnapshotReceiver = Receiver<CycleReport>;

/// Create a new snapshot channel pair.
pub fn create_snapshot_channel() -> (SnapshotSender, SnapshotReceiver) {
    bounded(SNAPSHOT_CHANNEL_CAPACITY)
}
