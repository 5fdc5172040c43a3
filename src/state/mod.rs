//! State management for the multi-threaded localization daemon.
//!
//! This module provides:
//! - `SharedLocalizerHandle`: Thread-safe access to the engine and its
//!   pending-scan slot
//! - Snapshot channel types carrying per-cycle population reports

mod shared;
mod snapshots;

pub use shared::{SharedLocalizer, SharedLocalizerHandle, create_shared_localizer};
pub use snapshots::{SnapshotReceiver, SnapshotSender, create_snapshot_channel};
