//! Localizer Thread - scan-driven filter updates.
//!
//! This thread:
//! - Polls the shared pending-scan slot on a fixed cadence
//! - Walks each consumed scan through the localization engine
//! - Publishes a `CycleReport` snapshot for every consumed scan
//!
//! The shared lock is held only for the poll itself, so scan ingest and
//! initial pose requests interleave between polls.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::engine::TransformProvider;
use crate::filter::DistanceField;
use crate::state::{SharedLocalizerHandle, SnapshotSender};

/// Configuration for the localizer thread.
#[derive(Debug, Clone)]
pub struct LocalizerThreadConfig {
    /// Interval between polls of the pending-scan slot.
    pub poll_interval: Duration,
}

impl Default for LocalizerThreadConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Localizer Thread handle.
pub struct LocalizerThread {
    handle: JoinHandle<()>,
}

impl LocalizerThread {
    /// Spawn the localizer thread.
    pub fn spawn<TF, DF>(
        config: LocalizerThreadConfig,
        shared: SharedLocalizerHandle<TF, DF>,
        snapshot_tx: SnapshotSender,
        running: Arc<AtomicBool>,
    ) -> Self
    where
        TF: TransformProvider + Send + 'static,
        TF::OdomPose: Send + 'static,
        DF: DistanceField + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("localizer".into())
            .spawn(move || {
                run_localizer_loop(config, shared, snapshot_tx, running);
            })
            .expect("Failed to spawn localizer thread");

        Self { handle }
    }

    /// Wait for thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_localizer_loop<TF, DF>(
    config: LocalizerThreadConfig,
    shared: SharedLocalizerHandle<TF, DF>,
    snapshot_tx: SnapshotSender,
    running: Arc<AtomicBool>,
) where
    TF: TransformProvider,
    DF: DistanceField,
{
    log::info!(
        "Localizer thread starting (poll interval {:?})",
        config.poll_interval
    );

    while running.load(Ordering::Relaxed) {
        let report = match shared.lock() {
            Ok(mut guard) => guard.poll(),
            Err(_) => {
                // Lock poisoned by a panicking holder; skip this poll
                thread::sleep(config.poll_interval);
                continue;
            }
        };
        if let Some(report) = report {
            // Non-blocking send - drop if channel full (old snapshot)
            if snapshot_tx.try_send(report).is_err() {
                log::debug!("Snapshot channel full, dropping cycle report");
            }
        }

        thread::sleep(config.poll_interval);
    }

    log::info!("Localizer thread stopped");
}
