//! Thread management for the localization daemon.
//!
//! This module provides:
//! - `LocalizerThread`: Polls the pending-scan slot and drives the engine,
//!   publishing a population snapshot for every consumed scan

mod localizer_thread;

pub use localizer_thread::{LocalizerThread, LocalizerThreadConfig};
