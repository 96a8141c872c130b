//! Replay of queued writes.
//!
//! This module provides:
//! - A coordinator that drains the queue in order, once per pass
//! - A notifier that tells live clients when a pass finished
//! - A worker that runs passes on request, with a polling fallback

pub mod coordinator;
pub mod notifier;
pub mod worker;

pub use coordinator::{format_sync_report, ReplayOutcome, ReplayResult, SyncCoordinator, SyncReport};
pub use notifier::{ClientNotifier, SyncMessage};
pub use worker::{SyncTrigger, SyncWorker};
