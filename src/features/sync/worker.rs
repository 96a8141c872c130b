//! Background replay.
//!
//! The worker drains the queue when asked through a [`SyncTrigger`] and, as a
//! fallback for when no one asks, polls on a fixed interval while the queue
//! holds anything.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, error};

use super::coordinator::SyncCoordinator;
use crate::error::PantryError;

enum Signal {
    Sync,
    Stop,
}

/// Handle used to request a replay pass. Cheap to clone.
#[derive(Clone)]
pub struct SyncTrigger {
    tx: Sender<Signal>,
}

impl SyncTrigger {
    /// Ask for a pass. Returns `false` if the worker has stopped.
    pub fn request_sync(&self) -> bool {
        self.tx.send(Signal::Sync).is_ok()
    }
}

/// A thread that runs replay passes.
pub struct SyncWorker {
    trigger: SyncTrigger,
    handle: JoinHandle<()>,
}

impl SyncWorker {
    /// Start the worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(
        coordinator: Arc<SyncCoordinator>,
        poll_interval: Duration,
    ) -> Result<Self, PantryError> {
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("pantry-sync".to_string())
            .spawn(move || run(&coordinator, &rx, poll_interval))?;

        Ok(Self {
            trigger: SyncTrigger { tx },
            handle,
        })
    }

    /// A handle for requesting passes.
    #[must_use]
    pub fn trigger(&self) -> SyncTrigger {
        self.trigger.clone()
    }

    /// Stop the worker once any running pass finishes.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread panicked.
    pub fn shutdown(self) -> Result<(), PantryError> {
        // Already gone if the send fails; join reports how it ended
        let _ = self.trigger.tx.send(Signal::Stop);
        self.handle
            .join()
            .map_err(|_| PantryError::Io(std::io::Error::other("sync worker panicked")))
    }
}

fn run(coordinator: &SyncCoordinator, rx: &Receiver<Signal>, poll_interval: Duration) {
    loop {
        let forced = match rx.recv_timeout(poll_interval) {
            Ok(Signal::Sync) => true,
            Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => false,
        };

        // Requests that piled up during the last pass collapse into this one
        let mut stop = false;
        while let Ok(signal) = rx.try_recv() {
            if matches!(signal, Signal::Stop) {
                stop = true;
            }
        }

        run_pass(coordinator, forced);

        if stop {
            break;
        }
    }
    debug!("sync worker stopped");
}

fn run_pass(coordinator: &SyncCoordinator, forced: bool) {
    if !forced {
        match coordinator.queue().is_empty() {
            Ok(true) => return,
            Ok(false) => {},
            Err(e) => {
                error!(error = %e, "could not read queue");
                return;
            },
        }
    }

    if let Err(e) = coordinator.drain() {
        error!(error = %e, "sync pass failed");
    }
}
