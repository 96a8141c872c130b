//! Replays queued writes once the network is back.
//!
//! A pass walks the queue oldest first, one request at a time:
//! - 2xx: the write landed, remove it
//! - 4xx: the server will never accept it, move it to the discard log
//! - no response, or any other status: stop, leaving it and everything after
//!   it for the next pass
//!
//! Stopping on the first unresolved record keeps later writes from landing
//! ahead of earlier ones they may depend on.
//!
//! Every process sharing the queue may run passes, so a pass first takes the
//! store's replay lease and skips if another replayer holds it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;
use tracing::{info, warn};

use super::notifier::{ClientNotifier, SyncMessage};
use crate::error::PantryError;
use crate::features::queue::QueueStore;
use crate::http::{Method, Transport};

/// What happened to one record during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReplayOutcome {
    /// Accepted by the server; removed from the queue.
    Delivered { status: u16 },
    /// Rejected with a 4xx; moved to the discard log.
    Discarded { status: u16 },
    /// Answered with a status that may succeed later; left queued.
    Deferred { status: u16 },
    /// No response; left queued.
    Offline { error: String },
}

impl ReplayOutcome {
    /// Whether the pass stops after this record.
    #[must_use]
    pub const fn halts(&self) -> bool {
        matches!(self, Self::Deferred { .. } | Self::Offline { .. })
    }
}

/// Result of replaying one record.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayResult {
    pub id: i64,
    pub method: Method,
    pub url: String,
    #[serde(flatten)]
    pub outcome: ReplayOutcome,
}

/// Result of one replay pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Records delivered and removed.
    pub replayed: usize,
    /// Records rejected and moved to the discard log.
    pub discarded: usize,
    /// Records still queued after the pass.
    pub remaining: usize,
    /// Id of the record the pass stopped on, if it stopped early.
    pub halted_on: Option<i64>,
    /// Every record attempted, in order.
    pub results: Vec<ReplayResult>,
    /// Another replayer held the queue, so nothing was attempted.
    pub busy: bool,
}

impl SyncReport {
    /// Whether the queue was emptied.
    #[must_use]
    pub const fn drained(&self) -> bool {
        self.remaining == 0
    }

    /// Number of records attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.results.len()
    }

    fn add(&mut self, result: ReplayResult) {
        match result.outcome {
            ReplayOutcome::Delivered { .. } => self.replayed += 1,
            ReplayOutcome::Discarded { .. } => self.discarded += 1,
            ReplayOutcome::Deferred { .. } | ReplayOutcome::Offline { .. } => {
                self.halted_on = Some(result.id);
            },
        }
        self.results.push(result);
    }

    /// The message broadcast to clients for this pass.
    #[must_use]
    pub const fn message(&self) -> SyncMessage {
        SyncMessage::SyncComplete {
            replayed: self.replayed,
            discarded: self.discarded,
            remaining: self.remaining,
        }
    }
}

/// Drains the queue against the network.
pub struct SyncCoordinator {
    transport: Arc<dyn Transport>,
    queue: Arc<dyn QueueStore>,
    notifier: Arc<ClientNotifier>,
    pass: Mutex<()>,
    holder: String,
    lease_ttl: Duration,
}

/// How long a replay lease lasts without renewal. Renewed before every send.
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(120);

static NEXT_HOLDER: AtomicU64 = AtomicU64::new(0);

impl SyncCoordinator {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        queue: Arc<dyn QueueStore>,
        notifier: Arc<ClientNotifier>,
    ) -> Self {
        Self {
            transport,
            queue,
            notifier,
            pass: Mutex::new(()),
            holder: format!(
                "{}:{}",
                std::process::id(),
                NEXT_HOLDER.fetch_add(1, Ordering::Relaxed)
            ),
            lease_ttl: DEFAULT_LEASE_TTL,
        }
    }

    /// Set how long the replay lease outlives its last renewal. Must exceed
    /// the longest single request.
    #[must_use]
    pub const fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = ttl;
        self
    }

    /// The queue this coordinator drains.
    #[must_use]
    pub fn queue(&self) -> &dyn QueueStore {
        self.queue.as_ref()
    }

    /// The notifier told about every finished pass.
    #[must_use]
    pub fn notifier(&self) -> &Arc<ClientNotifier> {
        &self.notifier
    }

    /// Run one replay pass and notify clients when it finishes.
    ///
    /// Passes never overlap. Within a process a second caller waits for the
    /// running pass and then starts its own over whatever is left. A pass
    /// that finds the lease held by another process returns a `busy` report
    /// without sending anything or notifying.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue cannot be read or updated. No
    /// notification is sent for a pass that fails this way.
    pub fn drain(&self) -> Result<SyncReport, PantryError> {
        let _pass = self.pass.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.queue.acquire_lease(&self.holder, self.lease_ttl)? {
            info!("another replayer holds the queue, skipping pass");
            return Ok(SyncReport {
                remaining: self.queue.len()?,
                busy: true,
                ..SyncReport::default()
            });
        }

        let result = self.replay();
        if let Err(e) = self.queue.release_lease(&self.holder) {
            warn!(error = %e, "could not release replay lease");
        }
        let report = result?;

        info!(
            replayed = report.replayed,
            discarded = report.discarded,
            remaining = report.remaining,
            halted_on = ?report.halted_on,
            "sync pass complete"
        );

        self.notifier.broadcast(&report.message());
        Ok(report)
    }

    fn replay(&self) -> Result<SyncReport, PantryError> {
        let mut report = SyncReport::default();

        for record in self.queue.list_all()? {
            if !self.queue.acquire_lease(&self.holder, self.lease_ttl)? {
                warn!(id = record.id, "replay lease taken over, stopping pass");
                break;
            }
            let request = record.to_request()?;

            let outcome = match self.transport.send(&request) {
                Ok(response) if response.is_success() => {
                    self.queue.remove(record.id)?;
                    ReplayOutcome::Delivered {
                        status: response.status,
                    }
                },
                Ok(response) if response.is_client_error() => {
                    self.queue.discard(record.id, response.status)?;
                    warn!(
                        id = record.id,
                        method = %record.method,
                        url = %record.url,
                        status = response.status,
                        "server rejected queued write, discarding"
                    );
                    ReplayOutcome::Discarded {
                        status: response.status,
                    }
                },
                Ok(response) => ReplayOutcome::Deferred {
                    status: response.status,
                },
                Err(e) => ReplayOutcome::Offline { error: e.0 },
            };

            let halts = outcome.halts();
            report.add(ReplayResult {
                id: record.id,
                method: record.method,
                url: record.url,
                outcome,
            });

            if halts {
                break;
            }
        }

        report.remaining = self.queue.len()?;
        Ok(report)
    }
}

/// Format a sync report for display.
#[must_use]
pub fn format_sync_report(report: &SyncReport) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Sync completed: {} requests attempted", report.attempted()));
    lines.push("─".repeat(40));

    if report.replayed > 0 {
        lines.push(format!(
            "  {} {}",
            "✓".green(),
            format!("{} delivered", report.replayed).green()
        ));
    }

    if report.discarded > 0 {
        lines.push(format!(
            "  {} {}",
            "✗".red(),
            format!("{} rejected and discarded", report.discarded).red()
        ));
    }

    if report.remaining > 0 {
        lines.push(format!(
            "  {} {}",
            "○".yellow(),
            format!("{} still queued", report.remaining).yellow()
        ));
    }

    if let Some(stopped) = report.results.iter().find(|r| r.outcome.halts()) {
        lines.push(String::new());
        let reason = match &stopped.outcome {
            ReplayOutcome::Offline { error } => error.clone(),
            ReplayOutcome::Deferred { status } => format!("server answered {status}"),
            ReplayOutcome::Delivered { .. } | ReplayOutcome::Discarded { .. } => String::new(),
        };
        lines.push(format!(
            "Stopped at #{} {} {}: {}",
            stopped.id,
            stopped.method,
            stopped.url,
            reason.dimmed()
        ));
    }

    lines.join("\n")
}
