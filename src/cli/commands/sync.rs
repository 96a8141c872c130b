//! Sync queue command implementation.
//!
//! Handles offline queue management commands.

use chrono::Utc;
use colored::Colorize;

use crate::cli::args::{OutputFormat, SyncCommands};
use crate::error::PantryError;
use crate::features::queue::QueueStore;
use crate::features::sync::{format_sync_report, SyncCoordinator};
use crate::offline::OfflineLayer;
use crate::output::{format_discarded, format_queue, to_json};

/// Execute sync subcommands.
///
/// # Errors
///
/// Returns an error if the queue cannot be read or written, or if output
/// formatting fails.
pub fn sync(
    layer: &OfflineLayer,
    cmd: SyncCommands,
    format: OutputFormat,
) -> Result<String, PantryError> {
    let queue = layer.queue();

    match cmd {
        SyncCommands::Status => show_status(queue, format),
        SyncCommands::Run => run_sync(layer.coordinator(), format),
        SyncCommands::List { limit } => {
            let records: Vec<_> = queue.list_all()?.into_iter().take(limit).collect();
            format_queue(&records, format)
        }
        SyncCommands::Discarded => format_discarded(&queue.discarded()?, format),
        SyncCommands::Dismiss => dismiss_discarded(queue, format),
        SyncCommands::Clear { force } => clear_queue(queue, force, format),
    }
}

/// Show queue status.
fn show_status(queue: &dyn QueueStore, format: OutputFormat) -> Result<String, PantryError> {
    let pending = queue.list_all()?;
    let discarded = queue.discarded()?.len();
    let oldest = pending.first().map(|r| r.timestamp);

    match format {
        OutputFormat::Json => {
            let data = serde_json::json!({
                "pending": pending.len(),
                "discarded": discarded,
                "oldest_pending": oldest.map(|t| t.to_rfc3339()),
            });
            to_json(&data)
        }
        OutputFormat::Pretty => {
            let mut lines = Vec::new();

            lines.push("Offline Queue Status".bold().to_string());
            lines.push("─".repeat(40));

            lines.push(format!(
                "  Pending:    {} {}",
                pending.len(),
                if pending.is_empty() {
                    "".dimmed()
                } else {
                    "writes waiting".dimmed()
                }
            ));

            lines.push(format!(
                "  Discarded:  {} {}",
                discarded,
                if discarded > 0 {
                    "writes rejected by the server".red()
                } else {
                    "".normal()
                }
            ));

            if let Some(oldest) = oldest {
                let age = Utc::now().signed_duration_since(oldest);
                let age_str = if age.num_hours() > 0 {
                    format!("{} hours ago", age.num_hours())
                } else if age.num_minutes() > 0 {
                    format!("{} minutes ago", age.num_minutes())
                } else {
                    "just now".to_string()
                };
                lines.push(format!("  Oldest:     {}", age_str.dimmed()));
            }

            if !pending.is_empty() {
                lines.push(String::new());
                lines.push(
                    "Run 'pantry sync run' to replay pending writes"
                        .dimmed()
                        .to_string(),
                );
            }

            Ok(lines.join("\n"))
        }
    }
}

/// Replay queued writes.
fn run_sync(coordinator: &SyncCoordinator, format: OutputFormat) -> Result<String, PantryError> {
    let report = coordinator.drain()?;

    match format {
        OutputFormat::Json => to_json(&report),
        OutputFormat::Pretty => {
            if report.busy {
                Ok(format!(
                    "Another pantry process is replaying the queue ({} pending).",
                    report.remaining
                ))
            } else if report.attempted() == 0 {
                Ok("No pending writes to sync.".to_string())
            } else {
                Ok(format_sync_report(&report))
            }
        }
    }
}

/// Empty the discard log.
fn dismiss_discarded(queue: &dyn QueueStore, format: OutputFormat) -> Result<String, PantryError> {
    let count = queue.clear_discarded()?;

    match format {
        OutputFormat::Json => to_json(&serde_json::json!({ "dismissed": count })),
        OutputFormat::Pretty => Ok(format!("Dismissed {count} discarded writes")),
    }
}

/// Drop every queued write.
fn clear_queue(
    queue: &dyn QueueStore,
    force: bool,
    format: OutputFormat,
) -> Result<String, PantryError> {
    if !force {
        return Err(PantryError::Config(
            "Use --force to drop unsent writes".to_string(),
        ));
    }
    let count = queue.clear()?;

    match format {
        OutputFormat::Json => to_json(&serde_json::json!({ "cleared": count })),
        OutputFormat::Pretty => Ok(format!("Dropped {count} queued writes")),
    }
}
