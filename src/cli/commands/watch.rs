//! Watch command implementation.
//!
//! Runs the background sync worker in the foreground and prints a line for
//! every completed pass.

use std::io::Write;
use std::sync::Arc;

use colored::Colorize;
use tracing::info;

use crate::cli::args::{OutputFormat, WatchArgs};
use crate::error::PantryError;
use crate::features::sync::{SyncMessage, SyncWorker};
use crate::offline::OfflineLayer;

/// Execute the watch command. Blocks until `--count` passes were reported,
/// or forever without it.
///
/// # Errors
///
/// Returns an error if the worker cannot start or stdout cannot be written.
pub fn watch(
    layer: &OfflineLayer,
    args: &WatchArgs,
    format: OutputFormat,
) -> Result<String, PantryError> {
    let coordinator = Arc::clone(layer.coordinator());
    let messages = coordinator.notifier().subscribe();
    let worker = SyncWorker::spawn(coordinator, layer.config().sync.poll_interval())?;

    info!(
        interval_secs = layer.config().sync.poll_interval_secs,
        "watching offline queue"
    );
    worker.trigger().request_sync();

    let mut stdout = std::io::stdout().lock();
    let mut seen = 0;
    while args.count.map_or(true, |count| seen < count) {
        let Ok(message) = messages.recv() else {
            break;
        };
        writeln!(stdout, "{}", format_message(&message, format)?)?;
        stdout.flush()?;
        seen += 1;
    }

    worker.shutdown()?;
    Ok(String::new())
}

fn format_message(message: &SyncMessage, format: OutputFormat) -> Result<String, PantryError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(message)?),
        OutputFormat::Pretty => {
            let SyncMessage::SyncComplete {
                replayed,
                discarded,
                remaining,
            } = message;
            let time = chrono::Local::now().format("%H:%M:%S").to_string();
            let discarded = if *discarded > 0 {
                format!("{discarded} discarded").red().to_string()
            } else {
                format!("{discarded} discarded")
            };
            Ok(format!(
                "{} sync complete: {} replayed, {}, {} remaining",
                time.dimmed(),
                replayed,
                discarded,
                remaining
            ))
        }
    }
}
