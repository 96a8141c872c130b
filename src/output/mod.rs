//! Output formatting for pantry.
//!
//! This module provides formatters for displaying queue, cache, and response
//! data in various formats.

mod json;
mod pretty;

use crate::cli::args::OutputFormat;
use crate::error::PantryError;
use crate::features::cache::CacheSummary;
use crate::features::queue::{DiscardedRequest, QueuedRequest};
use crate::http::Response;

pub use json::*;
pub use pretty::*;

/// Format queued requests based on output format
///
/// # Errors
///
/// Returns `PantryError::Parse` if JSON serialization fails.
pub fn format_queue(records: &[QueuedRequest], format: OutputFormat) -> Result<String, PantryError> {
    match format {
        OutputFormat::Pretty => Ok(format_queue_pretty(records)),
        OutputFormat::Json => format_queue_json(records),
    }
}

/// Format discarded requests based on output format
///
/// # Errors
///
/// Returns `PantryError::Parse` if JSON serialization fails.
pub fn format_discarded(
    records: &[DiscardedRequest],
    format: OutputFormat,
) -> Result<String, PantryError> {
    match format {
        OutputFormat::Pretty => Ok(format_discarded_pretty(records)),
        OutputFormat::Json => format_discarded_json(records),
    }
}

/// Format cache summaries based on output format
///
/// # Errors
///
/// Returns `PantryError::Parse` if JSON serialization fails.
pub fn format_caches(
    caches: &[CacheSummary],
    current: &[&str],
    format: OutputFormat,
) -> Result<String, PantryError> {
    match format {
        OutputFormat::Pretty => Ok(format_caches_pretty(caches, current)),
        OutputFormat::Json => format_caches_json(caches),
    }
}

/// Format a response based on output format
///
/// # Errors
///
/// Returns `PantryError::Parse` if JSON serialization fails.
pub fn format_response(response: &Response, format: OutputFormat) -> Result<String, PantryError> {
    match format {
        OutputFormat::Pretty => Ok(format_response_pretty(response)),
        OutputFormat::Json => format_response_json(response),
    }
}
