//! Cache command implementation.

use crate::cli::args::{CacheCommands, OutputFormat};
use crate::error::PantryError;
use crate::offline::OfflineLayer;
use crate::output::{format_caches, to_json};

/// Execute cache subcommands.
///
/// # Errors
///
/// Returns an error if the cache storage cannot be read or written, or if a
/// precache fetch fails.
pub fn cache(
    layer: &OfflineLayer,
    cmd: CacheCommands,
    format: OutputFormat,
) -> Result<String, PantryError> {
    match cmd {
        CacheCommands::List => {
            let names = layer.cache_names();
            let current = [names.static_assets.as_str(), names.api.as_str()];
            format_caches(&layer.caches().summaries()?, &current, format)
        }
        CacheCommands::Install => {
            let count = layer.install()?;
            let name = &layer.cache_names().static_assets;
            match format {
                OutputFormat::Json => {
                    to_json(&serde_json::json!({ "cache": name, "installed": count }))
                }
                OutputFormat::Pretty => Ok(format!("Precached {count} assets into {name}")),
            }
        }
        CacheCommands::Activate => {
            let deleted = layer.activate()?;
            match format {
                OutputFormat::Json => to_json(&serde_json::json!({ "deleted": deleted })),
                OutputFormat::Pretty if deleted.is_empty() => {
                    Ok("No stale caches to delete".to_string())
                }
                OutputFormat::Pretty => Ok(format!("Deleted caches: {}", deleted.join(", "))),
            }
        }
        CacheCommands::Clear { name } => clear(layer, name, format),
    }
}

fn clear(
    layer: &OfflineLayer,
    name: Option<String>,
    format: OutputFormat,
) -> Result<String, PantryError> {
    let caches = layer.caches();
    let names = match name {
        Some(name) => {
            if !caches.names()?.contains(&name) {
                return Err(PantryError::NotFound(format!("Cache {name}")));
            }
            vec![name]
        }
        None => caches.names()?,
    };

    let mut entries = 0;
    for name in &names {
        entries += caches.delete(name)?;
    }

    match format {
        OutputFormat::Json => to_json(&serde_json::json!({
            "deleted": names,
            "entries": entries,
        })),
        OutputFormat::Pretty => Ok(format!(
            "Deleted {entries} cached responses from {} caches",
            names.len()
        )),
    }
}
