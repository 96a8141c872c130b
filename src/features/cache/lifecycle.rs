//! Cache install and activation.
//!
//! `install` fills the static cache for the current generation; `activate`
//! retires every cache that does not belong to it.

use tracing::{info, warn};

use super::storage::{CacheNames, CacheStorage, ResponseCache};
use crate::error::PantryError;
use crate::http::{Method, Request, Transport};

/// Fetch every precache URL and store the responses.
///
/// Nothing is stored unless every URL answers with a 2xx response.
///
/// # Errors
///
/// Returns an error if any URL is invalid, unreachable, or not 2xx, or if the
/// cache cannot be written.
pub fn install(
    transport: &dyn Transport,
    cache: &ResponseCache,
    urls: &[String],
) -> Result<usize, PantryError> {
    let mut fetched = Vec::with_capacity(urls.len());

    for url in urls {
        let request = Request::parse(Method::Get, url)?;
        let response = transport.send(&request)?;
        if !response.is_success() {
            warn!(url = %url, status = response.status, "precache request failed");
            return Err(PantryError::Network(format!(
                "Precache of {url} returned {}",
                response.status
            )));
        }
        fetched.push((request, response));
    }

    for (request, response) in &fetched {
        cache.put(request, response)?;
    }

    info!(cache = cache.name(), count = fetched.len(), "precache installed");
    Ok(fetched.len())
}

/// Delete every cache not named in `current`, returning the deleted names.
///
/// # Errors
///
/// Returns an error if the cache storage cannot be read or written.
pub fn activate(storage: &CacheStorage, current: &CacheNames) -> Result<Vec<String>, PantryError> {
    let mut deleted = Vec::new();

    for name in storage.names()? {
        if current.contains(&name) {
            continue;
        }
        let entries = storage.delete(&name)?;
        info!(cache = %name, entries, "deleted stale cache");
        deleted.push(name);
    }

    Ok(deleted)
}
