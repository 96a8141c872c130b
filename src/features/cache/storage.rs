//! Named response caches stored in the `cache_entries` table.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use crate::error::PantryError;
use crate::http::{Headers, Method, Request, Response};
use crate::storage::SharedDatabase;

/// Prefix shared by every cache this crate creates.
pub const CACHE_PREFIX: &str = "pantry";

/// The two cache names in use for one cache generation.
///
/// Static assets and API reads live in separate caches so that retiring one
/// leaves the other intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    pub static_assets: String,
    pub api: String,
}

impl CacheNames {
    /// Names for the given cache generation.
    #[must_use]
    pub fn for_version(version: u32) -> Self {
        Self {
            static_assets: format!("{CACHE_PREFIX}-static-v{version}"),
            api: format!("{CACHE_PREFIX}-api-v{version}"),
        }
    }

    /// Whether `name` belongs to this generation.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        name == self.static_assets || name == self.api
    }
}

/// Entry count and size of one named cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheSummary {
    pub name: String,
    pub entries: usize,
    pub bytes: u64,
    pub newest: Option<DateTime<Utc>>,
}

/// All named caches in one database.
#[derive(Clone)]
pub struct CacheStorage {
    db: Arc<SharedDatabase>,
}

impl CacheStorage {
    #[must_use]
    pub const fn new(db: Arc<SharedDatabase>) -> Self {
        Self { db }
    }

    /// Handle to the cache called `name`. Opening does not touch storage; a
    /// cache with no entries simply matches nothing.
    #[must_use]
    pub fn open(&self, name: &str) -> ResponseCache {
        ResponseCache {
            db: Arc::clone(&self.db),
            name: name.to_string(),
        }
    }

    /// Every cache that holds at least one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be read.
    pub fn summaries(&self) -> Result<Vec<CacheSummary>, PantryError> {
        let conn = self.db.get()?.connection()?;

        let mut stmt = conn
            .prepare(
                r"SELECT cache_name, COUNT(*), COALESCE(SUM(LENGTH(body)), 0), MAX(stored_at)
                  FROM cache_entries
                  GROUP BY cache_name
                  ORDER BY cache_name",
            )
            .map_err(|e| PantryError::Database(format!("Failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .map_err(|e| PantryError::Database(format!("Failed to list caches: {e}")))?;

        let mut summaries = Vec::new();
        for row in rows {
            let (name, entries, bytes, newest) =
                row.map_err(|e| PantryError::Database(e.to_string()))?;
            summaries.push(CacheSummary {
                name,
                entries: usize::try_from(entries)
                    .map_err(|e| PantryError::Database(e.to_string()))?,
                bytes: u64::try_from(bytes).map_err(|e| PantryError::Database(e.to_string()))?,
                newest: newest.as_deref().and_then(parse_timestamp),
            });
        }

        Ok(summaries)
    }

    /// Names of every cache that holds at least one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be read.
    pub fn names(&self) -> Result<Vec<String>, PantryError> {
        Ok(self.summaries()?.into_iter().map(|s| s.name).collect())
    }

    /// Delete a whole cache, returning how many entries it held.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be written.
    pub fn delete(&self, name: &str) -> Result<usize, PantryError> {
        let conn = self.db.get()?.connection()?;

        conn.execute("DELETE FROM cache_entries WHERE cache_name = ?1", [name])
            .map_err(|e| PantryError::Database(format!("Failed to delete cache {name}: {e}")))
    }
}

/// One named cache of `GET` responses keyed by URL.
pub struct ResponseCache {
    db: Arc<SharedDatabase>,
    name: String,
}

impl ResponseCache {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cached response for exactly this request, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be read.
    pub fn get(&self, request: &Request) -> Result<Option<Response>, PantryError> {
        if request.method != Method::Get {
            return Ok(None);
        }
        let conn = self.db.get()?.connection()?;

        let row = conn
            .query_row(
                r"SELECT status, headers, body FROM cache_entries
                  WHERE cache_name = ?1 AND url = ?2",
                params![self.name, request.cache_key()],
                |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| PantryError::Database(format!("Failed to read cache {}: {e}", self.name)))?;

        row.map(|(status, headers, body)| {
            let headers: Headers = serde_json::from_str(&headers)?;
            Ok(Response {
                status,
                headers,
                body,
            })
        })
        .transpose()
    }

    /// Store a copy of `response` for `request`, replacing any older entry.
    ///
    /// # Errors
    ///
    /// Returns an error for non-`GET` requests or if the database cannot be
    /// written.
    pub fn put(&self, request: &Request, response: &Response) -> Result<(), PantryError> {
        if request.method != Method::Get {
            return Err(PantryError::InvalidRequest(format!(
                "Only GET responses are cached, not {}",
                request.method
            )));
        }
        let headers = serde_json::to_string(&response.headers)?;
        let conn = self.db.get()?.connection()?;

        conn.execute(
            r"INSERT OR REPLACE INTO cache_entries (cache_name, url, status, headers, body, stored_at)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                self.name,
                request.cache_key(),
                response.status,
                headers,
                response.body,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| PantryError::Database(format!("Failed to write cache {}: {e}", self.name)))?;

        Ok(())
    }

    /// Number of entries in this cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be read.
    pub fn len(&self) -> Result<usize, PantryError> {
        let conn = self.db.get()?.connection()?;

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?1",
                [&self.name],
                |row| row.get(0),
            )
            .map_err(|e| PantryError::Database(format!("Failed to count cache {}: {e}", self.name)))?;

        usize::try_from(count).map_err(|e| PantryError::Database(e.to_string()))
    }

    /// Whether this cache has no entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be read.
    pub fn is_empty(&self) -> Result<bool, PantryError> {
        Ok(self.len()? == 0)
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_storage() -> CacheStorage {
        CacheStorage::new(Arc::new(SharedDatabase::in_memory()))
    }

    fn get(url: &str) -> Request {
        Request::parse(Method::Get, url).unwrap()
    }

    #[test]
    fn test_cache_names_for_version() {
        let names = CacheNames::for_version(3);
        assert_eq!(names.static_assets, "pantry-static-v3");
        assert_eq!(names.api, "pantry-api-v3");
        assert!(names.contains("pantry-api-v3"));
        assert!(!names.contains("pantry-api-v2"));
    }

    #[test]
    fn test_put_and_get() {
        let storage = create_test_storage();
        let cache = storage.open("pantry-static-v1");
        let request = get("https://app.test/index.html");
        let response = Response::new(200, "<html></html>").with_header("Content-Type", "text/html");

        assert!(cache.get(&request).unwrap().is_none());
        cache.put(&request, &response).unwrap();

        assert_eq!(cache.get(&request).unwrap(), Some(response));
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_put_replaces_entry() {
        let storage = create_test_storage();
        let cache = storage.open("pantry-api-v1");
        let request = get("https://api.test/rest/v1/lists");

        cache.put(&request, &Response::new(200, "[]")).unwrap();
        cache.put(&request, &Response::new(200, "[1]")).unwrap();

        assert_eq!(cache.get(&request).unwrap().unwrap().text(), "[1]");
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_caches_are_separate() {
        let storage = create_test_storage();
        let static_cache = storage.open("pantry-static-v1");
        let api_cache = storage.open("pantry-api-v1");
        let request = get("https://app.test/app.js");

        static_cache.put(&request, &Response::new(200, "js")).unwrap();

        assert!(api_cache.get(&request).unwrap().is_none());
        storage.delete("pantry-api-v1").unwrap();
        assert!(static_cache.get(&request).unwrap().is_some());
    }

    #[test]
    fn test_only_get_is_cached() {
        let storage = create_test_storage();
        let cache = storage.open("pantry-api-v1");
        let post = Request::parse(Method::Post, "https://api.test/rest/v1/lists").unwrap();

        assert!(cache.put(&post, &Response::new(201, "")).is_err());
        assert!(cache.get(&post).unwrap().is_none());
    }

    #[test]
    fn test_summaries() {
        let storage = create_test_storage();
        storage
            .open("pantry-static-v1")
            .put(&get("https://app.test/a"), &Response::new(200, "abcd"))
            .unwrap();
        storage
            .open("pantry-static-v1")
            .put(&get("https://app.test/b"), &Response::new(200, "ef"))
            .unwrap();
        storage
            .open("pantry-api-v1")
            .put(&get("https://api.test/x"), &Response::new(200, ""))
            .unwrap();

        let summaries = storage.summaries().unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "pantry-api-v1");
        assert_eq!(summaries[0].entries, 1);
        assert_eq!(summaries[0].bytes, 0);
        assert_eq!(summaries[1].entries, 2);
        assert_eq!(summaries[1].bytes, 6);
        assert!(summaries[1].newest.is_some());
    }

    #[test]
    fn test_summaries_report_database_errors() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let storage = CacheStorage::new(Arc::new(SharedDatabase::at(temp_dir.path())));

        assert!(matches!(storage.summaries(), Err(PantryError::Database(_))));
        assert!(storage.names().is_err());
    }
}
