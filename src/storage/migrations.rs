//! Schema versioning.
//!
//! `PRAGMA user_version` records the last applied step; opening a database
//! applies every later step in order. Steps only ever add, so a queue written
//! by an older build can be replayed by a newer one.

use rusqlite::Connection;

use crate::error::PantryError;

const CURRENT_VERSION: i32 = 2;

/// Schema version of `conn`; 0 for a fresh database.
pub fn get_version(conn: &Connection) -> Result<i32, PantryError> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| PantryError::Database(format!("Failed to get schema version: {e}")))?;

    Ok(version)
}

fn set_version(conn: &Connection, version: i32) -> Result<(), PantryError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| PantryError::Database(format!("Failed to set schema version: {e}")))
}

/// Bring `conn` up to the current schema.
pub fn run(conn: &Connection) -> Result<(), PantryError> {
    let current = get_version(conn)?;

    if current >= CURRENT_VERSION {
        return Ok(());
    }

    for version in (current + 1)..=CURRENT_VERSION {
        run_migration(conn, version)?;
        set_version(conn, version)?;
    }

    Ok(())
}

fn run_migration(conn: &Connection, version: i32) -> Result<(), PantryError> {
    match version {
        1 => migrate_v1(conn),
        2 => migrate_v2(conn),
        _ => Err(PantryError::Database(format!(
            "Unknown migration version: {version}"
        ))),
    }
}

/// v1: the write queue (`request_queue`), its discard log
/// (`discarded_requests`) and the response caches (`cache_entries`).
fn migrate_v1(conn: &Connection) -> Result<(), PantryError> {
    conn.execute_batch(
        r"
        -- Offline write queue
        CREATE TABLE IF NOT EXISTS request_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL,
            method TEXT NOT NULL,
            headers TEXT NOT NULL DEFAULT '{}',
            body TEXT NOT NULL DEFAULT '',
            timestamp TEXT NOT NULL
        );

        -- Writes the server rejected on replay
        CREATE TABLE IF NOT EXISTS discarded_requests (
            id INTEGER PRIMARY KEY,
            url TEXT NOT NULL,
            method TEXT NOT NULL,
            headers TEXT NOT NULL DEFAULT '{}',
            body TEXT NOT NULL DEFAULT '',
            timestamp TEXT NOT NULL,
            status INTEGER NOT NULL,
            discarded_at TEXT NOT NULL
        );

        -- Response caches
        CREATE TABLE IF NOT EXISTS cache_entries (
            cache_name TEXT NOT NULL,
            url TEXT NOT NULL,
            status INTEGER NOT NULL,
            headers TEXT NOT NULL DEFAULT '{}',
            body BLOB NOT NULL,
            stored_at TEXT NOT NULL,
            PRIMARY KEY (cache_name, url)
        );
        ",
    )
    .map_err(|e| PantryError::Database(format!("Migration v1 failed: {e}")))
}

/// v2: `sync_lease`, a single row naming the one replayer allowed to drain
/// the queue, shared by every process using the file.
fn migrate_v2(conn: &Connection) -> Result<(), PantryError> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS sync_lease (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            holder TEXT NOT NULL,
            expires_at TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| PantryError::Database(format!("Migration v2 failed: {e}")))
}
