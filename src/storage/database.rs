//! `SQLite` database connection and operations.
//!
//! The database is stored at `~/.pantry/pantry.db` and contains tables for:
//! - The offline request queue
//! - The discard log of writes the server rejected on replay
//! - Cached responses for static assets and API reads

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use once_cell::sync::OnceCell;
use rusqlite::Connection;

use crate::error::PantryError;

use super::migrations;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection wrapper.
///
/// The connection sits behind a mutex so that a single handle can be shared
/// by the interceptor, the caches and the sync worker.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database file at `path`, creating and migrating it as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_at(path: &Path) -> Result<Self, PantryError> {
        let conn = Connection::open(path).map_err(|e| {
            PantryError::Database(format!("Failed to open database {}: {e}", path.display()))
        })?;

        // WAL keeps readers from blocking the writer across processes
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
            .map_err(|e| PantryError::Database(format!("Failed to configure database: {e}")))?;
        // Other pantry processes may hold the write lock briefly
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| PantryError::Database(format!("Failed to configure database: {e}")))?;

        Self::from_connection(conn)
    }

    /// Open a private in-memory database. Its contents vanish with the handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub fn open_in_memory() -> Result<Self, PantryError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            PantryError::Database(format!("Failed to open in-memory database: {e}"))
        })?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| PantryError::Database(format!("Failed to enable foreign keys: {e}")))?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, PantryError> {
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get the current schema version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be read.
    pub fn schema_version(&self) -> Result<i32, PantryError> {
        migrations::get_version(&*self.connection()?)
    }

    /// Lock and return the underlying connection.
    ///
    /// Feature modules hold the guard for the duration of one statement or
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if a previous holder panicked while holding the lock.
    pub fn connection(&self) -> Result<MutexGuard<'_, Connection>, PantryError> {
        self.conn
            .lock()
            .map_err(|_| PantryError::Database("Database lock poisoned".to_string()))
    }
}

/// Where a [`SharedDatabase`] opens its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// A file on disk.
    File(PathBuf),
    /// A private in-memory database.
    InMemory,
}

/// A database handle that opens on first use and stays open for the life of
/// the process.
///
/// An open failure is returned to whichever caller triggered it; the next
/// caller tries again.
pub struct SharedDatabase {
    location: DatabaseLocation,
    cell: OnceCell<Database>,
}

impl SharedDatabase {
    /// Create a handle for the given location without opening it.
    #[must_use]
    pub const fn new(location: DatabaseLocation) -> Self {
        Self {
            location,
            cell: OnceCell::new(),
        }
    }

    /// Create a handle for a database file.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self::new(DatabaseLocation::File(path.into()))
    }

    /// Create a handle for a private in-memory database.
    #[must_use]
    pub const fn in_memory() -> Self {
        Self::new(DatabaseLocation::InMemory)
    }

    /// Whether the database has been opened yet.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Get the database, opening it if this is the first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn get(&self) -> Result<&Database, PantryError> {
        self.cell.get_or_try_init(|| match &self.location {
            DatabaseLocation::File(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                tracing::debug!(path = %path.display(), "opening database");
                Database::open_at(path)
            },
            DatabaseLocation::InMemory => Database::open_in_memory(),
        })
    }
}
