//! Queue store trait and its `SQLite` implementation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, TransactionBehavior};

use super::record::{ensure_queueable, DiscardedRequest, NewQueuedRequest, QueuedRequest};
use crate::error::PantryError;
use crate::http::{Headers, Method};
use crate::storage::SharedDatabase;

/// Durable FIFO storage for undelivered writes.
///
/// Every operation is atomic. Implementations serialize access internally, so
/// a store can be shared between the interceptor and the sync coordinator.
pub trait QueueStore: Send + Sync {
    /// Insert a record and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or written.
    fn enqueue(&self, record: NewQueuedRequest) -> Result<QueuedRequest, PantryError>;

    /// Every queued record, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list_all(&self) -> Result<Vec<QueuedRequest>, PantryError>;

    /// Delete a record. Removing an unknown id is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn remove(&self, id: i64) -> Result<(), PantryError>;

    /// Move a record into the discard log, recording the status the server
    /// rejected it with. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn discard(&self, id: i64, status: u16) -> Result<(), PantryError>;

    /// Every discarded record, oldest discard first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn discarded(&self) -> Result<Vec<DiscardedRequest>, PantryError>;

    /// Empty the discard log, returning how many entries it held.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn clear_discarded(&self) -> Result<usize, PantryError>;

    /// Number of queued records.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn len(&self) -> Result<usize, PantryError>;

    /// Whether the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn is_empty(&self) -> Result<bool, PantryError> {
        Ok(self.len()? == 0)
    }

    /// Drop every queued record, returning how many there were.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn clear(&self) -> Result<usize, PantryError>;

    /// Take or extend the replay lease for `holder`, valid for `ttl`.
    ///
    /// Only one holder may replay at a time, across every process sharing
    /// the store. Returns `false` while another holder's lease is unexpired.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn acquire_lease(&self, holder: &str, ttl: Duration) -> Result<bool, PantryError>;

    /// Give up the lease if `holder` still has it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn release_lease(&self, holder: &str) -> Result<(), PantryError>;
}

/// Expiry time `ttl` from now.
pub(super) fn lease_expiry(ttl: Duration) -> DateTime<Utc> {
    let now = Utc::now();
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or_else(|| now + chrono::Duration::days(365))
}

/// Queue store backed by the `request_queue` table.
pub struct SqliteQueueStore {
    db: Arc<SharedDatabase>,
}

impl SqliteQueueStore {
    /// Create a store over a shared, lazily-opened database.
    #[must_use]
    pub const fn new(db: Arc<SharedDatabase>) -> Self {
        Self { db }
    }
}

const SELECT_QUEUE: &str = "SELECT id, url, method, headers, body, timestamp FROM request_queue";

impl QueueStore for SqliteQueueStore {
    fn enqueue(&self, record: NewQueuedRequest) -> Result<QueuedRequest, PantryError> {
        ensure_queueable(record.method)?;
        let headers = serde_json::to_string(&record.headers)?;
        let conn = self.db.get()?.connection()?;

        conn.execute(
            r"INSERT INTO request_queue (url, method, headers, body, timestamp)
              VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.url,
                record.method.as_str(),
                headers,
                record.body,
                record.timestamp.to_rfc3339(),
            ],
        )
        .map_err(|e| PantryError::Database(format!("Failed to enqueue request: {e}")))?;

        Ok(record.with_id(conn.last_insert_rowid()))
    }

    fn list_all(&self) -> Result<Vec<QueuedRequest>, PantryError> {
        let conn = self.db.get()?.connection()?;

        let mut stmt = conn
            .prepare(&format!("{SELECT_QUEUE} ORDER BY id ASC"))
            .map_err(|e| PantryError::Database(format!("Failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], QueueRow::read)
            .map_err(|e| PantryError::Database(format!("Failed to query queue: {e}")))?;

        let mut records = Vec::new();
        for row in rows {
            let row = row.map_err(|e| PantryError::Database(e.to_string()))?;
            records.push(row.into_record()?);
        }

        Ok(records)
    }

    fn remove(&self, id: i64) -> Result<(), PantryError> {
        let conn = self.db.get()?.connection()?;

        conn.execute("DELETE FROM request_queue WHERE id = ?1", [id])
            .map_err(|e| PantryError::Database(format!("Failed to remove request {id}: {e}")))?;

        Ok(())
    }

    fn discard(&self, id: i64, status: u16) -> Result<(), PantryError> {
        let mut conn = self.db.get()?.connection()?;
        let tx = conn
            .transaction()
            .map_err(|e| PantryError::Database(format!("Failed to begin transaction: {e}")))?;

        tx.execute(
            r"INSERT OR REPLACE INTO discarded_requests
                  (id, url, method, headers, body, timestamp, status, discarded_at)
              SELECT id, url, method, headers, body, timestamp, ?2, ?3
              FROM request_queue WHERE id = ?1",
            params![id, status, Utc::now().to_rfc3339()],
        )
        .map_err(|e| PantryError::Database(format!("Failed to log discarded request: {e}")))?;

        tx.execute("DELETE FROM request_queue WHERE id = ?1", [id])
            .map_err(|e| PantryError::Database(format!("Failed to remove request {id}: {e}")))?;

        tx.commit()
            .map_err(|e| PantryError::Database(format!("Failed to commit discard: {e}")))
    }

    fn discarded(&self) -> Result<Vec<DiscardedRequest>, PantryError> {
        let conn = self.db.get()?.connection()?;

        let mut stmt = conn
            .prepare(
                r"SELECT id, url, method, headers, body, timestamp, status, discarded_at
                  FROM discarded_requests
                  ORDER BY discarded_at ASC, id ASC",
            )
            .map_err(|e| PantryError::Database(format!("Failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((QueueRow::read(row)?, row.get::<_, u16>(6)?, row.get::<_, String>(7)?))
            })
            .map_err(|e| PantryError::Database(format!("Failed to query discard log: {e}")))?;

        let mut records = Vec::new();
        for row in rows {
            let (queue_row, status, discarded_at) =
                row.map_err(|e| PantryError::Database(e.to_string()))?;
            records.push(DiscardedRequest {
                request: queue_row.into_record()?,
                status,
                discarded_at: parse_timestamp(&discarded_at),
            });
        }

        Ok(records)
    }

    fn clear_discarded(&self) -> Result<usize, PantryError> {
        let conn = self.db.get()?.connection()?;

        conn.execute("DELETE FROM discarded_requests", [])
            .map_err(|e| PantryError::Database(format!("Failed to clear discard log: {e}")))
    }

    fn len(&self) -> Result<usize, PantryError> {
        let conn = self.db.get()?.connection()?;

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM request_queue", [], |row| row.get(0))
            .map_err(|e| PantryError::Database(format!("Failed to count queue: {e}")))?;

        usize::try_from(count).map_err(|e| PantryError::Database(e.to_string()))
    }

    fn clear(&self) -> Result<usize, PantryError> {
        let conn = self.db.get()?.connection()?;

        conn.execute("DELETE FROM request_queue", [])
            .map_err(|e| PantryError::Database(format!("Failed to clear queue: {e}")))
    }

    fn acquire_lease(&self, holder: &str, ttl: Duration) -> Result<bool, PantryError> {
        let mut conn = self.db.get()?.connection()?;
        // IMMEDIATE takes the write lock up front, so the read below cannot go
        // stale before the write
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<(String, String)> = tx
            .query_row(
                "SELECT holder, expires_at FROM sync_lease WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let free = current.map_or(true, |(owner, expires_at)| {
            owner == holder || parse_timestamp(&expires_at) <= Utc::now()
        });
        if free {
            tx.execute(
                "INSERT OR REPLACE INTO sync_lease (id, holder, expires_at) VALUES (1, ?1, ?2)",
                params![holder, lease_expiry(ttl).to_rfc3339()],
            )?;
        }

        tx.commit()?;
        Ok(free)
    }

    fn release_lease(&self, holder: &str) -> Result<(), PantryError> {
        let conn = self.db.get()?.connection()?;

        conn.execute("DELETE FROM sync_lease WHERE id = 1 AND holder = ?1", [holder])?;
        Ok(())
    }
}

/// Raw columns of a queue row, decoded after the statement finishes.
struct QueueRow {
    id: i64,
    url: String,
    method: String,
    headers: String,
    body: String,
    timestamp: String,
}

impl QueueRow {
    fn read(row: &rusqlite::Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            url: row.get(1)?,
            method: row.get(2)?,
            headers: row.get(3)?,
            body: row.get(4)?,
            timestamp: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<QueuedRequest, PantryError> {
        let method: Method = self.method.parse()?;
        let headers: Headers = serde_json::from_str(&self.headers)?;

        Ok(QueuedRequest {
            id: self.id,
            url: self.url,
            method,
            headers,
            body: self.body,
            timestamp: parse_timestamp(&self.timestamp),
        })
    }
}

// Timestamps are diagnostic only, so an unreadable one is not fatal
fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |t| t.with_timezone(&Utc))
}
