//! Records held by the offline queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PantryError;
use crate::http::{Headers, Method, Request};

/// A write that could not be delivered and is waiting for replay.
///
/// Records are immutable once stored. The queue only inserts and deletes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRequest {
    /// Store-assigned id; increases with every insert and is never reused.
    pub id: i64,
    /// Absolute request URL.
    pub url: String,
    /// `POST`, `PATCH` or `DELETE`.
    pub method: Method,
    /// Headers captured when the request was made, auth included.
    pub headers: Headers,
    /// Request payload; empty when the original had none.
    pub body: String,
    /// When the request was queued. Replay order is `id`, not this.
    pub timestamp: DateTime<Utc>,
}

/// A write about to be queued; the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQueuedRequest {
    pub url: String,
    pub method: Method,
    pub headers: Headers,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl NewQueuedRequest {
    /// Capture a failed write for later replay.
    ///
    /// # Errors
    ///
    /// Returns an error for methods that are never queued.
    pub fn from_request(request: &Request) -> Result<Self, PantryError> {
        ensure_queueable(request.method)?;
        Ok(Self {
            url: request.url.to_string(),
            method: request.method,
            headers: request.headers.clone(),
            body: request.body.clone().unwrap_or_default(),
            timestamp: Utc::now(),
        })
    }

    /// Attach the id assigned by the store.
    #[must_use]
    pub fn with_id(self, id: i64) -> QueuedRequest {
        QueuedRequest {
            id,
            url: self.url,
            method: self.method,
            headers: self.headers,
            body: self.body,
            timestamp: self.timestamp,
        }
    }
}

impl QueuedRequest {
    /// Rebuild the original request for replay.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored URL no longer parses.
    pub fn to_request(&self) -> Result<Request, PantryError> {
        let mut request = Request::parse(self.method, &self.url)?;
        request.headers.clone_from(&self.headers);
        if !self.body.is_empty() {
            request.body = Some(self.body.clone());
        }
        Ok(request)
    }
}

/// A queued write dropped because the server rejected its replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardedRequest {
    #[serde(flatten)]
    pub request: QueuedRequest,
    /// The 4xx status returned on replay.
    pub status: u16,
    pub discarded_at: DateTime<Utc>,
}

pub(super) fn ensure_queueable(method: Method) -> Result<(), PantryError> {
    if method.is_queueable() {
        Ok(())
    } else {
        Err(PantryError::InvalidRequest(format!(
            "{method} requests are never queued"
        )))
    }
}
