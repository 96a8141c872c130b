//! Error types for pantry.

use thiserror::Error;

/// Errors raised by the offline layer and the CLI.
#[derive(Debug, Error)]
pub enum PantryError {
    /// `SQLite` storage failed (open, migrate, query).
    #[error("database error: {0}")]
    Database(String),

    /// Configuration could not be read, parsed, or written.
    #[error("configuration error: {0}")]
    Config(String),

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The request is malformed or cannot be handled.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A requested item does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// JSON encoding or decoding failed.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Filesystem or process I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PantryError {
    /// Whether the error means the network was unreachable.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<rusqlite::Error> for PantryError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = PantryError::Network("connection refused".to_string());
        assert_eq!(err.to_string(), "network error: connection refused");
        assert!(err.is_network());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PantryError = json_err.into();
        assert!(matches!(err, PantryError::Parse(_)));
        assert!(!err.is_network());
    }
}
