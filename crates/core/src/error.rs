//! Error types for the log-store contract
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

/// Result type alias for log-store operations
pub type LogStoreResult<T> = std::result::Result<T, LogStoreError>;

/// Errors surfaced by [`LogStore`](crate::traits::LogStore) implementations
#[derive(Debug, Error)]
pub enum LogStoreError {
    /// No entry is stored at the requested index
    #[error("Log entry not found at index {index}")]
    NotFound {
        /// Requested index
        index: u64,
    },

    /// Inclusive range with `min > max`
    #[error("Invalid log range: min {min} > max {max}")]
    InvalidRange {
        /// Lower bound
        min: u64,
        /// Upper bound
        max: u64,
    },

    /// Discriminant does not name a known log type
    #[error("Unknown log type: {0}")]
    UnknownLogType(u8),

    /// I/O error from a durable implementation
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Backend-specific failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LogStoreError {
    /// Whether this error only reports a missing entry
    pub fn is_not_found(&self) -> bool {
        matches!(self, LogStoreError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = LogStoreError::NotFound { index: 42 };
        let msg = err.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("42"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_error_display_invalid_range() {
        let err = LogStoreError::InvalidRange { min: 9, max: 3 };
        let msg = err.to_string();
        assert!(msg.contains("min 9"));
        assert!(msg.contains("max 3"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: LogStoreError = io_err.into();
        assert!(matches!(err, LogStoreError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_error_display_storage() {
        let err = LogStoreError::Storage("write failed".to_string());
        assert!(err.to_string().contains("write failed"));
    }
}
