//! Error types for the snapshot store

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type for snapshot store operations
pub type SnapshotResult<T> = std::result::Result<T, SnapshotError>;

/// Errors that can occur while creating, committing, listing or opening
/// snapshots
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Rejected store configuration
    #[error("Invalid snapshot store config: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The snapshot directory could not be created or accessed
    #[error("Snapshot path not accessible: {path}: {source}")]
    PathNotAccessible {
        /// Snapshot directory
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The snapshot directory is not writable
    #[error("Permissions test failed for {path}: {source}")]
    PermissionCheck {
        /// Snapshot directory
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Metadata record could not be encoded or decoded
    #[error("Snapshot metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// Payload does not match its stored checksum
    #[error("CRC mismatch for snapshot {id}: stored {stored:#018x}, computed {computed:#018x}")]
    ChecksumMismatch {
        /// Snapshot ID
        id: String,
        /// Checksum recorded at commit
        stored: u64,
        /// Checksum recomputed from the state file
        computed: u64,
    },

    /// Metadata carries no checksum, so the snapshot was never committed
    #[error("Snapshot {id} is not committed")]
    Uncommitted {
        /// Snapshot ID
        id: String,
    },

    /// ID names an in-progress snapshot or escapes the store directory
    #[error("Invalid snapshot id: {id:?}")]
    InvalidId {
        /// Rejected ID
        id: String,
    },

    /// An earlier `close` failed after finalizing; only `cancel` remains
    #[error("Snapshot {id} failed to commit; cancel it")]
    SinkFailed {
        /// Snapshot ID
        id: String,
    },
}

impl SnapshotError {
    /// Whether this error signals data corruption rather than an I/O fault
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, SnapshotError::ChecksumMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_mismatch_display() {
        let err = SnapshotError::ChecksumMismatch {
            id: "1-5-x".to_string(),
            stored: 1,
            computed: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("CRC mismatch"));
        assert!(msg.contains("1-5-x"));
        assert!(err.is_integrity_error());
    }

    #[test]
    fn test_io_is_not_integrity_error() {
        let err: SnapshotError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, SnapshotError::Io(_)));
        assert!(!err.is_integrity_error());
    }

    #[test]
    fn test_config_error_converts() {
        let err: SnapshotError = ConfigError::RetainTooSmall { retain: 0 }.into();
        assert!(matches!(err, SnapshotError::InvalidConfig(_)));
        assert!(err.to_string().contains("at least one"));
    }
}
