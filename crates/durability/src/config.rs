//! Snapshot store configuration.
//!
//! Controls retention, write buffering and the fsync policy applied when a
//! snapshot is committed.

/// Default write buffer in front of the state file (64KB)
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Default number of committed snapshots to keep
pub const DEFAULT_RETAIN: usize = 2;

/// Snapshot store configuration parameters.
#[derive(Debug, Clone)]
pub struct SnapshotStoreConfig {
    /// Number of committed snapshots kept after a reap (minimum 1).
    pub retain: usize,

    /// Capacity of the buffer between sink writes and the state file.
    pub write_buffer_size: usize,

    /// fsync the state file, metadata and store directory on commit
    /// (default: true).
    ///
    /// Disabling this keeps the rename-for-visibility guarantee but a
    /// committed snapshot may be lost on power failure.
    pub sync_on_commit: bool,
}

impl Default for SnapshotStoreConfig {
    fn default() -> Self {
        SnapshotStoreConfig {
            retain: DEFAULT_RETAIN,
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            sync_on_commit: true,
        }
    }
}

impl SnapshotStoreConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retention count (builder pattern).
    pub fn with_retain(mut self, retain: usize) -> Self {
        self.retain = retain;
        self
    }

    /// Set the write buffer size (builder pattern).
    pub fn with_write_buffer_size(mut self, bytes: usize) -> Self {
        self.write_buffer_size = bytes;
        self
    }

    /// Enable or disable fsync on commit (builder pattern).
    pub fn with_sync_on_commit(mut self, sync: bool) -> Self {
        self.sync_on_commit = sync;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retain < 1 {
            return Err(ConfigError::RetainTooSmall {
                retain: self.retain,
            });
        }
        if self.write_buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        Ok(())
    }

    /// Create a configuration suited to tests (small buffer, no fsync).
    pub fn for_testing() -> Self {
        SnapshotStoreConfig {
            retain: DEFAULT_RETAIN,
            write_buffer_size: 512,
            sync_on_commit: false,
        }
    }
}

/// Snapshot store configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Retention count below one.
    #[error("Must retain at least one snapshot (got {retain})")]
    RetainTooSmall {
        /// Rejected value
        retain: usize,
    },

    /// Zero-capacity write buffer.
    #[error("Write buffer size must be non-zero")]
    ZeroBufferSize,
}
