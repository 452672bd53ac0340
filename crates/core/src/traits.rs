//! Durable log contract
//!
//! The replication engine depends on this trait, never on a concrete log
//! backend. Together with the snapshot store it forms the durable-state
//! boundary of a Raft node.

use crate::error::LogStoreResult;
use crate::types::LogEntry;

/// Durable storage for replicated log entries
///
/// Thread safety: all methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync). Implementations use interior
/// mutability for writes.
pub trait LogStore: Send + Sync {
    /// Index of the first stored entry, or 0 if the log is empty
    fn first_index(&self) -> LogStoreResult<u64>;

    /// Index of the last stored entry, or 0 if the log is empty
    fn last_index(&self) -> LogStoreResult<u64>;

    /// Get the entry stored at `index`
    ///
    /// # Errors
    ///
    /// Returns [`LogStoreError::NotFound`](crate::LogStoreError::NotFound)
    /// if no entry exists at that index.
    fn get_log(&self, index: u64) -> LogStoreResult<LogEntry>;

    /// Store a single entry, replacing any entry at the same index
    fn store_log(&self, entry: &LogEntry) -> LogStoreResult<()> {
        self.store_logs(std::slice::from_ref(entry))
    }

    /// Store a batch of entries
    ///
    /// The batch is atomic from the caller's perspective: either every
    /// entry becomes visible to subsequent `get_log`/`last_index` calls or
    /// none does.
    fn store_logs(&self, entries: &[LogEntry]) -> LogStoreResult<()>;

    /// Delete all entries with `min <= index <= max`
    ///
    /// Used for compaction after a snapshot and for truncating a
    /// conflicting suffix.
    fn delete_range(&self, min: u64, max: u64) -> LogStoreResult<()>;
}
