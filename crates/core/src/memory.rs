//! In-memory `LogStore`
//!
//! A volatile reference implementation of the log contract. Useful for
//! tests and for nodes that deliberately keep their log in memory.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::{LogStoreError, LogStoreResult};
use crate::traits::LogStore;
use crate::types::LogEntry;

/// BTreeMap-backed log store guarded by a single `RwLock`
///
/// Batched writes take the write lock once, so readers observe either the
/// whole batch or none of it.
#[derive(Debug, Default)]
pub struct MemLogStore {
    entries: RwLock<BTreeMap<u64, LogEntry>>,
}

impl MemLogStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl LogStore for MemLogStore {
    fn first_index(&self) -> LogStoreResult<u64> {
        Ok(self.entries.read().keys().next().copied().unwrap_or(0))
    }

    fn last_index(&self) -> LogStoreResult<u64> {
        Ok(self.entries.read().keys().next_back().copied().unwrap_or(0))
    }

    fn get_log(&self, index: u64) -> LogStoreResult<LogEntry> {
        self.entries
            .read()
            .get(&index)
            .cloned()
            .ok_or(LogStoreError::NotFound { index })
    }

    fn store_logs(&self, entries: &[LogEntry]) -> LogStoreResult<()> {
        let mut map = self.entries.write();
        for entry in entries {
            map.insert(entry.index, entry.clone());
        }
        Ok(())
    }

    fn delete_range(&self, min: u64, max: u64) -> LogStoreResult<()> {
        if min > max {
            return Err(LogStoreError::InvalidRange { min, max });
        }
        let mut map = self.entries.write();
        let doomed: Vec<u64> = map.range(min..=max).map(|(k, _)| *k).collect();
        for index in doomed {
            map.remove(&index);
        }
        Ok(())
    }
}
