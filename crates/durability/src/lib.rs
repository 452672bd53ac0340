//! Durability layer for raftstore
//!
//! This crate handles everything that touches disk on the snapshot side of
//! a Raft node:
//!
//! - Checksum: incremental CRC-64 over snapshot payloads
//! - Snapshot store: directory-per-snapshot registry with atomic commit,
//!   verified reads and retention-based reaping
//! - Snapshot sink: write-once handle for one in-progress snapshot
//! - Configuration: retention, buffering and fsync policy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checksum; // CRC-64 accumulator and hashing writer
pub mod config; // Store configuration and validation
pub mod snapshot; // Snapshot store, sink, reader and metadata

pub use checksum::{checksum_reader, Checksum, ChecksumWriter};
pub use config::{ConfigError, SnapshotStoreConfig};
pub use snapshot::{
    parse_snapshot_id, snapshot_id, PersistedSnapshotMeta, SnapshotError, SnapshotMeta,
    SnapshotReader, SnapshotResult, SnapshotSink, SnapshotStore, META_FILE, SNAPSHOTS_DIR,
    STATE_FILE, TMP_SUFFIX,
};
