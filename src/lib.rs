//! raftstore - durable persistence core for Raft
//!
//! Two halves of a node's durable state:
//!
//! - the snapshot store: atomic, checksummed, crash-safe snapshots on disk
//! - the log-store contract: the trait the replication engine writes
//!   committed entries through
//!
//! # Quick Start
//!
//! ```no_run
//! use std::io::{Read, Write};
//! use raftstore::SnapshotStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SnapshotStore::new("/var/lib/raft", 2)?;
//!
//! let mut sink = store.create(120, 3, b"peers".to_vec())?;
//! sink.write_all(b"state machine bytes")?;
//! sink.close()?;
//!
//! let snapshots = store.list()?;
//! let latest = &snapshots[0];
//! let (_meta, mut reader) = store.open(&latest.id)?;
//! let mut state = Vec::new();
//! reader.read_to_end(&mut state)?;
//! # Ok(())
//! # }
//! ```

pub use raftstore_core::*;
pub use raftstore_durability::*;
