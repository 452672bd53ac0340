//! Directory-per-snapshot store with atomic commit
//!
//! # Layout
//!
//! ```text
//! <base>/snapshots/
//! ├── permTest                          # transient, permission self-check
//! ├── 1-10-2024-03-01T12:00:00.1Z/      # committed
//! │   ├── meta.json
//! │   └── state.bin
//! └── 2-1-2024-03-01T12:05:00.2Z.tmp/   # in progress, never listed
//!     ├── meta.json                     # provisional, checksum null
//!     └── state.bin
//! ```
//!
//! # Crash Safety
//!
//! A sink writes everything inside a `.tmp` directory and commits with a
//! single rename:
//! 1. Write payload to `state.bin` while accumulating its CRC-64
//! 2. Flush (and fsync) the payload
//! 3. Rewrite `meta.json` with size and checksum (and fsync)
//! 4. Atomic rename `<id>.tmp` to `<id>`
//! 5. fsync the store directory
//!
//! A directory is therefore either absent, in progress (invisible), or
//! committed (visible and never modified again). Anything still carrying
//! the marker after a restart is incomplete.

mod error;
mod meta;
mod reader;
mod sink;
mod store;

pub use error::{SnapshotError, SnapshotResult};
pub use meta::{parse_snapshot_id, snapshot_id, PersistedSnapshotMeta, SnapshotMeta};
pub use reader::SnapshotReader;
pub use sink::SnapshotSink;
pub use store::SnapshotStore;

use std::fs::File;
use std::io;
use std::path::Path;

/// Subdirectory of the base path holding all snapshots
pub const SNAPSHOTS_DIR: &str = "snapshots";

/// Metadata record inside each snapshot directory
pub const META_FILE: &str = "meta.json";

/// Raw payload inside each snapshot directory
pub const STATE_FILE: &str = "state.bin";

/// Marker suffix of in-progress snapshot directories
pub const TMP_SUFFIX: &str = ".tmp";

/// Throwaway file used by the permission self-check
pub const PERM_TEST_FILE: &str = "permTest";

/// fsync a directory so a preceding rename or unlink is durable
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}
