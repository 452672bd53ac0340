//! Write handle for one in-progress snapshot

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn, Span};

use super::error::{SnapshotError, SnapshotResult};
use super::meta::{PersistedSnapshotMeta, SnapshotMeta};
use super::store::StoreInner;
use super::sync_dir;
use crate::checksum::ChecksumWriter;

/// Buffered writer in front of the hashing file writer
///
/// Bytes are hashed when the buffer drains into the file, so the checksum
/// always covers exactly what reached `state.bin`.
pub(crate) type StateWriter = BufWriter<ChecksumWriter<File>>;

enum SinkState {
    Open(StateWriter),
    Closed,
    Cancelled,
    /// `close` failed before the rename; only `cancel` can clean up
    Failed,
}

/// Append-only handle bound to one in-progress snapshot
///
/// Created by [`SnapshotStore::create`](super::SnapshotStore::create). Feed
/// the payload through [`Write`], then call [`close`](Self::close) to commit
/// or [`cancel`](Self::cancel) to discard. Both are idempotent. A sink
/// dropped while still open is cancelled.
pub struct SnapshotSink {
    store: Arc<StoreInner>,
    span: Span,
    dir: PathBuf,
    record: PersistedSnapshotMeta,
    state: SinkState,
}

impl SnapshotSink {
    pub(crate) fn new(
        store: Arc<StoreInner>,
        dir: PathBuf,
        record: PersistedSnapshotMeta,
        writer: StateWriter,
    ) -> Self {
        let span = store.span.clone();
        SnapshotSink {
            store,
            span,
            dir,
            record,
            state: SinkState::Open(writer),
        }
    }

    /// Snapshot ID; usable with `open` once committed
    pub fn id(&self) -> &str {
        &self.record.meta.id
    }

    /// Current descriptor; `size` is filled in by `close`
    pub fn meta(&self) -> &SnapshotMeta {
        &self.record.meta
    }

    /// Directory currently holding the snapshot
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Whether the sink still accepts writes
    pub fn is_open(&self) -> bool {
        matches!(self.state, SinkState::Open(_))
    }

    /// Commit the snapshot
    ///
    /// Flushes and finalizes the payload, records size and checksum in
    /// `meta.json`, then renames the directory to its permanent name. Only
    /// after the rename does the snapshot become visible. Old snapshots are
    /// reaped afterwards; a reap failure is logged and does not fail the
    /// commit.
    ///
    /// Calling `close` again, or after `cancel`, does nothing. If the
    /// commit fails before the rename the sink is left failed: call
    /// [`cancel`](Self::cancel) to remove what was written. Once renamed,
    /// the snapshot is committed and neither `cancel` nor `Drop` touches it.
    pub fn close(&mut self) -> SnapshotResult<()> {
        debug!(parent: &self.span, id = %self.id(), "Closing snapshot sink");
        let writer = match self.take_writer() {
            Some(writer) => writer,
            None if matches!(self.state, SinkState::Failed) => {
                return Err(SnapshotError::SinkFailed {
                    id: self.id().to_string(),
                })
            }
            None => return Ok(()),
        };

        if let Err(e) = self.commit(writer) {
            error!(
                parent: &self.span,
                id = %self.id(),
                error = %e,
                "Failed to commit snapshot"
            );
            return Err(e);
        }
        info!(
            parent: &self.span,
            id = %self.id(),
            size = self.record.meta.size,
            "Snapshot committed"
        );

        if let Err(e) = self.store.reap() {
            warn!(
                parent: &self.span,
                error = %e,
                "Failed to reap old snapshots after commit"
            );
        }
        Ok(())
    }

    /// Discard the snapshot
    ///
    /// Releases the state file, then removes the whole directory. Calling
    /// `cancel` again, or after a successful `close`, does nothing.
    pub fn cancel(&mut self) -> SnapshotResult<()> {
        debug!(parent: &self.span, id = %self.id(), "Cancelling snapshot sink");
        match mem::replace(&mut self.state, SinkState::Failed) {
            SinkState::Open(writer) => {
                if let Err(e) = finalize(writer, false) {
                    warn!(
                        parent: &self.span,
                        id = %self.id(),
                        error = %e,
                        "Failed to finalize cancelled snapshot"
                    );
                }
            }
            SinkState::Failed => {}
            terminal => {
                self.state = terminal;
                return Ok(());
            }
        }

        match fs::remove_dir_all(&self.dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                error!(
                    parent: &self.span,
                    path = %self.dir.display(),
                    error = %e,
                    "Failed to remove cancelled snapshot"
                );
                return Err(e.into());
            }
        }
        self.state = SinkState::Cancelled;
        info!(parent: &self.span, id = %self.id(), "Snapshot cancelled");
        Ok(())
    }

    /// Take the writer out of an open sink, leaving it marked failed
    fn take_writer(&mut self) -> Option<StateWriter> {
        match mem::replace(&mut self.state, SinkState::Failed) {
            SinkState::Open(writer) => Some(writer),
            other => {
                self.state = other;
                None
            }
        }
    }

    fn commit(&mut self, writer: StateWriter) -> SnapshotResult<()> {
        self.publish(writer)?;
        let dir_sync = if self.store.config.sync_on_commit {
            sync_dir(&self.store.path)
        } else {
            Ok(())
        };
        self.mark_committed(dir_sync);
        Ok(())
    }

    /// Finalize the payload, record it in `meta.json` and rename the
    /// directory to its permanent name
    fn publish(&mut self, writer: StateWriter) -> SnapshotResult<()> {
        let sync = self.store.config.sync_on_commit;

        let (size, checksum) = finalize(writer, sync)?;
        self.record.meta.size = size;
        self.record.checksum = Some(checksum);

        self.record.write_to(&self.dir, sync)?;

        let final_path = self.store.path.join(&self.record.meta.id);
        fs::rename(&self.dir, &final_path)?;
        self.dir = final_path;
        Ok(())
    }

    /// The rename has happened: the snapshot is visible and must survive
    /// `cancel` and `Drop`, even if syncing the store directory failed
    fn mark_committed(&mut self, dir_sync: io::Result<()>) {
        self.state = SinkState::Closed;
        if let Err(e) = dir_sync {
            warn!(
                parent: &self.span,
                id = %self.id(),
                error = %e,
                "Failed to sync snapshot directory after rename"
            );
        }
    }
}

/// Flush buffered bytes and release the state file
///
/// Returns the final payload size and checksum.
fn finalize(writer: StateWriter, sync: bool) -> io::Result<(u64, u64)> {
    let hashing = writer.into_inner().map_err(|e| e.into_error())?;
    let (file, checksum) = hashing.into_parts();
    if sync {
        file.sync_all()?;
    }
    let size = file.metadata()?.len();
    Ok((size, checksum))
}

fn sink_closed() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "snapshot sink is closed")
}

impl Write for SnapshotSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.state {
            SinkState::Open(writer) => writer.write(buf),
            _ => Err(sink_closed()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.state {
            SinkState::Open(writer) => writer.flush(),
            _ => Err(sink_closed()),
        }
    }
}

impl Drop for SnapshotSink {
    fn drop(&mut self) {
        if matches!(self.state, SinkState::Open(_) | SinkState::Failed) {
            warn!(
                parent: &self.span,
                id = %self.id(),
                "Snapshot sink dropped without close, cancelling"
            );
            let _ = self.cancel();
        }
    }
}

impl std::fmt::Debug for SnapshotSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotSink")
            .field("id", &self.record.meta.id)
            .field("dir", &self.dir)
            .field("open", &self.is_open())
            .finish()
    }
}
