//! Directory-based snapshot registry

use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, info_span, warn, Span};

use super::error::{SnapshotError, SnapshotResult};
use super::meta::{PersistedSnapshotMeta, SnapshotMeta};
use super::reader::SnapshotReader;
use super::sink::SnapshotSink;
use super::{PERM_TEST_FILE, SNAPSHOTS_DIR, STATE_FILE, TMP_SUFFIX};
use crate::checksum::{checksum_reader, ChecksumWriter};
use crate::config::SnapshotStoreConfig;

/// State shared by a store and the sinks it creates
pub(crate) struct StoreInner {
    pub(crate) path: PathBuf,
    pub(crate) config: SnapshotStoreConfig,
    pub(crate) span: Span,
    /// Shared by every `StoreInner` over the same directory
    reap_lock: Arc<Mutex<()>>,
}

/// Snapshot store rooted at `<base>/snapshots`
///
/// Handles are cheap to clone and share one directory.
///
/// # Caller contract
///
/// Operations are synchronous and block on disk I/O. The store does not
/// serialize `create`, `list` or `open` against a sink that is committing
/// or cancelling: callers run at most one sink at a time per store and do
/// not list or open while a `close`/`cancel` is in flight. Two concurrent
/// `create` calls are unsupported. Reaping is the exception; explicit and
/// post-commit reaps are serialized internally.
#[derive(Clone)]
pub struct SnapshotStore {
    inner: Arc<StoreInner>,
}

impl SnapshotStore {
    /// Open a store under `base` keeping `retain` snapshots
    ///
    /// `base` must exist; the `snapshots` subdirectory is created if
    /// missing.
    pub fn new(base: impl AsRef<Path>, retain: usize) -> SnapshotResult<Self> {
        Self::with_config(base, SnapshotStoreConfig::default().with_retain(retain))
    }

    /// Open a store under `base` with explicit configuration
    ///
    /// Fails fast if the configuration is invalid or the snapshot directory
    /// is not writable.
    pub fn with_config(
        base: impl AsRef<Path>,
        config: SnapshotStoreConfig,
    ) -> SnapshotResult<Self> {
        config.validate()?;

        let path = base.as_ref().join(SNAPSHOTS_DIR);
        match fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(source) => return Err(SnapshotError::PathNotAccessible { path, source }),
        }

        test_permissions(&path).map_err(|source| SnapshotError::PermissionCheck {
            path: path.clone(),
            source,
        })?;

        let span = info_span!("snapshot_store", path = %path.display());
        info!(parent: &span, retain = config.retain, "Opened snapshot store");
        Ok(SnapshotStore {
            inner: Arc::new(StoreInner {
                path,
                config,
                span,
                reap_lock: Arc::new(Mutex::new(())),
            }),
        })
    }

    /// Replace the span that parents every diagnostic event
    ///
    /// Sinks created afterwards inherit it. Clones taken earlier keep the
    /// old span but still reap under the same lock.
    pub fn with_span(self, span: Span) -> Self {
        SnapshotStore {
            inner: Arc::new(StoreInner {
                path: self.inner.path.clone(),
                config: self.inner.config.clone(),
                span,
                reap_lock: Arc::clone(&self.inner.reap_lock),
            }),
        }
    }

    /// Snapshot directory
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Number of committed snapshots kept by a reap
    pub fn retain(&self) -> usize {
        self.inner.config.retain
    }

    /// Start a new snapshot covering the log up to `(term, index)`
    ///
    /// Creates `<id>.tmp/` with a provisional `meta.json` and an empty
    /// `state.bin`, and returns the sink that writes into it.
    pub fn create(
        &self,
        index: u64,
        term: u64,
        peers: impl Into<Vec<u8>>,
    ) -> SnapshotResult<SnapshotSink> {
        let span = &self.inner.span;
        let meta = SnapshotMeta::new(index, term, peers.into());
        let record = PersistedSnapshotMeta::provisional(meta);
        let dir = self
            .inner
            .path
            .join(format!("{}{}", record.meta.id, TMP_SUFFIX));
        info!(parent: span, path = %dir.display(), "Creating new snapshot");

        if let Err(e) = fs::create_dir(&dir) {
            error!(
                parent: span,
                path = %dir.display(),
                error = %e,
                "Failed to make snapshot directory"
            );
            return Err(e.into());
        }

        let file = record
            .write_to(&dir, false)
            .and_then(|()| File::create(dir.join(STATE_FILE)).map_err(SnapshotError::from));
        let file = match file {
            Ok(file) => file,
            Err(e) => {
                error!(
                    parent: span,
                    path = %dir.display(),
                    error = %e,
                    "Failed to initialize snapshot"
                );
                let _ = fs::remove_dir_all(&dir);
                return Err(e);
            }
        };

        let writer = BufWriter::with_capacity(
            self.inner.config.write_buffer_size,
            ChecksumWriter::new(file),
        );
        Ok(SnapshotSink::new(Arc::clone(&self.inner), dir, record, writer))
    }

    /// Committed snapshots, newest first, at most `retain` of them
    ///
    /// In-progress directories and unreadable metadata are skipped.
    pub fn list(&self) -> SnapshotResult<Vec<SnapshotMeta>> {
        let mut snapshots = self.inner.scan()?;
        snapshots.truncate(self.inner.config.retain);
        debug!(parent: &self.inner.span, count = snapshots.len(), "Listed snapshots");
        Ok(snapshots)
    }

    /// Open a committed snapshot for reading
    ///
    /// The whole payload is checksummed before returning; a mismatch fails
    /// with [`SnapshotError::ChecksumMismatch`]. The returned reader starts
    /// at byte 0.
    pub fn open(&self, id: &str) -> SnapshotResult<(SnapshotMeta, SnapshotReader)> {
        let span = &self.inner.span;
        debug!(parent: span, id, "Opening snapshot");
        validate_id(id)?;

        let dir = self.inner.path.join(id);
        let record = PersistedSnapshotMeta::read_from(&dir).map_err(|e| {
            error!(parent: span, id, error = %e, "Failed to read snapshot metadata");
            e
        })?;
        let stored = record.checksum.ok_or_else(|| SnapshotError::Uncommitted {
            id: id.to_string(),
        })?;

        let mut file = File::open(dir.join(STATE_FILE)).map_err(|e| {
            error!(parent: span, id, error = %e, "Failed to open state file");
            e
        })?;
        let computed = checksum_reader(&file).map_err(|e| {
            error!(parent: span, id, error = %e, "Failed to read state file");
            e
        })?;
        if computed != stored {
            error!(parent: span, id, stored, computed, "Snapshot CRC checksum failed");
            return Err(SnapshotError::ChecksumMismatch {
                id: id.to_string(),
                stored,
                computed,
            });
        }

        file.seek(SeekFrom::Start(0))?;
        Ok((record.meta, SnapshotReader::new(file)))
    }

    /// Delete every committed snapshot beyond the newest `retain`
    ///
    /// Stops at, and returns, the first deletion error.
    pub fn reap_snapshots(&self) -> SnapshotResult<()> {
        self.inner.reap()
    }

    /// Remove orphaned in-progress directories left by a crash
    ///
    /// Never called by the store itself. Only safe when no sink from this
    /// store is open. Returns how many directories were removed.
    pub fn cleanup_incomplete(&self) -> SnapshotResult<usize> {
        let span = &self.inner.span;
        let mut count = 0;
        for entry in fs::read_dir(&self.inner.path)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if entry.file_name().to_string_lossy().ends_with(TMP_SUFFIX) {
                info!(parent: span, path = %entry.path().display(), "Removing incomplete snapshot");
                fs::remove_dir_all(entry.path())?;
                count += 1;
            }
        }
        Ok(count)
    }
}

impl StoreInner {
    /// All committed snapshots, newest first
    pub(crate) fn scan(&self) -> SnapshotResult<Vec<SnapshotMeta>> {
        let entries = fs::read_dir(&self.path).map_err(|e| {
            error!(parent: &self.span, error = %e, "Failed to scan snapshot dir");
            e
        })?;

        let mut snapshots = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(TMP_SUFFIX) {
                info!(parent: &self.span, dir = %name, "Found temporary snapshot");
                continue;
            }

            match PersistedSnapshotMeta::read_from(&entry.path()) {
                Ok(record) if !record.is_committed() => {
                    warn!(
                        parent: &self.span,
                        dir = %name,
                        "Snapshot metadata has no checksum, skipping"
                    );
                }
                Ok(record) if record.meta.id != name => {
                    warn!(
                        parent: &self.span,
                        dir = %name,
                        id = %record.meta.id,
                        "Snapshot metadata does not match its directory, skipping"
                    );
                }
                Ok(record) => snapshots.push(record.meta),
                Err(e) => {
                    warn!(
                        parent: &self.span,
                        dir = %name,
                        error = %e,
                        "Failed to read metadata, skipping"
                    );
                }
            }
        }

        snapshots.sort_by(|a, b| b.cmp(a));
        Ok(snapshots)
    }

    pub(crate) fn reap(&self) -> SnapshotResult<()> {
        let _guard = self.reap_lock.lock();
        let snapshots = self.scan()?;

        for meta in snapshots.iter().skip(self.config.retain) {
            let path = self.path.join(&meta.id);
            info!(parent: &self.span, path = %path.display(), "Reaping snapshot");
            if let Err(e) = fs::remove_dir_all(&path) {
                error!(
                    parent: &self.span,
                    path = %path.display(),
                    error = %e,
                    "Failed to reap snapshot"
                );
                return Err(e.into());
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("path", &self.inner.path)
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Touch and remove a throwaway file to prove the directory is writable
fn test_permissions(path: &Path) -> io::Result<()> {
    let check_file = path.join(PERM_TEST_FILE);
    File::create(&check_file)?;
    fs::remove_file(&check_file)
}

/// Reject IDs that name an in-progress snapshot or leave the store
fn validate_id(id: &str) -> SnapshotResult<()> {
    let invalid = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains('/')
        || id.contains('\\')
        || id.ends_with(TMP_SUFFIX);
    if invalid {
        return Err(SnapshotError::InvalidId { id: id.to_string() });
    }
    Ok(())
}
