//! Buffered read handle for a verified snapshot

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};

/// Payload stream returned by [`SnapshotStore::open`](super::SnapshotStore::open)
///
/// The payload was checksummed in full before this handle was created and
/// the stream starts at byte 0. Dropping it closes the file.
#[derive(Debug)]
pub struct SnapshotReader {
    inner: BufReader<File>,
}

impl SnapshotReader {
    pub(crate) fn new(file: File) -> Self {
        SnapshotReader {
            inner: BufReader::new(file),
        }
    }

    /// Read the remaining payload into memory
    pub fn read_all(mut self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        self.inner.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Unwrap into the underlying file
    ///
    /// Bytes already buffered are discarded.
    pub fn into_inner(self) -> File {
        self.inner.into_inner()
    }
}

impl Read for SnapshotReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for SnapshotReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}
