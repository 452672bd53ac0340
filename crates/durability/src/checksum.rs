//! Incremental CRC-64 over snapshot payloads
//!
//! The writer side feeds the accumulator chunk by chunk as bytes reach the
//! data file; the reader side recomputes it over the whole file. Both use
//! the same ECMA-182 table, which is the only requirement for verification.

use std::io::{self, Read, Write};

use crc::{Crc, CRC_64_ECMA_182};

/// CRC-64 calculator (ECMA-182 polynomial)
static CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

/// Read chunk size used when recomputing a checksum from a stream
const READ_CHUNK: usize = 64 * 1024;

/// Running CRC-64 accumulator
pub struct Checksum {
    digest: crc::Digest<'static, u64>,
}

impl Checksum {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Checksum {
            digest: CRC64.digest(),
        }
    }

    /// Feed more bytes
    pub fn update(&mut self, bytes: &[u8]) {
        self.digest.update(bytes);
    }

    /// Checksum of everything fed so far; consumes the accumulator
    pub fn finalize(self) -> u64 {
        self.digest.finalize()
    }

    /// One-shot checksum of a byte slice
    pub fn of(bytes: &[u8]) -> u64 {
        CRC64.checksum(bytes)
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checksum").finish_non_exhaustive()
    }
}

/// Write-through adapter that hashes every byte the inner writer accepts
///
/// Only `&buf[..n]` is hashed after a successful write, so a short write
/// followed by a retry of the remainder never hashes a byte twice.
pub struct ChecksumWriter<W: Write> {
    inner: W,
    checksum: Checksum,
}

impl<W: Write> ChecksumWriter<W> {
    /// Wrap `inner`
    pub fn new(inner: W) -> Self {
        ChecksumWriter {
            inner,
            checksum: Checksum::new(),
        }
    }

    /// Borrow the inner writer
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwrap into the inner writer and the final checksum
    pub fn into_parts(self) -> (W, u64) {
        (self.inner, self.checksum.finalize())
    }
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.checksum.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Recompute the checksum of everything `reader` yields until EOF
pub fn checksum_reader<R: Read>(mut reader: R) -> io::Result<u64> {
    let mut checksum = Checksum::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => checksum.update(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(checksum.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Writer that accepts at most `limit` bytes per call
    struct ShortWriter {
        data: Vec<u8>,
        limit: usize,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_check_value() {
        // CRC-64/ECMA-182 check value for "123456789"
        assert_eq!(Checksum::of(b"123456789"), 0x6c40df5f0b497347);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(Checksum::new().finalize(), Checksum::of(&[]));
        assert_eq!(Checksum::of(&[]), 0);
    }

    #[test]
    fn test_chunked_updates() {
        let mut checksum = Checksum::new();
        checksum.update(b"1234");
        checksum.update(b"");
        checksum.update(b"56789");
        assert_eq!(checksum.finalize(), Checksum::of(b"123456789"));
    }

    #[test]
    fn test_single_bit_flip_changes_checksum() {
        let data = vec![0xABu8; 1000];
        let mut corrupted = data.clone();
        corrupted[500] ^= 0x01;
        assert_ne!(Checksum::of(&data), Checksum::of(&corrupted));
    }

    #[test]
    fn test_writer_hashes_only_accepted_bytes() {
        let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let mut writer = ChecksumWriter::new(ShortWriter {
            data: Vec::new(),
            limit: 7,
        });

        writer.write_all(&data).unwrap();

        let (inner, checksum) = writer.into_parts();
        assert_eq!(inner.data, data);
        assert_eq!(checksum, Checksum::of(&data));
    }

    #[test]
    fn test_checksum_reader_matches_one_shot() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let computed = checksum_reader(&data[..]).unwrap();
        assert_eq!(computed, Checksum::of(&data));
    }

    proptest! {
        #[test]
        fn prop_incremental_matches_one_shot(
            data in proptest::collection::vec(any::<u8>(), 0..4096),
            split in 0usize..4096,
        ) {
            let split = split.min(data.len());
            let mut checksum = Checksum::new();
            checksum.update(&data[..split]);
            checksum.update(&data[split..]);
            prop_assert_eq!(checksum.finalize(), Checksum::of(&data));
        }
    }
}
