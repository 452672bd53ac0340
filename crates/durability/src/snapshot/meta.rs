//! Snapshot descriptors and the on-disk metadata record
//!
//! Each snapshot directory holds a `meta.json` with the descriptor plus the
//! payload checksum. The checksum is `null` until the sink is closed, which
//! is what distinguishes a provisional record from a committed one.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::error::SnapshotResult;
use super::META_FILE;

/// Externally visible description of a snapshot
///
/// Ordering is by `(term, index)`, with `id` only breaking exact ties.
/// `peers` and `size` never take part in ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Unique ID, `<term>-<index>-<RFC3339 timestamp>`
    pub id: String,
    /// Index of the last log entry covered
    pub index: u64,
    /// Term of the last log entry covered
    pub term: u64,
    /// Serialized peer set, stored verbatim
    pub peers: Vec<u8>,
    /// Payload length in bytes; 0 until the sink is closed
    pub size: u64,
}

impl SnapshotMeta {
    /// Describe a new, still empty snapshot
    pub fn new(index: u64, term: u64, peers: Vec<u8>) -> Self {
        SnapshotMeta {
            id: snapshot_id(term, index, Utc::now()),
            index,
            term,
            peers,
            size: 0,
        }
    }
}

impl Ord for SnapshotMeta {
    fn cmp(&self, other: &Self) -> Ordering {
        self.term
            .cmp(&other.term)
            .then(self.index.cmp(&other.index))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for SnapshotMeta {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The `meta.json` record: descriptor plus payload checksum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSnapshotMeta {
    /// Descriptor fields
    #[serde(flatten)]
    pub meta: SnapshotMeta,
    /// CRC-64 of `state.bin`; `None` until committed
    pub checksum: Option<u64>,
}

impl PersistedSnapshotMeta {
    /// Provisional record with no checksum
    pub fn provisional(meta: SnapshotMeta) -> Self {
        PersistedSnapshotMeta {
            meta,
            checksum: None,
        }
    }

    /// Whether the record carries a checksum
    pub fn is_committed(&self) -> bool {
        self.checksum.is_some()
    }

    /// Read `meta.json` from a snapshot directory
    pub fn read_from(dir: &Path) -> SnapshotResult<Self> {
        let file = File::open(dir.join(META_FILE))?;
        let meta = serde_json::from_reader(BufReader::new(file))?;
        Ok(meta)
    }

    /// Write `meta.json` into a snapshot directory, replacing any previous
    /// record
    pub fn write_to(&self, dir: &Path, sync: bool) -> SnapshotResult<()> {
        let file = File::create(dir.join(META_FILE))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.write_all(b"\n")?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        if sync {
            file.sync_all()?;
        }
        Ok(())
    }
}

/// Build a snapshot ID from its term, index and creation time
pub fn snapshot_id(term: u64, index: u64, when: DateTime<Utc>) -> String {
    format!(
        "{}-{}-{}",
        term,
        index,
        when.to_rfc3339_opts(SecondsFormat::Nanos, true)
    )
}

/// Split a snapshot ID into term, index and creation time
///
/// Returns `None` if the ID is malformed.
pub fn parse_snapshot_id(id: &str) -> Option<(u64, u64, DateTime<Utc>)> {
    let mut parts = id.splitn(3, '-');
    let term = parts.next()?.parse().ok()?;
    let index = parts.next()?.parse().ok()?;
    let when = DateTime::parse_from_rfc3339(parts.next()?).ok()?;
    Some((term, index, when.with_timezone(&Utc)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta(term: u64, index: u64, id: &str) -> SnapshotMeta {
        SnapshotMeta {
            id: id.to_string(),
            index,
            term,
            peers: Vec::new(),
            size: 0,
        }
    }

    #[test]
    fn test_snapshot_id_format() {
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap();
        let id = snapshot_id(3, 120, when);
        assert_eq!(id, "3-120-2024-03-01T12:30:45.000000000Z");
    }

    #[test]
    fn test_parse_snapshot_id() {
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap();
        let id = snapshot_id(7, 99, when);
        let (term, index, parsed) = parse_snapshot_id(&id).unwrap();
        assert_eq!(term, 7);
        assert_eq!(index, 99);
        assert_eq!(parsed, when);
    }

    #[test]
    fn test_parse_snapshot_id_invalid() {
        assert!(parse_snapshot_id("").is_none());
        assert!(parse_snapshot_id("abc-1-2024-03-01T12:30:45Z").is_none());
        assert!(parse_snapshot_id("1-2").is_none());
        assert!(parse_snapshot_id("1-2-not-a-time").is_none());
    }

    #[test]
    fn test_ordering_uses_term_before_index() {
        // String order would put "10-..." before "9-..."
        let a = meta(9, 500, "9-500-x");
        let b = meta(10, 1, "10-1-x");
        assert!(a < b);

        let c = meta(2, 5, "2-5-x");
        let d = meta(2, 10, "2-10-x");
        assert!(c < d);
    }

    #[test]
    fn test_ordering_ignores_size_and_peers() {
        let mut a = meta(1, 1, "1-1-a");
        let b = meta(1, 1, "1-1-a");
        a.size = 100;
        a.peers = vec![1, 2, 3];
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn test_ordering_tie_break_on_id() {
        let a = meta(1, 1, "1-1-2024-01-01T00:00:00.000000001Z");
        let b = meta(1, 1, "1-1-2024-01-01T00:00:00.000000002Z");
        assert!(a < b);
    }

    #[test]
    fn test_persisted_record_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut record = PersistedSnapshotMeta::provisional(SnapshotMeta::new(5, 1, vec![9, 9]));
        assert!(!record.is_committed());

        record.write_to(dir.path(), false).unwrap();
        let read = PersistedSnapshotMeta::read_from(dir.path()).unwrap();
        assert_eq!(read, record);
        assert!(read.checksum.is_none());

        record.meta.size = 42;
        record.checksum = Some(u64::MAX);
        record.write_to(dir.path(), true).unwrap();
        let read = PersistedSnapshotMeta::read_from(dir.path()).unwrap();
        assert!(read.is_committed());
        assert_eq!(read.checksum, Some(u64::MAX));
        assert_eq!(read.meta.size, 42);
    }

    #[test]
    fn test_json_field_names() {
        let record = PersistedSnapshotMeta {
            meta: meta(2, 3, "2-3-x"),
            checksum: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "2-3-x");
        assert_eq!(json["term"], 2);
        assert_eq!(json["index"], 3);
        assert!(json["checksum"].is_null());
    }
}
