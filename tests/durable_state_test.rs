//! Durable-state boundary tests
//!
//! Drives the log store and the snapshot store together the way a Raft
//! node compacts its log: snapshot the state up to an index, commit it,
//! then drop the covered prefix from the log.

use raftstore::{LogEntry, LogStore, LogType, MemLogStore, SnapshotStore};
use std::io::{Read, Write};
use tempfile::TempDir;

fn apply(entries: &[LogEntry]) -> Vec<u8> {
    entries
        .iter()
        .filter(|e| e.log_type == LogType::Command)
        .flat_map(|e| e.data.iter().copied())
        .collect()
}

#[test]
fn test_snapshot_then_compact_log() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let temp_dir = TempDir::new().unwrap();
    let snapshots = SnapshotStore::new(temp_dir.path(), 2).unwrap();
    let log = MemLogStore::new();

    let mut entries = vec![LogEntry::noop(1, 1)];
    entries.extend((2..=20).map(|i| LogEntry::command(i, 1, vec![i as u8])));
    entries.push(LogEntry::new(21, 2, LogType::Barrier, Vec::new()));
    log.store_logs(&entries).unwrap();
    assert_eq!(log.first_index().unwrap(), 1);
    assert_eq!(log.last_index().unwrap(), 21);

    // Snapshot everything up to index 15
    let covered: Vec<LogEntry> = (1..=15).map(|i| log.get_log(i).unwrap()).collect();
    let state = apply(&covered);
    let last = covered.last().unwrap();
    let mut sink = snapshots.create(last.index, last.term, b"n1,n2,n3".to_vec()).unwrap();
    sink.write_all(&state).unwrap();
    sink.close().unwrap();

    log.delete_range(log.first_index().unwrap(), last.index).unwrap();
    assert_eq!(log.first_index().unwrap(), 16);
    assert!(log.get_log(15).unwrap_err().is_not_found());

    // Restore: newest snapshot, then replay the remaining suffix
    let listed = snapshots.list().unwrap();
    let newest = &listed[0];
    assert_eq!((newest.term, newest.index), (1, 15));
    let (meta, mut reader) = snapshots.open(&newest.id).unwrap();
    assert_eq!(meta.peers, b"n1,n2,n3");

    let mut restored = Vec::new();
    reader.read_to_end(&mut restored).unwrap();
    let tail: Vec<LogEntry> = (16..=log.last_index().unwrap())
        .map(|i| log.get_log(i).unwrap())
        .collect();
    restored.extend(apply(&tail));

    assert_eq!(restored, apply(&entries));
}

#[test]
fn test_truncate_conflicting_suffix() {
    let log = MemLogStore::new();
    log.store_logs(&(1..=10).map(|i| LogEntry::command(i, 1, vec![])).collect::<Vec<_>>())
        .unwrap();

    // A new leader overwrites entries from index 7 with term 2
    log.delete_range(7, log.last_index().unwrap()).unwrap();
    log.store_logs(&[LogEntry::command(7, 2, b"x".to_vec()), LogEntry::noop(8, 2)])
        .unwrap();

    assert_eq!(log.last_index().unwrap(), 8);
    assert_eq!(log.get_log(7).unwrap().term, 2);
    assert!(log.get_log(9).is_err());
}
