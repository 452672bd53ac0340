//! Replicated log record types
//!
//! A [`LogEntry`] is one durable record of the replicated log. Its
//! [`LogType`] governs how the entry affects the state machine; this crate
//! only stores and retrieves entries and never interprets `data`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LogStoreError;

/// Kind of a replicated log entry
///
/// Discriminants are stable and used by durable encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LogType {
    /// Applied to the user state machine
    Command = 0,
    /// Used by a new leader to assert leadership
    Noop = 1,
    /// Adds a peer to the cluster
    AddPeer = 2,
    /// Removes a peer from the cluster
    RemovePeer = 3,
    /// Like `Noop`, but only reported complete once the state machine has
    /// applied it, not merely once it is committed.
    Barrier = 4,
}

impl LogType {
    /// All log types in discriminant order
    pub const ALL: [LogType; 5] = [
        LogType::Command,
        LogType::Noop,
        LogType::AddPeer,
        LogType::RemovePeer,
        LogType::Barrier,
    ];

    /// Stable one-byte discriminant
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Short name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            LogType::Command => "LogCmd",
            LogType::Noop => "LogNoop",
            LogType::AddPeer => "LogAddPeer",
            LogType::RemovePeer => "LogRemovePeer",
            LogType::Barrier => "LogBarrier",
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for LogType {
    type Error = LogStoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        LogType::ALL
            .get(value as usize)
            .copied()
            .ok_or(LogStoreError::UnknownLogType(value))
    }
}

/// One durable record in the replicated log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Position in the log (1-based; 0 means "no entry")
    pub index: u64,
    /// Term in which the entry was created
    pub term: u64,
    /// How the entry affects the state machine
    pub log_type: LogType,
    /// Opaque payload
    pub data: Vec<u8>,
}

impl LogEntry {
    /// Create a new log entry
    pub fn new(index: u64, term: u64, log_type: LogType, data: impl Into<Vec<u8>>) -> Self {
        LogEntry {
            index,
            term,
            log_type,
            data: data.into(),
        }
    }

    /// Convenience constructor for a `Command` entry
    pub fn command(index: u64, term: u64, data: impl Into<Vec<u8>>) -> Self {
        Self::new(index, term, LogType::Command, data)
    }

    /// Convenience constructor for an empty `Noop` entry
    pub fn noop(index: u64, term: u64) -> Self {
        Self::new(index, term, LogType::Noop, Vec::new())
    }
}
