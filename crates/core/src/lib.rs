//! Core types and traits for raftstore
//!
//! This crate defines the log side of the durable-state boundary:
//! - LogEntry / LogType: the replicated log record shape
//! - LogStore: the durable-log contract the replication engine consumes
//! - MemLogStore: volatile reference implementation of the contract
//! - LogStoreError: error hierarchy for log operations

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{LogStoreError, LogStoreResult};
pub use memory::MemLogStore;
pub use traits::LogStore;
pub use types::{LogEntry, LogType};
