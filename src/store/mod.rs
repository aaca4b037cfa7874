//! Node Store Module
//!
//! Persistence interface consumed by the crawler: upsert-by-IP node table,
//! insert-only history table and the network metadata singleton. Tables are
//! written independently, a failure in one never rolls back another.

mod rocks;

pub use rocks::RocksNodeStore;

use thiserror::Error;

use crate::types::{HistorySample, NetworkMetadata, NodeRecord, NodeStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("rocksdb error: {0}")]
    Db(#[from] rocksdb::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}

/// Storage collaborator of the crawler
pub trait NodeStore: Send + Sync {
    fn get_node(&self, ip: &str) -> Result<Option<NodeRecord>, StoreError>;

    fn list_nodes(&self) -> Result<Vec<NodeRecord>, StoreError>;

    /// Insert or replace records by IP; returns the number written
    fn upsert_nodes(&self, records: &[NodeRecord]) -> Result<usize, StoreError>;

    fn delete_node(&self, ip: &str) -> Result<(), StoreError>;

    /// Bump the failure counter of an existing record, leaving the rest intact
    ///
    /// Returns the new count, or `None` when no record exists.
    fn increment_failed_checks(&self, ip: &str) -> Result<Option<u32>, StoreError>;

    /// Change only the lifecycle status of an existing record
    fn set_status(&self, ip: &str, status: NodeStatus) -> Result<(), StoreError>;

    /// Append samples; returns the number written
    fn insert_history(&self, samples: &[HistorySample]) -> Result<usize, StoreError>;

    /// Most recent `limit` samples of `ip`, oldest first
    fn history_for(&self, ip: &str, limit: usize) -> Result<Vec<HistorySample>, StoreError>;

    fn upsert_metadata(&self, metadata: &NetworkMetadata) -> Result<(), StoreError>;

    fn get_metadata(&self) -> Result<Option<NetworkMetadata>, StoreError>;

    /// Flush pending writes to disk
    fn flush(&self) -> Result<(), StoreError>;
}
