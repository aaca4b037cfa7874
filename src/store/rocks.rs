//! Node Store (RocksDB)
//!
//! Persistent storage for node records, history samples and network metadata.
//! Survives restarts so the geolocation cache and failure counters carry over.

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use tracing::{debug, info, warn};

use super::{NodeStore, StoreError};
use crate::types::{HistorySample, NetworkMetadata, NodeRecord, NodeStatus};

/// Key prefixes for different data types
const PREFIX_NODE: &[u8] = b"node:";
const PREFIX_HISTORY: &[u8] = b"history:";

/// Singleton metadata key
const META_NETWORK: &[u8] = b"meta:network";

/// Node store backed by RocksDB
pub struct RocksNodeStore {
    db: DB,
}

impl RocksNodeStore {
    /// Open or create a store at the given path
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_max_open_files(100);
        opts.set_keep_log_file_num(3);

        let db = DB::open(&opts, path)?;
        let store = Self { db };

        let nodes = store.scan_prefix::<NodeRecord>(PREFIX_NODE)?.len();
        info!("📦 Opened node store with {} known nodes", nodes);

        Ok(store)
    }

    /// Decode every value under `prefix`, skipping undecodable entries
    fn scan_prefix<T: serde::de::DeserializeOwned>(&self, prefix: &[u8]) -> Result<Vec<T>, StoreError> {
        let mut out = Vec::new();
        let iter = self.db.iterator(IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            match bincode::deserialize::<T>(&value) {
                Ok(v) => out.push(v),
                Err(e) => warn!("Skipping undecodable entry {:?}: {}", String::from_utf8_lossy(&key), e),
            }
        }

        Ok(out)
    }

    fn put_node(&self, record: &NodeRecord) -> Result<(), StoreError> {
        let value = bincode::serialize(record)?;
        self.db.put(node_key(&record.ip), value)?;
        Ok(())
    }
}

impl NodeStore for RocksNodeStore {
    fn get_node(&self, ip: &str) -> Result<Option<NodeRecord>, StoreError> {
        match self.db.get(node_key(ip))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn list_nodes(&self) -> Result<Vec<NodeRecord>, StoreError> {
        self.scan_prefix(PREFIX_NODE)
    }

    fn upsert_nodes(&self, records: &[NodeRecord]) -> Result<usize, StoreError> {
        let mut batch = WriteBatch::default();
        for record in records {
            batch.put(node_key(&record.ip), bincode::serialize(record)?);
        }
        self.db.write(batch)?;
        Ok(records.len())
    }

    fn delete_node(&self, ip: &str) -> Result<(), StoreError> {
        self.db.delete(node_key(ip))?;
        debug!("Deleted node {}", ip);
        Ok(())
    }

    fn increment_failed_checks(&self, ip: &str) -> Result<Option<u32>, StoreError> {
        let mut record = match self.get_node(ip)? {
            Some(r) => r,
            None => return Ok(None),
        };
        record.failed_checks = record.failed_checks.saturating_add(1);
        self.put_node(&record)?;
        Ok(Some(record.failed_checks))
    }

    fn set_status(&self, ip: &str, status: NodeStatus) -> Result<(), StoreError> {
        if let Some(mut record) = self.get_node(ip)? {
            if record.status != status {
                record.status = status;
                self.put_node(&record)?;
            }
        }
        Ok(())
    }

    fn insert_history(&self, samples: &[HistorySample]) -> Result<usize, StoreError> {
        let mut batch = WriteBatch::default();
        for sample in samples {
            let key = history_key(&sample.ip, sample.timestamp.timestamp_micros());
            batch.put(key, bincode::serialize(sample)?);
        }
        self.db.write(batch)?;
        Ok(samples.len())
    }

    fn history_for(&self, ip: &str, limit: usize) -> Result<Vec<HistorySample>, StoreError> {
        let prefix = history_prefix(ip);
        let samples: Vec<HistorySample> = self.scan_prefix(&prefix)?;
        let skip = samples.len().saturating_sub(limit);
        Ok(samples.into_iter().skip(skip).collect())
    }

    fn upsert_metadata(&self, metadata: &NetworkMetadata) -> Result<(), StoreError> {
        self.db.put(META_NETWORK, bincode::serialize(metadata)?)?;
        Ok(())
    }

    fn get_metadata(&self) -> Result<Option<NetworkMetadata>, StoreError> {
        match self.db.get(META_NETWORK)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

/// Create storage key for a node
fn node_key(ip: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(PREFIX_NODE.len() + ip.len());
    key.extend_from_slice(PREFIX_NODE);
    key.extend_from_slice(ip.as_bytes());
    key
}

/// `history:{ip}|` - the separator cannot appear in an IPv6 literal
fn history_prefix(ip: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(PREFIX_HISTORY.len() + ip.len() + 1);
    key.extend_from_slice(PREFIX_HISTORY);
    key.extend_from_slice(ip.as_bytes());
    key.push(b'|');
    key
}

/// Zero-padded so keys sort chronologically
fn history_key(ip: &str, timestamp_micros: i64) -> Vec<u8> {
    let mut key = history_prefix(ip);
    key.extend_from_slice(format!("{:020}", timestamp_micros.max(0)).as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn create_test_node(ip: &str, committed: u64) -> NodeRecord {
        let mut record = NodeRecord::new(ip, Utc::now());
        record.stats.storage_committed = committed;
        record
    }

    #[test]
    fn test_store_open() {
        let dir = tempdir().unwrap();
        let store = RocksNodeStore::open(dir.path()).unwrap();
        assert!(store.list_nodes().unwrap().is_empty());
        assert!(store.get_metadata().unwrap().is_none());
    }

    #[test]
    fn test_upsert_is_keyed_by_ip() {
        let dir = tempdir().unwrap();
        let store = RocksNodeStore::open(dir.path()).unwrap();

        store.upsert_nodes(&[create_test_node("1.1.1.1", 10), create_test_node("2.2.2.2", 20)]).unwrap();
        store.upsert_nodes(&[create_test_node("1.1.1.1", 99)]).unwrap();

        let nodes = store.list_nodes().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(store.get_node("1.1.1.1").unwrap().unwrap().stats.storage_committed, 99);
    }

    #[test]
    fn test_increment_and_status() {
        let dir = tempdir().unwrap();
        let store = RocksNodeStore::open(dir.path()).unwrap();

        let mut node = create_test_node("1.1.1.1", 10);
        node.version = Some("1.0.0".to_string());
        store.upsert_nodes(&[node]).unwrap();

        assert_eq!(store.increment_failed_checks("1.1.1.1").unwrap(), Some(1));
        assert_eq!(store.increment_failed_checks("1.1.1.1").unwrap(), Some(2));
        assert_eq!(store.increment_failed_checks("9.9.9.9").unwrap(), None);

        store.set_status("1.1.1.1", NodeStatus::Stale).unwrap();
        let stored = store.get_node("1.1.1.1").unwrap().unwrap();
        assert_eq!(stored.status, NodeStatus::Stale);
        assert_eq!(stored.failed_checks, 2);
        assert_eq!(stored.version.as_deref(), Some("1.0.0"));

        store.delete_node("1.1.1.1").unwrap();
        assert!(store.get_node("1.1.1.1").unwrap().is_none());
    }

    #[test]
    fn test_history_is_append_only_and_ordered() {
        let dir = tempdir().unwrap();
        let store = RocksNodeStore::open(dir.path()).unwrap();

        let node = create_test_node("1.1.1.1", 10);
        let other = create_test_node("1.1.1.10", 10);
        let t0 = Utc::now();

        let samples: Vec<_> = (0..5)
            .map(|i| HistorySample::from_record(&node, t0 + Duration::seconds(i * 60)))
            .collect();
        store.insert_history(&samples).unwrap();
        store.insert_history(&[HistorySample::from_record(&other, t0)]).unwrap();

        let history = store.history_for("1.1.1.1", 3).unwrap();
        assert_eq!(history.len(), 3);
        assert!(history[0].timestamp < history[2].timestamp);
        assert!(history.iter().all(|s| s.ip == "1.1.1.1"));

        assert_eq!(store.history_for("1.1.1.10", 10).unwrap().len(), 1);
    }

    #[test]
    fn test_metadata_singleton() {
        let dir = tempdir().unwrap();
        let store = RocksNodeStore::open(dir.path()).unwrap();

        let mut meta = NetworkMetadata {
            network_total: 10,
            ..Default::default()
        };
        store.upsert_metadata(&meta).unwrap();
        meta.network_total = 12;
        store.upsert_metadata(&meta).unwrap();

        assert_eq!(store.get_metadata().unwrap().unwrap().network_total, 12);
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();

        {
            let store = RocksNodeStore::open(dir.path()).unwrap();
            store.upsert_nodes(&[create_test_node("1.1.1.1", 10)]).unwrap();
            store.flush().unwrap();
        }

        {
            let store = RocksNodeStore::open(dir.path()).unwrap();
            assert_eq!(store.list_nodes().unwrap().len(), 1);
        }
    }
}
