//! Network State Aggregator
//!
//! Aggregates node records into the network metadata singleton: coverage,
//! lifecycle and sub-network counts, committed storage and credits.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

use crate::types::{Network, NetworkMetadata, NodeRecord, NodeStatus};

/// Network state aggregator
///
/// Keeps the last computed metadata plus a short history of network sizes
/// for trend reporting.
pub struct NetworkStateAggregator {
    /// Last computed network state
    current: NetworkMetadata,

    /// Historical network sizes for trend analysis
    size_history: Vec<(DateTime<Utc>, u64)>,

    /// Maximum history entries to keep
    max_history: usize,
}

impl Default for NetworkStateAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkStateAggregator {
    pub fn new() -> Self {
        Self {
            current: NetworkMetadata::default(),
            size_history: Vec::new(),
            max_history: 1000,
        }
    }

    /// Resume from a persisted singleton
    pub fn with_metadata(metadata: NetworkMetadata) -> Self {
        Self {
            current: metadata,
            ..Self::new()
        }
    }

    /// Recompute the singleton from a cycle's records
    ///
    /// `discovered` counts distinct IPs seen this cycle, `crawled` those that
    /// answered `get-stats`. `records` should include previously known nodes
    /// that were not seen, so stale counts cover them.
    pub fn update(
        &mut self,
        records: &[NodeRecord],
        discovered: usize,
        crawled: usize,
        now: DateTime<Utc>,
    ) -> NetworkMetadata {
        let metadata = summarize(records, discovered, crawled, now);

        self.size_history.push((now, metadata.network_total));
        if self.size_history.len() > self.max_history {
            self.size_history.remove(0);
        }

        debug!(
            "Network state updated: {} discovered, {} crawled, {} active, {} stale",
            metadata.network_total, metadata.nodes_crawled, metadata.active_count, metadata.stale_count
        );

        self.current = metadata.clone();
        metadata
    }

    /// Get current network state
    pub fn current(&self) -> NetworkMetadata {
        self.current.clone()
    }

    /// Get size trend (positive = growing, negative = shrinking)
    pub fn size_trend(&self) -> i64 {
        if self.size_history.len() < 4 {
            return 0;
        }

        let half = self.size_history.len() / 2;
        let (older, recent) = self.size_history.split_at(half);

        let avg = |samples: &[(DateTime<Utc>, u64)]| {
            samples.iter().map(|(_, v)| *v as f64).sum::<f64>() / samples.len() as f64
        };

        (avg(recent) - avg(older)).round() as i64
    }
}

/// Pure aggregation over a set of records
///
/// Credits are summed once per identity since several IPs may share a pubkey.
pub fn summarize(
    records: &[NodeRecord],
    discovered: usize,
    crawled: usize,
    now: DateTime<Utc>,
) -> NetworkMetadata {
    let mut metadata = NetworkMetadata {
        network_total: discovered as u64,
        nodes_crawled: crawled as u64,
        last_updated: now,
        ..Default::default()
    };

    let mut credited = HashSet::new();

    for record in records {
        match record.status {
            NodeStatus::Online => {
                metadata.active_count += 1;
                metadata.total_storage_committed += record.stats.storage_committed;
            }
            NodeStatus::Stale => metadata.stale_count += 1,
            NodeStatus::RegistryOnly => {}
        }

        if record.status == NodeStatus::Stale {
            continue;
        }

        match record.network {
            Network::Mainnet => metadata.mainnet_count += 1,
            Network::Devnet => metadata.devnet_count += 1,
            Network::Unknown => metadata.unknown_count += 1,
        }

        if let Some(pubkey) = record.pubkey.as_deref() {
            if credited.insert(pubkey) {
                metadata.total_credits += record.credits;
            }
        }
    }

    metadata
}
