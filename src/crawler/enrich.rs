//! Metadata enrichment and stats collection
//!
//! `get-pods-with-stats` gives the gossip-layer view of every pod (version,
//! identity, storage, visibility); `get-stats` gives live metrics from the
//! node itself. `merge_stats` holds the precedence between the two.

use futures::future::join_all;
use std::collections::HashMap;
use tracing::debug;

use crate::rpc::protocol::{PodEntry, StatsResult};
use crate::rpc::{PeerTransport, RpcOutcome};
use crate::types::{parse_peer_ip, parse_peer_port, NodeStats};

/// Gossip-layer metadata for one pod IP
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PodMetadata {
    pub version: Option<String>,
    pub pubkey: Option<String>,
    pub is_public: Option<bool>,
    pub rpc_port: Option<u16>,
    pub gossip_port: Option<u16>,
    pub storage_committed: u64,
    pub storage_used: u64,
    pub uptime: u64,
    /// Unix seconds, 0 when never reported
    pub last_seen_timestamp: u64,
}

impl PodMetadata {
    fn from_pod(pod: &PodEntry) -> Self {
        Self {
            version: pod.version.clone(),
            pubkey: pod.pubkey.clone(),
            is_public: pod.is_public,
            rpc_port: pod.rpc_port,
            gossip_port: parse_peer_port(&pod.address),
            storage_committed: pod.storage_committed,
            storage_used: pod.storage_used,
            uptime: pod.uptime,
            last_seen_timestamp: pod.last_seen_timestamp,
        }
    }
}

/// Ask every IP for its pod listing and keep the freshest entry per pod IP
pub async fn collect_pod_metadata(
    transport: &dyn PeerTransport,
    ips: &[String],
    ports: &[u16],
    batch_size: usize,
) -> HashMap<String, PodMetadata> {
    let mut merged: HashMap<String, PodMetadata> = HashMap::new();

    for batch in ips.chunks(batch_size.max(1)) {
        let listings = join_all(batch.iter().map(|ip| transport.get_pods_with_stats(ip, ports))).await;

        for listing in listings.into_iter().filter_map(RpcOutcome::ok) {
            for pod in &listing.pods {
                let Some(ip) = parse_peer_ip(&pod.address) else {
                    continue;
                };
                let candidate = PodMetadata::from_pod(pod);
                match merged.get(&ip) {
                    Some(existing) if existing.last_seen_timestamp >= candidate.last_seen_timestamp => {}
                    _ => {
                        merged.insert(ip, candidate);
                    }
                }
            }
        }
    }

    debug!("Pod metadata collected for {} IPs", merged.len());
    merged
}

/// Candidate ports for `get-stats`: advertised port first, then defaults
pub fn stats_ports(advertised: Option<u16>, defaults: &[u16]) -> Vec<u16> {
    let mut ports = Vec::with_capacity(defaults.len() + 1);
    if let Some(port) = advertised.filter(|p| *p != 0) {
        ports.push(port);
    }
    for port in defaults {
        if !ports.contains(port) {
            ports.push(*port);
        }
    }
    ports
}

/// Call `get-stats` on every target
///
/// The returned outcomes line up positionally with `targets`.
pub async fn collect_stats(
    transport: &dyn PeerTransport,
    targets: &[(String, Vec<u16>)],
    batch_size: usize,
) -> Vec<RpcOutcome<StatsResult>> {
    let mut outcomes = Vec::with_capacity(targets.len());

    for batch in targets.chunks(batch_size.max(1)) {
        let results = join_all(batch.iter().map(|(ip, ports)| transport.get_stats(ip, ports))).await;
        outcomes.extend(results);
    }

    outcomes
}

/// Merge both provenance layers into one stats block
///
/// | field                             | source                       |
/// |-----------------------------------|------------------------------|
/// | uptime                            | gossip, RPC when gossip is 0 |
/// | storage_committed, storage_used   | gossip (absent from get-stats) |
/// | everything else                   | RPC only                     |
pub fn merge_stats(gossip: Option<&PodMetadata>, rpc: Option<&StatsResult>) -> NodeStats {
    let (g_uptime, g_committed, g_used) = gossip
        .map(|g| (g.uptime, g.storage_committed, g.storage_used))
        .unwrap_or_default();

    let mut stats = NodeStats::default();

    if let Some(rpc) = rpc {
        stats.cpu_percent = rpc.cpu_percent;
        stats.ram_used = rpc.ram_used;
        stats.ram_total = rpc.ram_total;
        stats.packets_sent = rpc.packets_sent;
        stats.packets_received = rpc.packets_received;
        stats.active_streams = rpc.active_streams;
        stats.current_index = rpc.current_index;
        stats.total_pages = rpc.total_pages;
        stats.total_bytes = rpc.total_bytes;
        stats.file_size = rpc.file_size;
        stats.uptime = rpc.uptime;
    }

    if g_uptime > 0 {
        stats.uptime = g_uptime;
    }
    stats.storage_committed = g_committed;
    stats.storage_used = g_used;

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::tests::{pod, FakeNetwork};

    fn rpc_stats() -> StatsResult {
        StatsResult {
            cpu_percent: 12.0,
            ram_used: 4,
            ram_total: 16,
            uptime: 500,
            packets_sent: 10,
            packets_received: 20,
            active_streams: 3,
            current_index: 7,
            total_pages: 9,
            total_bytes: 1_000,
            file_size: 2_000,
        }
    }

    #[test]
    fn test_merge_prefers_gossip_for_shared_fields() {
        let gossip = PodMetadata {
            uptime: 9_000,
            storage_committed: 5_000,
            storage_used: 1_000,
            ..Default::default()
        };
        let merged = merge_stats(Some(&gossip), Some(&rpc_stats()));

        assert_eq!(merged.uptime, 9_000);
        assert_eq!(merged.storage_committed, 5_000);
        assert_eq!(merged.storage_used, 1_000);
        assert_eq!(merged.cpu_percent, 12.0);
        assert_eq!(merged.ram_total, 16);
        assert_eq!(merged.file_size, 2_000);
    }

    #[test]
    fn test_merge_zero_gossip_uptime_falls_back_to_rpc() {
        let gossip = PodMetadata {
            storage_committed: 5_000,
            ..Default::default()
        };
        let merged = merge_stats(Some(&gossip), Some(&rpc_stats()));
        assert_eq!(merged.uptime, 500);
        assert_eq!(merged.storage_committed, 5_000);
    }

    #[test]
    fn test_merge_single_layers() {
        let rpc_only = merge_stats(None, Some(&rpc_stats()));
        assert_eq!(rpc_only.uptime, 500);
        assert_eq!(rpc_only.storage_committed, 0);
        assert_eq!(rpc_only.packets_received, 20);

        let gossip = PodMetadata {
            uptime: 60,
            storage_committed: 10,
            ..Default::default()
        };
        let gossip_only = merge_stats(Some(&gossip), None);
        assert_eq!(gossip_only.uptime, 60);
        assert_eq!(gossip_only.cpu_percent, 0.0);
        assert_eq!(gossip_only.ram_total, 0);

        assert_eq!(merge_stats(None, None), NodeStats::default());
    }

    #[test]
    fn test_stats_ports_order() {
        assert_eq!(stats_ports(Some(7000), &[6000, 9000]), vec![7000, 6000, 9000]);
        assert_eq!(stats_ports(Some(6000), &[6000, 9000]), vec![6000, 9000]);
        assert_eq!(stats_ports(None, &[6000]), vec![6000]);
        assert_eq!(stats_ports(Some(0), &[6000]), vec![6000]);
    }

    #[tokio::test]
    async fn test_pod_metadata_keeps_freshest() {
        let mut stale = pod("10.3.0.9:9001", Some("pk"));
        stale.version = Some("old".to_string());
        stale.last_seen_timestamp = 100;
        let mut fresh = pod("10.3.0.9:9001", Some("pk"));
        fresh.version = Some("new".to_string());
        fresh.last_seen_timestamp = 200;

        let net = FakeNetwork::new()
            .peer("10.3.0.1", |p| p.pods_with_stats(vec![fresh]))
            .peer("10.3.0.2", |p| p.pods_with_stats(vec![stale]));

        let ips = vec!["10.3.0.1".to_string(), "10.3.0.2".to_string(), "10.3.0.3".to_string()];
        let merged = collect_pod_metadata(&net, &ips, &[6000], 100).await;

        assert_eq!(merged.len(), 1);
        assert_eq!(merged["10.3.0.9"].version.as_deref(), Some("new"));
        assert_eq!(merged["10.3.0.9"].gossip_port, Some(9001));
    }

    #[tokio::test]
    async fn test_stats_outcomes_are_positional() {
        let net = FakeNetwork::new()
            .peer("10.3.0.1", |p| p.stats(rpc_stats()))
            .peer("10.3.0.3", |p| p.stats(StatsResult { uptime: 42, ..Default::default() }).rpc_port(7000));

        let targets = vec![
            ("10.3.0.1".to_string(), vec![6000]),
            ("10.3.0.2".to_string(), vec![6000]),
            ("10.3.0.3".to_string(), vec![7000, 6000]),
        ];
        let outcomes = collect_stats(&net, &targets, 2).await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].clone().into_parts().map(|(s, p)| (s.uptime, p)), Some((500, 6000)));
        assert!(matches!(outcomes[1], RpcOutcome::Unreachable));
        assert_eq!(outcomes[2].clone().into_parts().map(|(s, p)| (s.uptime, p)), Some((42, 7000)));
    }
}
