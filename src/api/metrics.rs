//! Metrics Collection
//!
//! Collects and exposes metrics for monitoring the crawler.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

/// Metrics collector for the crawler
#[derive(Default)]
pub struct Metrics {
    /// Start time for uptime calculation
    start_time: Option<Instant>,

    /// Completed crawl cycles
    pub cycles_total: AtomicU64,

    /// Triggers rejected because a cycle was running
    pub cycles_rejected: AtomicU64,

    /// Whether a cycle is in progress
    pub cycle_running: AtomicBool,

    /// Duration of the last cycle in milliseconds
    pub last_cycle_duration_ms: AtomicU64,

    /// Unix timestamp of the last completed cycle
    pub last_cycle_timestamp: AtomicU64,

    /// Distinct IPs discovered in the last cycle
    pub nodes_discovered: AtomicU64,

    /// Nodes that answered get-stats in the last cycle
    pub nodes_crawled: AtomicU64,

    /// Online nodes after the last cycle
    pub nodes_online: AtomicU64,

    /// Stale nodes after the last cycle
    pub nodes_stale: AtomicU64,

    /// Failed get-stats calls
    pub rpc_failures: AtomicU64,

    /// Geolocation lookups sent to providers
    pub geo_lookups: AtomicU64,

    /// Geolocation answered from stored records
    pub geo_cache_hits: AtomicU64,

    /// Official registry sizes
    pub registry_mainnet: AtomicU64,
    pub registry_devnet: AtomicU64,

    /// Failed table writes
    pub persistence_failures: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn inc_cycles_rejected(&self) {
        self.cycles_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_cycle_running(&self, running: bool) {
        self.cycle_running.store(running, Ordering::Relaxed);
    }

    pub fn is_cycle_running(&self) -> bool {
        self.cycle_running.load(Ordering::Relaxed)
    }

    pub fn add_rpc_failures(&self, count: u64) {
        self.rpc_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_geo_lookups(&self, count: u64) {
        self.geo_lookups.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_geo_cache_hits(&self, count: u64) {
        self.geo_cache_hits.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_persistence_failures(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Update registry sizes
    pub fn set_registry_sizes(&self, mainnet: usize, devnet: usize) {
        self.registry_mainnet.store(mainnet as u64, Ordering::Relaxed);
        self.registry_devnet.store(devnet as u64, Ordering::Relaxed);
    }

    /// Record the outcome of a finished cycle
    pub fn record_cycle(
        &self,
        duration_ms: u64,
        finished_at: u64,
        discovered: usize,
        crawled: usize,
        online: usize,
        stale: usize,
    ) {
        self.cycles_total.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_duration_ms.store(duration_ms, Ordering::Relaxed);
        self.last_cycle_timestamp.store(finished_at, Ordering::Relaxed);
        self.nodes_discovered.store(discovered as u64, Ordering::Relaxed);
        self.nodes_crawled.store(crawled as u64, Ordering::Relaxed);
        self.nodes_online.store(online as u64, Ordering::Relaxed);
        self.nodes_stale.store(stale as u64, Ordering::Relaxed);
    }

    /// Export metrics in Prometheus format
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        let mut metric = |name: &str, kind: &str, help: &str, value: u64| {
            output.push_str(&format!(
                "# HELP pnode_crawler_{name} {help}\n\
                 # TYPE pnode_crawler_{name} {kind}\n\
                 pnode_crawler_{name} {value}\n\n"
            ));
        };

        metric("uptime_seconds", "gauge", "Crawler uptime in seconds", self.uptime_secs());

        // Cycles
        metric("cycles_total", "counter", "Completed crawl cycles", self.cycles_total.load(Ordering::Relaxed));
        metric(
            "cycles_rejected_total",
            "counter",
            "Crawl triggers rejected while a cycle was running",
            self.cycles_rejected.load(Ordering::Relaxed),
        );
        metric(
            "cycle_running",
            "gauge",
            "Whether a crawl cycle is in progress",
            u64::from(self.cycle_running.load(Ordering::Relaxed)),
        );
        metric(
            "last_cycle_duration_ms",
            "gauge",
            "Duration of the last crawl cycle",
            self.last_cycle_duration_ms.load(Ordering::Relaxed),
        );

        // Network
        metric("nodes_discovered", "gauge", "Distinct IPs discovered", self.nodes_discovered.load(Ordering::Relaxed));
        metric("nodes_crawled", "gauge", "Nodes answering get-stats", self.nodes_crawled.load(Ordering::Relaxed));
        metric("nodes_online", "gauge", "Online nodes", self.nodes_online.load(Ordering::Relaxed));
        metric("nodes_stale", "gauge", "Stale nodes", self.nodes_stale.load(Ordering::Relaxed));

        // Upstreams
        metric("rpc_failures_total", "counter", "Failed get-stats calls", self.rpc_failures.load(Ordering::Relaxed));
        metric("geo_lookups_total", "counter", "Geolocation provider lookups", self.geo_lookups.load(Ordering::Relaxed));
        metric(
            "geo_cache_hits_total",
            "counter",
            "Geolocation served from stored records",
            self.geo_cache_hits.load(Ordering::Relaxed),
        );
        metric("registry_mainnet_pods", "gauge", "MAINNET registry size", self.registry_mainnet.load(Ordering::Relaxed));
        metric("registry_devnet_pods", "gauge", "DEVNET registry size", self.registry_devnet.load(Ordering::Relaxed));

        // Storage
        metric(
            "persistence_failures_total",
            "counter",
            "Failed table writes",
            self.persistence_failures.load(Ordering::Relaxed),
        );

        output
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "uptime_secs": self.uptime_secs(),
            "cycles": {
                "total": self.cycles_total.load(Ordering::Relaxed),
                "rejected": self.cycles_rejected.load(Ordering::Relaxed),
                "running": self.cycle_running.load(Ordering::Relaxed),
                "last_duration_ms": self.last_cycle_duration_ms.load(Ordering::Relaxed),
                "last_timestamp": self.last_cycle_timestamp.load(Ordering::Relaxed),
            },
            "nodes": {
                "discovered": self.nodes_discovered.load(Ordering::Relaxed),
                "crawled": self.nodes_crawled.load(Ordering::Relaxed),
                "online": self.nodes_online.load(Ordering::Relaxed),
                "stale": self.nodes_stale.load(Ordering::Relaxed),
            },
            "rpc_failures": self.rpc_failures.load(Ordering::Relaxed),
            "geo": {
                "lookups": self.geo_lookups.load(Ordering::Relaxed),
                "cache_hits": self.geo_cache_hits.load(Ordering::Relaxed),
            },
            "registry": {
                "mainnet": self.registry_mainnet.load(Ordering::Relaxed),
                "devnet": self.registry_devnet.load(Ordering::Relaxed),
            },
            "persistence_failures": self.persistence_failures.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_increment() {
        let metrics = Metrics::new();

        metrics.add_rpc_failures(3);
        metrics.add_rpc_failures(2);
        metrics.inc_persistence_failures();

        assert_eq!(metrics.rpc_failures.load(Ordering::Relaxed), 5);
        assert_eq!(metrics.persistence_failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_record_cycle() {
        let metrics = Metrics::new();
        metrics.record_cycle(1500, 1_700_000_000, 12, 10, 9, 1);
        metrics.record_cycle(900, 1_700_000_300, 13, 11, 10, 1);

        assert_eq!(metrics.cycles_total.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.last_cycle_duration_ms.load(Ordering::Relaxed), 900);
        assert_eq!(metrics.nodes_discovered.load(Ordering::Relaxed), 13);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = Metrics::new();
        metrics.set_registry_sizes(100, 40);
        metrics.set_cycle_running(true);

        let output = metrics.to_prometheus();

        assert!(output.contains("pnode_crawler_registry_mainnet_pods 100"));
        assert!(output.contains("pnode_crawler_registry_devnet_pods 40"));
        assert!(output.contains("pnode_crawler_cycle_running 1"));
        assert!(output.contains("# TYPE pnode_crawler_cycles_total counter"));
    }

    #[test]
    fn test_json_format() {
        let metrics = Metrics::new();
        metrics.add_geo_cache_hits(7);

        let json = metrics.to_json();

        assert_eq!(json["geo"]["cache_hits"], 7);
        assert_eq!(json["cycles"]["running"], false);
    }
}
