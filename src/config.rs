//! Crawler Configuration
//!
//! Every tunable of the crawl pipeline lives here, including the empirically
//! tuned thresholds and weights of the classifier and scorers.
//! Default values match the production deployment.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::types::{BOOTSTRAP_SEED_IPS, DEFAULT_RPC_PORT, FALLBACK_RPC_PORT, GOSSIP_HTTP_PORT, MAINNET_GOSSIP_PORT};

/// Main configuration for the crawler service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    // === Timing ===

    /// Interval between scheduled crawl cycles (seconds)
    pub crawl_interval_secs: u64,

    /// Per-call timeout for peer RPC and gossip requests (seconds)
    pub rpc_timeout_secs: u64,

    /// Per-call timeout for geolocation providers (seconds)
    pub geo_timeout_secs: u64,

    /// Per-call timeout for official registry fetches (seconds)
    pub registry_timeout_secs: u64,

    // === Network ===

    /// Bootstrap seeds the discovery starts from
    pub bootstrap_seeds: Vec<String>,

    /// Default RPC port tried first on every peer
    pub rpc_port: u16,

    /// Fallback RPC port, tried only when `enable_fallback_port` is set
    pub fallback_rpc_port: u16,

    /// Try the fallback RPC port after the default one
    pub enable_fallback_port: bool,

    /// Port of the HTTP gossip endpoint
    pub gossip_port: u16,

    /// Port for the HTTP API
    pub api_port: u16,

    // === Limits ===

    /// Concurrent peers queried per discovery round
    pub discovery_batch_size: usize,

    /// Concurrent peers per metadata, stats and probe batch
    pub rpc_batch_size: usize,

    /// Upper bound on distinct IPs tracked by one cycle
    pub max_nodes: usize,

    /// Geolocation quota of the secondary provider (requests per minute)
    pub geo_requests_per_minute: u32,

    /// Maximum new geolocation lookups per cycle
    pub geo_max_lookups_per_cycle: usize,

    // === Official registry ===

    /// Endpoint listing MAINNET pods and their credits
    pub mainnet_registry_url: String,

    /// Endpoint listing DEVNET pods and their credits
    pub devnet_registry_url: String,

    /// How long a fetched registry stays valid (seconds)
    pub registry_cache_secs: u64,

    // === Classification ===

    /// Ask unclassified nodes for their cluster via `get-version`
    pub enable_network_probe: bool,

    pub classifier: ClassifierWeights,

    // === Scoring ===

    pub confidence: ConfidenceBands,

    pub health: HealthThresholds,

    // === Zombie policy ===

    pub zombie: ZombiePolicy,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            // Timing
            crawl_interval_secs: 300,  // 5 minutes
            rpc_timeout_secs: 5,
            geo_timeout_secs: 3,
            registry_timeout_secs: 10,

            // Network
            bootstrap_seeds: BOOTSTRAP_SEED_IPS.iter().map(|s| s.to_string()).collect(),
            rpc_port: DEFAULT_RPC_PORT,
            fallback_rpc_port: FALLBACK_RPC_PORT,
            enable_fallback_port: false,
            gossip_port: GOSSIP_HTTP_PORT,
            api_port: 8080,

            // Limits
            discovery_batch_size: 10,
            rpc_batch_size: 100,
            max_nodes: 5000,
            geo_requests_per_minute: 44,  // secondary provider allows 45
            geo_max_lookups_per_cycle: 200,

            // Official registry
            mainnet_registry_url: "https://podcredits.xandeum.network/api/mainnet-pod-credits".to_string(),
            devnet_registry_url: "https://podcredits.xandeum.network/api/pods-credits".to_string(),
            registry_cache_secs: 3600,

            // Classification
            enable_network_probe: true,
            classifier: ClassifierWeights::default(),

            // Scoring
            confidence: ConfidenceBands::default(),
            health: HealthThresholds::default(),

            zombie: ZombiePolicy::default(),
        }
    }
}

/// Weights and thresholds of the heuristic network classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierWeights {
    /// Gossip port used by production nodes
    pub mainnet_port: u16,
    pub mainnet_port_weight: u32,
    pub clean_version_weight: u32,
    /// Uptime beyond which a node leans MAINNET (seconds)
    pub long_uptime_secs: u64,
    pub long_uptime_weight: u32,
    /// Storage tiers as (minimum committed bytes, weight), largest first
    pub storage_tiers: Vec<(u64, u32)>,

    pub dev_version_weight: u32,
    pub other_port_weight: u32,
    /// Uptime below which a node leans DEVNET (seconds)
    pub short_uptime_secs: u64,
    pub short_uptime_weight: u32,
    /// Committed storage below which a node leans DEVNET (bytes)
    pub small_storage_bytes: u64,
    pub small_storage_weight: u32,

    pub mainnet_threshold: u32,
    pub devnet_threshold: u32,
    /// Winning total at or above which the verdict is high confidence
    pub high_confidence_total: u32,
}

const TB: u64 = 1_000_000_000_000;
const GB: u64 = 1_000_000_000;

impl Default for ClassifierWeights {
    fn default() -> Self {
        Self {
            mainnet_port: MAINNET_GOSSIP_PORT,
            mainnet_port_weight: 45,
            clean_version_weight: 30,
            long_uptime_secs: 7 * 24 * 3600,
            long_uptime_weight: 25,
            storage_tiers: vec![(50 * TB, 50), (10 * TB, 40), (TB, 20)],

            dev_version_weight: 50,
            other_port_weight: 20,
            short_uptime_secs: 24 * 3600,
            short_uptime_weight: 15,
            small_storage_bytes: 100 * GB,
            small_storage_weight: 20,

            mainnet_threshold: 60,
            devnet_threshold: 30,
            high_confidence_total: 90,
        }
    }
}

/// Score bands of the confidence scorer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceBands {
    pub mainnet_registry_points: u8,
    pub mainnet_gossip_points: u8,
    pub mainnet_rpc_points: u8,

    pub devnet_gossip_points: u8,
    pub devnet_rpc_points: u8,
    pub devnet_registry_bonus: u8,

    pub confirmed: u8,
    pub validated: u8,
    pub discovered: u8,
}

impl Default for ConfidenceBands {
    fn default() -> Self {
        Self {
            mainnet_registry_points: 70,
            mainnet_gossip_points: 15,
            mainnet_rpc_points: 15,

            devnet_gossip_points: 50,
            devnet_rpc_points: 30,
            devnet_registry_bonus: 20,

            confirmed: 85,
            validated: 70,
            discovered: 50,
        }
    }
}

/// Thresholds of the health classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    /// Uptime below which a node is critical (seconds)
    pub critical_uptime_secs: u64,
    /// RAM, storage and CPU percentage at which a node is critical
    pub critical_usage_percent: f64,
    pub critical_performance: u8,

    /// Uptime below which a node is in warning (hours)
    pub warning_uptime_hours: f64,
    pub warning_usage_percent: f64,
    pub warning_cpu_percent: f64,
    pub warning_performance: u8,

    pub excellent_max_cpu: f64,
    pub excellent_min_uptime_hours: f64,
    pub excellent_max_usage_percent: f64,
    pub excellent_min_performance: u8,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            critical_uptime_secs: 300,
            critical_usage_percent: 98.0,
            critical_performance: 20,

            warning_uptime_hours: 24.0,
            warning_usage_percent: 85.0,
            warning_cpu_percent: 90.0,
            warning_performance: 50,

            excellent_max_cpu: 60.0,
            excellent_min_uptime_hours: 168.0,
            excellent_max_usage_percent: 70.0,
            excellent_min_performance: 85,
        }
    }
}

/// Stale detection and retention
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZombiePolicy {
    /// Failed checks that make a node without gossip metadata stale
    pub failed_checks_without_gossip: u32,
    /// Failed checks that make any node stale
    pub failed_checks_with_gossip: u32,
    /// Delete stale records instead of marking them
    pub delete_stale_nodes: bool,
}

impl Default for ZombiePolicy {
    fn default() -> Self {
        Self {
            failed_checks_without_gossip: 2,
            failed_checks_with_gossip: 4,
            delete_stale_nodes: false,
        }
    }
}

impl CrawlerConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    // Builder-style methods for CLI overrides

    pub fn with_api_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.api_port = port;
        }
        self
    }

    pub fn with_crawl_interval(mut self, secs: Option<u64>) -> Self {
        if let Some(secs) = secs {
            self.crawl_interval_secs = secs;
        }
        self
    }

    pub fn with_seeds(mut self, seeds: Vec<String>) -> Self {
        if !seeds.is_empty() {
            self.bootstrap_seeds = seeds;
        }
        self
    }

    /// Ordered RPC ports tried on a peer with no advertised port
    pub fn default_rpc_ports(&self) -> Vec<u16> {
        let mut ports = vec![self.rpc_port];
        if self.enable_fallback_port && self.fallback_rpc_port != self.rpc_port {
            ports.push(self.fallback_rpc_port);
        }
        ports
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn geo_timeout(&self) -> Duration {
        Duration::from_secs(self.geo_timeout_secs)
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_timeout_secs)
    }

    /// Minimum spacing between geolocation lookups
    pub fn geo_min_interval(&self) -> Duration {
        Duration::from_millis(60_000 / u64::from(self.geo_requests_per_minute.max(1)))
    }

    /// Validate configuration values
    ///
    /// Called at startup before any network activity.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bootstrap_seeds.is_empty() {
            anyhow::bail!("bootstrap_seeds must contain at least one seed");
        }

        for seed in &self.bootstrap_seeds {
            if crate::types::parse_peer_ip(seed).is_none() {
                anyhow::bail!("bootstrap seed {:?} is not a routable IP address", seed);
            }
        }

        if self.rpc_port == 0 || self.gossip_port == 0 {
            anyhow::bail!("rpc_port and gossip_port must be non-zero");
        }

        for (name, url) in [
            ("mainnet_registry_url", &self.mainnet_registry_url),
            ("devnet_registry_url", &self.devnet_registry_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("{} must be an http(s) URL, got {:?}", name, url);
            }
        }

        if self.discovery_batch_size == 0 || self.rpc_batch_size == 0 {
            anyhow::bail!("batch sizes must be greater than zero");
        }

        if self.rpc_timeout_secs == 0 || self.geo_timeout_secs == 0 || self.registry_timeout_secs == 0 {
            anyhow::bail!("timeouts must be greater than zero");
        }

        if self.geo_requests_per_minute == 0 {
            anyhow::bail!("geo_requests_per_minute must be greater than zero");
        }

        if self.zombie.failed_checks_without_gossip > self.zombie.failed_checks_with_gossip {
            anyhow::bail!(
                "failed_checks_without_gossip ({}) must not exceed failed_checks_with_gossip ({})",
                self.zombie.failed_checks_without_gossip,
                self.zombie.failed_checks_with_gossip
            );
        }

        let bands = &self.confidence;
        if !(bands.confirmed >= bands.validated && bands.validated >= bands.discovered) {
            anyhow::bail!("confidence bands must be ordered confirmed >= validated >= discovered");
        }

        Ok(())
    }
}
