//! Core types for the pNode crawler
//!
//! Durable node records, history samples and the network metadata singleton.
//! Stored types are encoded with bincode, so they carry no `skip_serializing_if`
//! or self-describing deserializers. Peer-reported payloads live in `rpc::protocol`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr};

/// Lenient deserializers for data reported by peers and upstream APIs
///
/// Peers send numbers as JSON numbers, numeric strings, `null`, or not at all.
/// Everything that cannot be read as a finite number becomes zero.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn value_to_f64(value: &Value) -> f64 {
        let parsed = match value {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            _ => 0.0,
        };
        if parsed.is_finite() {
            parsed
        } else {
            0.0
        }
    }

    pub fn as_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().map(value_to_f64).unwrap_or(0.0))
    }

    pub fn as_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = as_f64(deserializer)?;
        // `as` saturates, negative values clamp to zero
        Ok(if v > 0.0 { v as u64 } else { 0 })
    }

    pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            Some(Value::Number(n)) => n.as_u64().map(|v| v != 0),
            _ => None,
        })
    }

    pub fn opt_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        let port = value.as_ref().map(value_to_f64).unwrap_or(0.0);
        Ok(if port >= 1.0 && port <= u16::MAX as f64 {
            Some(port as u16)
        } else {
            None
        })
    }
}

// =============================================================================
// NETWORK CONSTANTS
// =============================================================================

/// Default pNode RPC port
pub const DEFAULT_RPC_PORT: u16 = 6000;

/// Secondary RPC port some operators expose (behind `enable_fallback_port`)
pub const FALLBACK_RPC_PORT: u16 = 9000;

/// Port of the lightweight HTTP gossip endpoint
pub const GOSSIP_HTTP_PORT: u16 = 5000;

/// Gossip port advertised by production (MAINNET) pNodes
pub const MAINNET_GOSSIP_PORT: u16 = 9001;

/// Bootstrap pNodes the crawl starts from
pub const BOOTSTRAP_SEED_IPS: [&str; 4] = [
    "173.212.203.145",
    "173.212.220.65",
    "161.97.97.41",
    "192.190.136.36",
];

// =============================================================================
// ENUMS
// =============================================================================

/// Lifecycle state of a node record (not network membership)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Online,
    Stale,
    /// Unreachable, but its identity is listed in an official registry
    RegistryOnly,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Online => "online",
            NodeStatus::Stale => "stale",
            NodeStatus::RegistryOnly => "registry_only",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "online" => Some(NodeStatus::Online),
            "stale" => Some(NodeStatus::Stale),
            "registry_only" => Some(NodeStatus::RegistryOnly),
            _ => None,
        }
    }
}

/// Visibility reported by the gossip layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Public,
    Private,
    Unknown,
}

impl NodeType {
    /// Derive the node type from the remote `is_public` flag
    pub fn from_visibility(is_public: Option<bool>) -> Self {
        match is_public {
            Some(true) => NodeType::Public,
            Some(false) => NodeType::Private,
            None => NodeType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Public => "public",
            NodeType::Private => "private",
            NodeType::Unknown => "unknown",
        }
    }
}

/// Sub-network membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Network {
    Mainnet,
    Devnet,
    Unknown,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "MAINNET",
            Network::Devnet => "DEVNET",
            Network::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "MAINNET" => Some(Network::Mainnet),
            "DEVNET" => Some(Network::Devnet),
            "UNKNOWN" => Some(Network::Unknown),
            _ => None,
        }
    }
}

/// Confidence tier of a network classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkConfidence {
    High,
    Medium,
    Low,
}

/// Provenance of a node's data
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    Registry,
    Gossip,
    Rpc,
}

/// Corroboration tier derived from the confidence score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Confirmed,
    Validated,
    Discovered,
    Uncertain,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Confirmed => "confirmed",
            ConfidenceLevel::Validated => "validated",
            ConfidenceLevel::Discovered => "discovered",
            ConfidenceLevel::Uncertain => "uncertain",
        }
    }
}

/// Five-tier health status shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthStatus {
    Excellent,
    Good,
    Warning,
    Critical,
    Private,
}

// =============================================================================
// NODE STATS
// =============================================================================

/// Live metrics for a node, merged from gossip and RPC provenance layers
///
/// See `crawler::enrich::merge_stats` for the precedence table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    pub cpu_percent: f64,
    pub ram_used: u64,
    pub ram_total: u64,
    /// Seconds
    pub uptime: u64,
    pub storage_committed: u64,
    pub storage_used: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub active_streams: u64,
    pub current_index: u64,
    pub total_pages: u64,
    /// Legacy storage pair, kept for dashboard continuity
    pub total_bytes: u64,
    pub file_size: u64,
}

impl NodeStats {
    /// Whether at least one live metric carries a positive value
    ///
    /// All-zero stats mean "no data", not an idle node.
    pub fn has_live_metrics(&self) -> bool {
        self.uptime > 0 || self.cpu_percent > 0.0 || self.ram_used > 0 || self.storage_committed > 0
    }

    /// RAM usage in percent, if the total is known
    pub fn ram_percent(&self) -> Option<f64> {
        if self.ram_total == 0 {
            return None;
        }
        Some(self.ram_used as f64 / self.ram_total as f64 * 100.0)
    }

    /// Storage usage in percent
    ///
    /// Prefers the committed/used pair; falls back to total_bytes/file_size.
    pub fn storage_percent(&self) -> f64 {
        if self.storage_committed > 0 {
            return self.storage_used as f64 / self.storage_committed as f64 * 100.0;
        }
        if self.total_bytes > 0 {
            return self.file_size as f64 / self.total_bytes as f64 * 100.0;
        }
        0.0
    }

}

// =============================================================================
// GEOLOCATION
// =============================================================================

/// Normalized location, independent of the provider that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lng: f64,
    pub city: String,
    pub country: String,
    pub country_code: String,
}

// =============================================================================
// NODE RECORD
// =============================================================================

/// The durable unit, keyed by IP address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub ip: String,
    pub status: NodeStatus,
    pub node_type: NodeType,
    pub network: Network,
    pub network_confidence: NetworkConfidence,

    /// Identity; several IPs may share one (multi-node operators)
    pub pubkey: Option<String>,
    pub version: Option<String>,

    /// RPC port that last answered or was advertised
    pub rpc_port: Option<u16>,

    /// Gossip port taken from the advertised address
    pub gossip_port: Option<u16>,

    pub stats: NodeStats,

    pub confidence_score: u8,
    pub confidence_level: ConfidenceLevel,
    pub sources: BTreeSet<SourceTag>,
    pub performance_score: u8,
    pub health: HealthStatus,

    /// Consecutive failed checks, drives zombie detection
    pub failed_checks: u32,

    /// Credits resolved from the official registry
    pub credits: f64,

    pub geo: Option<GeoLocation>,

    pub last_seen_gossip: Option<DateTime<Utc>>,
    pub last_crawled_at: DateTime<Utc>,
}

impl NodeRecord {
    /// A fresh record with no data beyond its address
    pub fn new(ip: impl Into<String>, crawled_at: DateTime<Utc>) -> Self {
        Self {
            ip: ip.into(),
            status: NodeStatus::Online,
            node_type: NodeType::Unknown,
            network: Network::Unknown,
            network_confidence: NetworkConfidence::Low,
            pubkey: None,
            version: None,
            rpc_port: None,
            gossip_port: None,
            stats: NodeStats::default(),
            confidence_score: 0,
            confidence_level: ConfidenceLevel::Uncertain,
            sources: BTreeSet::new(),
            performance_score: 0,
            health: HealthStatus::Private,
            failed_checks: 0,
            credits: 0.0,
            geo: None,
            last_seen_gossip: None,
            last_crawled_at: crawled_at,
        }
    }

    pub fn is_public(&self) -> bool {
        self.node_type == NodeType::Public
    }
}

// =============================================================================
// HISTORY & METADATA
// =============================================================================

/// Append-only snapshot of a node's stats for time-series display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub ip: String,
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub ram_used: u64,
    pub ram_total: u64,
    pub uptime: u64,
    pub storage_committed: u64,
    pub storage_used: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub active_streams: u64,
    pub performance_score: u8,
}

impl HistorySample {
    pub fn from_record(record: &NodeRecord, timestamp: DateTime<Utc>) -> Self {
        let s = &record.stats;
        Self {
            ip: record.ip.clone(),
            timestamp,
            cpu_percent: s.cpu_percent,
            ram_used: s.ram_used,
            ram_total: s.ram_total,
            uptime: s.uptime,
            storage_committed: s.storage_committed,
            storage_used: s.storage_used,
            packets_sent: s.packets_sent,
            packets_received: s.packets_received,
            active_streams: s.active_streams,
            performance_score: record.performance_score,
        }
    }
}

/// Singleton coverage row written once per cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetadata {
    /// Distinct IPs discovered this cycle
    pub network_total: u64,
    /// Nodes that answered `get-stats`
    pub nodes_crawled: u64,
    pub active_count: u64,
    pub stale_count: u64,
    pub mainnet_count: u64,
    pub devnet_count: u64,
    pub unknown_count: u64,
    pub total_storage_committed: u64,
    pub total_credits: f64,
    pub last_updated: DateTime<Utc>,
}

// =============================================================================
// ADDRESS HELPERS
// =============================================================================

/// Extract a crawlable IP from a peer-reported address
///
/// Accepts `ip`, `ip:port` and `[v6]:port`. Unspecified and loopback
/// addresses are rejected since they point back at the reporter.
pub fn parse_peer_ip(address: &str) -> Option<String> {
    let address = address.trim();
    let ip = if let Ok(sock) = address.parse::<SocketAddr>() {
        sock.ip()
    } else if let Ok(ip) = address.parse::<IpAddr>() {
        ip
    } else {
        let (host, _) = address.rsplit_once(':')?;
        host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>().ok()?
    };

    if ip.is_unspecified() || ip.is_loopback() {
        return None;
    }
    Some(ip.to_string())
}

/// Extract the port from an `ip:port` address, if present
pub fn parse_peer_port(address: &str) -> Option<u16> {
    let address = address.trim();
    if let Ok(sock) = address.parse::<SocketAddr>() {
        return Some(sock.port());
    }
    // A bare IPv6 address has colons but no port
    if address.parse::<IpAddr>().is_ok() {
        return None;
    }
    let (_, port) = address.rsplit_once(':')?;
    port.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Lenient {
        #[serde(default, deserialize_with = "lenient::as_f64")]
        cpu: f64,
        #[serde(default, deserialize_with = "lenient::as_u64")]
        uptime: u64,
        #[serde(default, deserialize_with = "lenient::opt_string")]
        pubkey: Option<String>,
        #[serde(default, deserialize_with = "lenient::opt_bool")]
        is_public: Option<bool>,
    }

    #[test]
    fn test_lenient_numbers() {
        let v: Lenient = serde_json::from_str(
            r#"{"cpu": "12.5", "uptime": 3600, "pubkey": "  ", "is_public": "true"}"#,
        )
        .unwrap();
        assert_eq!(v.cpu, 12.5);
        assert_eq!(v.uptime, 3600);
        assert_eq!(v.pubkey, None);
        assert_eq!(v.is_public, Some(true));

        let v: Lenient = serde_json::from_str(r#"{"cpu": null, "uptime": "garbage"}"#).unwrap();
        assert_eq!(v.cpu, 0.0);
        assert_eq!(v.uptime, 0);
        assert_eq!(v.is_public, None);

        let v: Lenient = serde_json::from_str(r#"{"uptime": -5}"#).unwrap();
        assert_eq!(v.uptime, 0);
    }

    #[test]
    fn test_parse_peer_ip() {
        assert_eq!(parse_peer_ip("1.2.3.4:9001").as_deref(), Some("1.2.3.4"));
        assert_eq!(parse_peer_ip("1.2.3.4").as_deref(), Some("1.2.3.4"));
        assert_eq!(parse_peer_ip("[2001:db8::1]:9001").as_deref(), Some("2001:db8::1"));
        assert_eq!(parse_peer_ip("0.0.0.0:9001"), None);
        assert_eq!(parse_peer_ip("127.0.0.1:6000"), None);
        assert_eq!(parse_peer_ip("not-an-ip"), None);
    }

    #[test]
    fn test_parse_peer_port() {
        assert_eq!(parse_peer_port("1.2.3.4:9001"), Some(9001));
        assert_eq!(parse_peer_port("1.2.3.4"), None);
        assert_eq!(parse_peer_port("[2001:db8::1]:9001"), Some(9001));
        assert_eq!(parse_peer_port("2001:db8::9001"), None);
        assert_eq!(parse_peer_port("::1"), None);
    }

    #[test]
    fn test_storage_percent_prefers_committed() {
        let stats = NodeStats {
            storage_committed: 1000,
            storage_used: 250,
            total_bytes: 100,
            file_size: 90,
            ..Default::default()
        };
        assert_eq!(stats.storage_percent(), 25.0);

        let legacy = NodeStats {
            total_bytes: 100,
            file_size: 90,
            ..Default::default()
        };
        assert_eq!(legacy.storage_percent(), 90.0);
    }

    #[test]
    fn test_live_metrics_requires_positive_value() {
        assert!(!NodeStats::default().has_live_metrics());
        let stats = NodeStats {
            ram_used: 1,
            ..Default::default()
        };
        assert!(stats.has_live_metrics());
    }

    #[test]
    fn test_record_bincode_roundtrip() {
        let mut record = NodeRecord::new("1.2.3.4", Utc::now());
        record.sources.insert(SourceTag::Gossip);
        record.pubkey = Some("pk".to_string());
        let bytes = bincode::serialize(&record).unwrap();
        let decoded: NodeRecord = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, record);
    }
}
