//! Peer RPC wire format
//!
//! JSON-RPC 2.0 envelopes and the payloads of `get-pods`, `get-pods-with-stats`,
//! `get-stats` and `get-version`, plus the HTTP gossip listing. Every numeric
//! field is read leniently: peers are not trusted to send well-typed data.

use serde::{Deserialize, Serialize};

use crate::types::lenient;

pub const METHOD_GET_PODS: &str = "get-pods";
pub const METHOD_GET_PODS_WITH_STATS: &str = "get-pods-with-stats";
pub const METHOD_GET_STATS: &str = "get-stats";
pub const METHOD_GET_VERSION: &str = "get-version";

/// JSON-RPC request
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub id: u64,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(method: &'a str, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            id,
        }
    }
}

/// JSON-RPC response
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<serde_json::Value>,
}

/// One pod as listed by `get-pods` or `get-pods-with-stats`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodEntry {
    /// `ip:gossip_port`
    #[serde(default)]
    pub address: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub pubkey: Option<String>,
    /// Unix seconds
    #[serde(default, deserialize_with = "lenient::as_u64")]
    pub last_seen_timestamp: u64,
    #[serde(default, deserialize_with = "lenient::as_u64")]
    pub storage_committed: u64,
    #[serde(default, deserialize_with = "lenient::as_u64")]
    pub storage_used: u64,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    pub is_public: Option<bool>,
    #[serde(default, deserialize_with = "lenient::opt_port")]
    pub rpc_port: Option<u16>,
    #[serde(default, deserialize_with = "lenient::as_u64")]
    pub uptime: u64,
}

/// Result of `get-pods` and `get-pods-with-stats`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodsResult {
    #[serde(default)]
    pub pods: Vec<PodEntry>,
    #[serde(default, deserialize_with = "lenient::as_u64")]
    pub total_count: u64,
}

/// Result of `get-stats`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsResult {
    #[serde(default, deserialize_with = "lenient::as_f64")]
    pub cpu_percent: f64,
    #[serde(default, deserialize_with = "lenient::as_u64")]
    pub ram_used: u64,
    #[serde(default, deserialize_with = "lenient::as_u64")]
    pub ram_total: u64,
    #[serde(default, deserialize_with = "lenient::as_u64")]
    pub uptime: u64,
    #[serde(default, deserialize_with = "lenient::as_u64")]
    pub packets_sent: u64,
    #[serde(default, deserialize_with = "lenient::as_u64")]
    pub packets_received: u64,
    #[serde(default, deserialize_with = "lenient::as_u64")]
    pub active_streams: u64,
    #[serde(default, deserialize_with = "lenient::as_u64")]
    pub current_index: u64,
    #[serde(default, deserialize_with = "lenient::as_u64")]
    pub total_pages: u64,
    #[serde(default, deserialize_with = "lenient::as_u64")]
    pub total_bytes: u64,
    #[serde(default, deserialize_with = "lenient::as_u64")]
    pub file_size: u64,
}

/// Result of `get-version`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionResult {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub version: Option<String>,
    /// Some builds report the cluster separately
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub cluster: Option<String>,
}

impl VersionResult {
    /// All self-reported text the classifier can match on
    pub fn marker_text(&self) -> String {
        [self.cluster.as_deref(), self.version.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One entry of the gossip listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GossipPeer {
    #[serde(default)]
    pub ip: String,
}

/// Response of `GET /gossip`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GossipResponse {
    #[serde(default)]
    pub pnodes: Vec<GossipPeer>,
}
