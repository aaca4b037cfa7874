//! Peer RPC Module
//!
//! Typed access to the pNode JSON-RPC interface and the HTTP gossip listing.
//!
//! ## Failure model
//!
//! Network errors never surface as `Err`. Every call yields an `RpcOutcome`:
//! the peer answered, the peer answered with an error (or garbage), or no
//! candidate port answered at all. The orchestrator treats the last two alike.

mod client;
pub mod protocol;

pub use client::RpcClient;

use async_trait::async_trait;

use protocol::{GossipResponse, PodsResult, StatsResult, VersionResult};

/// Result of one RPC call across all candidate ports
#[derive(Debug, Clone, PartialEq)]
pub enum RpcOutcome<T> {
    /// Parsed payload and the port that produced it
    Ok { payload: T, port: u16 },
    /// A port answered, but with an RPC error or a malformed body
    Error { message: String },
    /// No candidate port answered within the timeout
    Unreachable,
}

impl<T> RpcOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, RpcOutcome::Ok { .. })
    }

    /// Payload and answering port, discarding failure detail
    pub fn into_parts(self) -> Option<(T, u16)> {
        match self {
            RpcOutcome::Ok { payload, port } => Some((payload, port)),
            _ => None,
        }
    }

    pub fn ok(self) -> Option<T> {
        self.into_parts().map(|(payload, _)| payload)
    }
}

/// Transport used by the crawler to talk to peers
///
/// Implemented over HTTP by `RpcClient`; tests substitute an in-memory network.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// `GET /gossip` on the gossip port
    async fn gossip_peers(&self, ip: &str) -> RpcOutcome<GossipResponse>;

    /// Peer list as known by `ip`
    async fn get_pods(&self, ip: &str, ports: &[u16]) -> RpcOutcome<PodsResult>;

    /// Peer list with embedded version, identity, storage and visibility
    async fn get_pods_with_stats(&self, ip: &str, ports: &[u16]) -> RpcOutcome<PodsResult>;

    /// Live metrics of `ip` itself
    async fn get_stats(&self, ip: &str, ports: &[u16]) -> RpcOutcome<StatsResult>;

    /// Self-reported version and cluster of `ip`
    async fn get_version(&self, ip: &str, ports: &[u16]) -> RpcOutcome<VersionResult>;
}
