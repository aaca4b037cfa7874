//! HTTP implementation of the peer transport
//!
//! POSTs JSON-RPC requests to `http://{ip}:{port}/rpc`, trying each candidate
//! port in order until one answers with a parseable result.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

use super::protocol::{
    GossipResponse, JsonRpcRequest, JsonRpcResponse, PodsResult, StatsResult, VersionResult,
    METHOD_GET_PODS, METHOD_GET_PODS_WITH_STATS, METHOD_GET_STATS, METHOD_GET_VERSION,
};
use super::{PeerTransport, RpcOutcome};

/// Why a single port attempt failed
enum CallFailure {
    /// Connection refused, timeout, DNS, TLS...
    Transport(String),
    /// The peer answered but not with a usable result
    Remote(String),
}

/// RPC client for pNodes
pub struct RpcClient {
    client: reqwest::Client,
    gossip_port: u16,
    request_id: AtomicU64,
}

impl RpcClient {
    /// Create a client with a hard per-request timeout
    pub fn new(timeout: Duration, gossip_port: u16) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self::with_client(client, gossip_port))
    }

    fn with_client(client: reqwest::Client, gossip_port: u16) -> Self {
        Self {
            client,
            gossip_port,
            request_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Call `method` on each port in order, first success wins
    async fn call<T: DeserializeOwned>(&self, ip: &str, ports: &[u16], method: &str) -> RpcOutcome<T> {
        let mut last_error = None;

        for &port in ports {
            let url = format!("http://{}/rpc", host_port(ip, port));
            match self.call_port::<T>(&url, method).await {
                Ok(payload) => return RpcOutcome::Ok { payload, port },
                Err(CallFailure::Transport(e)) => {
                    trace!("{} {} unreachable: {}", method, url, e);
                }
                Err(CallFailure::Remote(e)) => {
                    trace!("{} {} failed: {}", method, url, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(message) => RpcOutcome::Error { message },
            None => RpcOutcome::Unreachable,
        }
    }

    async fn call_port<T: DeserializeOwned>(&self, url: &str, method: &str) -> Result<T, CallFailure> {
        let request = JsonRpcRequest::new(method, self.next_id());

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| CallFailure::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CallFailure::Remote(format!("HTTP error: {}", response.status())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CallFailure::Transport(e.to_string()))?;

        let parsed: JsonRpcResponse<T> = serde_json::from_slice(&body)
            .map_err(|e| CallFailure::Remote(format!("Malformed response: {}", e)))?;

        if let Some(error) = parsed.error {
            return Err(CallFailure::Remote(error.to_string()));
        }

        parsed
            .result
            .ok_or_else(|| CallFailure::Remote("Empty result".to_string()))
    }
}

#[async_trait]
impl PeerTransport for RpcClient {
    async fn gossip_peers(&self, ip: &str) -> RpcOutcome<GossipResponse> {
        let url = format!("http://{}/gossip", host_port(ip, self.gossip_port));

        let response = match self.client.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                return RpcOutcome::Error {
                    message: format!("HTTP error: {}", r.status()),
                }
            }
            Err(e) => {
                trace!("gossip {} unreachable: {}", url, e);
                return RpcOutcome::Unreachable;
            }
        };

        match response.json::<GossipResponse>().await {
            Ok(payload) => RpcOutcome::Ok {
                payload,
                port: self.gossip_port,
            },
            Err(e) => RpcOutcome::Error {
                message: format!("Malformed gossip response: {}", e),
            },
        }
    }

    async fn get_pods(&self, ip: &str, ports: &[u16]) -> RpcOutcome<PodsResult> {
        self.call(ip, ports, METHOD_GET_PODS).await
    }

    async fn get_pods_with_stats(&self, ip: &str, ports: &[u16]) -> RpcOutcome<PodsResult> {
        self.call(ip, ports, METHOD_GET_PODS_WITH_STATS).await
    }

    async fn get_stats(&self, ip: &str, ports: &[u16]) -> RpcOutcome<StatsResult> {
        self.call(ip, ports, METHOD_GET_STATS).await
    }

    async fn get_version(&self, ip: &str, ports: &[u16]) -> RpcOutcome<VersionResult> {
        self.call(ip, ports, METHOD_GET_VERSION).await
    }
}

/// `ip:port`, bracketing IPv6 literals
fn host_port(ip: &str, port: u16) -> String {
    if ip.contains(':') {
        format!("[{}]:{}", ip, port)
    } else {
        format!("{}:{}", ip, port)
    }
}
