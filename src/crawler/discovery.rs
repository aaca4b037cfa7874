//! Breadth-first peer discovery
//!
//! Starting from the bootstrap seeds, every IP is asked for its gossip
//! listing and its `get-pods` view at the same time. Peers not seen before
//! are queued for the next batch until the queue drains or the node cap is
//! hit.

use futures::future::join_all;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info};

use crate::rpc::protocol::PodEntry;
use crate::rpc::PeerTransport;
use crate::types::{parse_peer_ip, parse_peer_port};

/// What other peers said about a node during discovery
///
/// Used only when richer sources are silent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeerHint {
    pub version: Option<String>,
    pub pubkey: Option<String>,
    pub rpc_port: Option<u16>,
    pub gossip_port: Option<u16>,
    pub is_public: Option<bool>,
}

impl PeerHint {
    fn from_pod(pod: &PodEntry) -> Self {
        Self {
            version: pod.version.clone(),
            pubkey: pod.pubkey.clone(),
            rpc_port: pod.rpc_port,
            gossip_port: parse_peer_port(&pod.address),
            is_public: pod.is_public,
        }
    }

    /// Fill fields still missing from another report
    fn absorb(&mut self, other: PeerHint) {
        self.version = self.version.take().or(other.version);
        self.pubkey = self.pubkey.take().or(other.pubkey);
        self.rpc_port = self.rpc_port.or(other.rpc_port);
        self.gossip_port = self.gossip_port.or(other.gossip_port);
        self.is_public = self.is_public.or(other.is_public);
    }
}

/// Outcome of one discovery run
#[derive(Debug, Default)]
pub struct Discovery {
    /// Distinct IPs in BFS order, seeds first
    pub nodes: Vec<String>,

    /// IPs some other peer reported, through gossip or `get-pods`
    pub reported: HashSet<String>,

    /// Fallback metadata per IP
    pub hints: HashMap<String, PeerHint>,

    /// IPs that answered at least one of the two calls
    pub responsive: HashSet<String>,

    /// Membership index over `nodes`
    known: HashSet<String>,
}

impl Discovery {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add an IP found outside discovery, respecting the cap
    pub fn admit(&mut self, ip: &str, max_nodes: usize) -> bool {
        if self.nodes.len() >= max_nodes || !self.known.insert(ip.to_string()) {
            return false;
        }
        self.nodes.push(ip.to_string());
        true
    }
}

/// Crawl the peer graph from `seeds`
pub async fn discover(
    transport: &dyn PeerTransport,
    seeds: &[String],
    ports: &[u16],
    batch_size: usize,
    max_nodes: usize,
) -> Discovery {
    let mut result = Discovery::default();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    for seed in seeds {
        if let Some(ip) = parse_peer_ip(seed) {
            if visited.len() < max_nodes && visited.insert(ip.clone()) {
                result.nodes.push(ip.clone());
                queue.push_back(ip);
            }
        }
    }

    let batch_size = batch_size.max(1);
    let mut round = 0usize;

    while !queue.is_empty() {
        round += 1;
        let take = batch_size.min(queue.len());
        let batch: Vec<String> = queue.drain(..take).collect();

        let responses = join_all(batch.iter().map(|ip| async move {
            let (gossip, pods) = tokio::join!(transport.gossip_peers(ip), transport.get_pods(ip, ports));
            (ip, gossip, pods)
        }))
        .await;

        // Discovery state is only touched here, between batches
        for (ip, gossip, pods) in responses {
            let mut found: Vec<String> = Vec::new();
            let mut answered = false;

            if let Some(listing) = gossip.ok() {
                answered = true;
                found.extend(listing.pnodes.iter().filter_map(|p| parse_peer_ip(&p.ip)));
            }

            if let Some(pods) = pods.ok() {
                answered = true;
                for pod in &pods.pods {
                    let Some(peer_ip) = parse_peer_ip(&pod.address) else {
                        continue;
                    };
                    result
                        .hints
                        .entry(peer_ip.clone())
                        .or_default()
                        .absorb(PeerHint::from_pod(pod));
                    found.push(peer_ip);
                }
            }

            if answered {
                result.responsive.insert(ip.clone());
            }

            for peer_ip in found {
                if peer_ip == *ip {
                    continue;
                }
                result.reported.insert(peer_ip.clone());
                if visited.len() < max_nodes && visited.insert(peer_ip.clone()) {
                    debug!("Discovered {} via {}", peer_ip, ip);
                    result.nodes.push(peer_ip.clone());
                    queue.push_back(peer_ip);
                }
            }
        }

        debug!("Discovery round {}: {} known, {} queued", round, visited.len(), queue.len());
    }

    result.known = visited;

    info!(
        "🔍 Discovery finished: {} nodes ({} responsive) in {} rounds",
        result.nodes.len(),
        result.responsive.len(),
        round
    );

    result
}
