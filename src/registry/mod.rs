//! Official Registry Module
//!
//! Authoritative pod lists with earned credits, one per sub-network.
//! Registry data enriches classification and credits but never blocks a
//! crawl: a failed fetch keeps the last good copy of that list and is
//! retried on the next cycle.

mod client;

pub use client::HttpRegistrySource;

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

use crate::types::{lenient, Network};

/// One `{pod_id, credits}` entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PodCredit {
    #[serde(default)]
    pub pod_id: String,
    #[serde(default, deserialize_with = "lenient::as_f64")]
    pub credits: f64,
}

/// Registry fetch failure
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("registry returned status {0}")]
    Status(u16),

    #[error("no registry endpoint for {0}")]
    NoEndpoint(&'static str),
}

/// Where registry lists come from
#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn fetch(&self, network: Network) -> Result<Vec<PodCredit>, RegistryError>;
}

/// Lookup sets built from the two official lists
///
/// Built once per process and handed to each cycle; refreshed when the
/// validity window has passed.
pub struct OfficialRegistry {
    /// pubkey -> credits
    mainnet: HashMap<String, f64>,
    devnet: HashMap<String, f64>,

    /// When the lists were last fetched
    fetched_at: Option<Instant>,

    /// Validity window of a fetch
    ttl: Duration,
}

impl OfficialRegistry {
    /// Empty registry, stale until the first refresh
    pub fn new(ttl: Duration) -> Self {
        Self {
            mainnet: HashMap::new(),
            devnet: HashMap::new(),
            fetched_at: None,
            ttl,
        }
    }

    /// Registry preloaded from lists, considered fresh
    pub fn from_lists(mainnet: Vec<PodCredit>, devnet: Vec<PodCredit>, ttl: Duration) -> Self {
        Self {
            mainnet: build_lookup(mainnet),
            devnet: build_lookup(devnet),
            fetched_at: Some(Instant::now()),
            ttl,
        }
    }

    /// Whether the last fetch is still inside the validity window
    pub fn is_fresh(&self) -> bool {
        self.fetched_at
            .map(|at| at.elapsed() < self.ttl)
            .unwrap_or(false)
    }

    /// Refetch both lists unless still fresh; `force` bypasses the window
    ///
    /// Returns whether a fetch took place.
    pub async fn refresh(&mut self, source: &dyn RegistrySource, force: bool) -> bool {
        if !force && self.is_fresh() {
            return false;
        }

        let (mainnet, devnet) = tokio::join!(
            source.fetch(Network::Mainnet),
            source.fetch(Network::Devnet),
        );

        // A failed list keeps its cached copy; the window only restarts once both answer
        let mut complete = true;
        match mainnet {
            Ok(list) => self.mainnet = build_lookup(list),
            Err(e) => {
                warn!("MAINNET registry unavailable, keeping cached list: {}", e);
                complete = false;
            }
        }
        match devnet {
            Ok(list) => self.devnet = build_lookup(list),
            Err(e) => {
                warn!("DEVNET registry unavailable, keeping cached list: {}", e);
                complete = false;
            }
        }

        self.fetched_at = complete.then(Instant::now);

        info!(
            "📜 Official registry refreshed: {} MAINNET pods, {} DEVNET pods",
            self.mainnet.len(),
            self.devnet.len()
        );

        true
    }

    pub fn is_mainnet(&self, pubkey: &str) -> bool {
        self.mainnet.contains_key(pubkey)
    }

    pub fn is_devnet(&self, pubkey: &str) -> bool {
        self.devnet.contains_key(pubkey)
    }

    /// Listed in either registry
    pub fn contains(&self, pubkey: &str) -> bool {
        self.is_mainnet(pubkey) || self.is_devnet(pubkey)
    }

    /// Whether a non-empty MAINNET list is loaded
    pub fn has_mainnet_list(&self) -> bool {
        !self.mainnet.is_empty()
    }

    /// Credits for `pubkey`, MAINNET list first
    pub fn credits(&self, pubkey: &str) -> Option<f64> {
        self.mainnet
            .get(pubkey)
            .or_else(|| self.devnet.get(pubkey))
            .copied()
    }

    pub fn mainnet_len(&self) -> usize {
        self.mainnet.len()
    }

    pub fn devnet_len(&self) -> usize {
        self.devnet.len()
    }
}

/// Index a list by pod id, ignoring blank ids; duplicates keep the higher credit
fn build_lookup(list: Vec<PodCredit>) -> HashMap<String, f64> {
    let mut lookup = HashMap::with_capacity(list.len());
    for entry in list {
        let id = entry.pod_id.trim();
        if id.is_empty() {
            continue;
        }
        let credits = lookup.entry(id.to_string()).or_insert(entry.credits);
        if entry.credits > *credits {
            *credits = entry.credits;
        }
    }
    lookup
}
