//! Crawler Orchestrator
//!
//! Runs one crawl cycle at a time through a fixed sequence of phases:
//!
//! ```text
//! DISCOVERY → METADATA_ENRICHMENT → STATS_COLLECTION → GEOLOCATION →
//! CLASSIFICATION → SCORING → DEDUPLICATION → PERSISTENCE → ZOMBIE_SWEEP
//! ```
//!
//! A peer failing is local to that peer. Registry failures fall back to the
//! last fetched lists. Table writes are independent; a failed write is logged
//! and reported but never rolls back another table.

mod discovery;
mod enrich;
mod zombie;

pub use discovery::{discover, Discovery, PeerHint};
pub use enrich::{collect_pod_metadata, collect_stats, merge_stats, stats_ports, PodMetadata};
pub use zombie::{disposition, is_stale, Disposition, Liveness};

use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

use crate::api::Metrics;
use crate::config::CrawlerConfig;
use crate::geo::{is_reserved_ip, GeoRateLimiter, GeoResolver};
use crate::network_state::NetworkStateAggregator;
use crate::registry::{OfficialRegistry, RegistrySource};
use crate::rpc::protocol::StatsResult;
use crate::rpc::PeerTransport;
use crate::scoring::{
    health_status, performance_score, score_confidence, ClassificationInput, ConfidenceInput, NetworkClassifier,
};
use crate::store::{NodeStore, StoreError};
use crate::types::{HistorySample, NetworkMetadata, NodeRecord, NodeStatus, NodeType};

// =============================================================================
// CYCLE TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Discovery,
    MetadataEnrichment,
    StatsCollection,
    Geolocation,
    Classification,
    Scoring,
    Deduplication,
    Persistence,
    ZombieSweep,
}

impl CrawlPhase {
    const ALL: [CrawlPhase; 9] = [
        CrawlPhase::Discovery,
        CrawlPhase::MetadataEnrichment,
        CrawlPhase::StatsCollection,
        CrawlPhase::Geolocation,
        CrawlPhase::Classification,
        CrawlPhase::Scoring,
        CrawlPhase::Deduplication,
        CrawlPhase::Persistence,
        CrawlPhase::ZombieSweep,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlPhase::Discovery => "discovery",
            CrawlPhase::MetadataEnrichment => "metadata_enrichment",
            CrawlPhase::StatsCollection => "stats_collection",
            CrawlPhase::Geolocation => "geolocation",
            CrawlPhase::Classification => "classification",
            CrawlPhase::Scoring => "scoring",
            CrawlPhase::Deduplication => "deduplication",
            CrawlPhase::Persistence => "persistence",
            CrawlPhase::ZombieSweep => "zombie_sweep",
        }
    }

    /// 1-based slot, 0 means idle
    fn slot(self) -> u8 {
        Self::ALL.iter().position(|p| *p == self).map(|i| i as u8 + 1).unwrap_or(0)
    }

    fn from_slot(slot: u8) -> Option<Self> {
        Self::ALL.get(usize::from(slot).checked_sub(1)?).copied()
    }
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("a crawl cycle is already running")]
    CycleInProgress,
}

/// Table a persistence failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistTable {
    Nodes,
    History,
    Metadata,
}

/// Summary of one finished cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub discovered: usize,
    /// Nodes that answered `get-stats`
    pub crawled: usize,
    pub online: usize,
    pub stale: usize,
    pub registry_only: usize,
    pub deleted: usize,
    /// Known nodes absent from this cycle
    pub unseen: usize,
    pub geo_lookups: usize,
    pub geo_cache_hits: usize,
    pub nodes_written: usize,
    pub history_written: usize,
    pub persistence_errors: Vec<(PersistTable, String)>,
}

/// Proof that the caller holds the single cycle slot
pub struct CycleGuard {
    _lock: OwnedMutexGuard<()>,
    metrics: Arc<Metrics>,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.metrics.set_cycle_running(false);
    }
}

/// A node as it moves through the cycle
struct Crawled {
    record: NodeRecord,
    /// Port that answered `get-stats`
    answered_port: Option<u16>,
    has_gossip_metadata: bool,
    disposition: Disposition,
}

// =============================================================================
// CRAWLER
// =============================================================================

pub struct Crawler {
    config: Arc<CrawlerConfig>,
    transport: Arc<dyn PeerTransport>,
    geo: GeoResolver,
    geo_limiter: GeoRateLimiter,
    registry: RwLock<OfficialRegistry>,
    registry_source: Arc<dyn RegistrySource>,
    store: Arc<dyn NodeStore>,
    network_state: RwLock<NetworkStateAggregator>,
    metrics: Arc<Metrics>,
    cycle_lock: Arc<Mutex<()>>,
    phase: AtomicU8,
}

impl Crawler {
    pub fn new(
        config: Arc<CrawlerConfig>,
        transport: Arc<dyn PeerTransport>,
        geo: GeoResolver,
        registry_source: Arc<dyn RegistrySource>,
        store: Arc<dyn NodeStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let network_state = match store.get_metadata() {
            Ok(Some(metadata)) => NetworkStateAggregator::with_metadata(metadata),
            Ok(None) => NetworkStateAggregator::new(),
            Err(e) => {
                warn!("Could not load stored network metadata: {}", e);
                NetworkStateAggregator::new()
            }
        };

        Self {
            geo_limiter: GeoRateLimiter::new(config.geo_min_interval()),
            registry: RwLock::new(OfficialRegistry::new(Duration::from_secs(config.registry_cache_secs))),
            config,
            transport,
            geo,
            registry_source,
            store,
            network_state: RwLock::new(network_state),
            metrics,
            cycle_lock: Arc::new(Mutex::new(())),
            phase: AtomicU8::new(0),
        }
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Phase of the running cycle, `None` when idle
    pub fn current_phase(&self) -> Option<CrawlPhase> {
        CrawlPhase::from_slot(self.phase.load(Ordering::Relaxed))
    }

    /// Last computed network metadata and its size trend
    pub async fn network_state(&self) -> (NetworkMetadata, i64) {
        let state = self.network_state.read().await;
        (state.current(), state.size_trend())
    }

    /// Claim the cycle slot, or `None` when a cycle is already running
    pub fn try_begin(&self) -> Option<CycleGuard> {
        match self.cycle_lock.clone().try_lock_owned() {
            Ok(lock) => {
                self.metrics.set_cycle_running(true);
                Some(CycleGuard {
                    _lock: lock,
                    metrics: self.metrics.clone(),
                })
            }
            Err(_) => {
                self.metrics.inc_cycles_rejected();
                None
            }
        }
    }

    /// Run one cycle unless another one is in progress
    pub async fn run_cycle(&self) -> Result<CycleReport, CrawlError> {
        let guard = self.try_begin().ok_or(CrawlError::CycleInProgress)?;
        Ok(self.run_with(guard).await)
    }

    fn enter(&self, phase: CrawlPhase) {
        self.phase.store(phase.slot(), Ordering::Relaxed);
        debug!("Crawl phase: {}", phase.as_str());
    }

    /// Run a full cycle while holding the slot
    pub async fn run_with(&self, _guard: CycleGuard) -> CycleReport {
        let started = Instant::now();
        let now = Utc::now();
        let cfg = self.config.clone();
        let default_ports = cfg.default_rpc_ports();
        let transport = self.transport.as_ref();

        let mut report = CycleReport {
            started_at: now,
            ..Default::default()
        };

        info!("🚀 Crawl cycle started");

        {
            let mut registry = self.registry.write().await;
            registry.refresh(self.registry_source.as_ref(), false).await;
            self.metrics.set_registry_sizes(registry.mainnet_len(), registry.devnet_len());
        }

        // Previously stored records feed the geolocation cache and failure counters
        let known: HashMap<String, NodeRecord> = match self.store.list_nodes() {
            Ok(nodes) => nodes.into_iter().map(|n| (n.ip.clone(), n)).collect(),
            Err(e) => {
                warn!("Could not load known nodes, crawling without history: {}", e);
                HashMap::new()
            }
        };

        // === DISCOVERY ===
        self.enter(CrawlPhase::Discovery);
        let mut discovery = discover(
            transport,
            &cfg.bootstrap_seeds,
            &default_ports,
            cfg.discovery_batch_size,
            cfg.max_nodes,
        )
        .await;

        // === METADATA_ENRICHMENT ===
        self.enter(CrawlPhase::MetadataEnrichment);
        let metadata = collect_pod_metadata(transport, &discovery.nodes, &default_ports, cfg.rpc_batch_size).await;

        let mut pod_ips: Vec<&String> = metadata.keys().collect();
        pod_ips.sort();
        let joined = pod_ips.into_iter().filter(|ip| discovery.admit(ip, cfg.max_nodes)).count();
        if joined > 0 {
            debug!("{} pod IPs joined from get-pods-with-stats", joined);
        }
        report.discovered = discovery.len();

        // IPs any peer vouched for this cycle
        let gossip_set: HashSet<&str> = discovery
            .reported
            .iter()
            .map(String::as_str)
            .chain(metadata.keys().map(String::as_str))
            .collect();

        // === STATS_COLLECTION ===
        self.enter(CrawlPhase::StatsCollection);
        let targets: Vec<(String, Vec<u16>)> = discovery
            .nodes
            .iter()
            .map(|ip| {
                let advertised = metadata
                    .get(ip)
                    .and_then(|m| m.rpc_port)
                    .or_else(|| discovery.hints.get(ip).and_then(|h| h.rpc_port))
                    .or_else(|| known.get(ip).and_then(|k| k.rpc_port));
                (ip.clone(), stats_ports(advertised, &default_ports))
            })
            .collect();

        let outcomes = collect_stats(transport, &targets, cfg.rpc_batch_size).await;

        let mut crawled: Vec<Crawled> = targets
            .iter()
            .zip(outcomes)
            .map(|((ip, _), outcome)| {
                let answer = outcome.into_parts();
                let answered_port = answer.as_ref().map(|(_, port)| *port);
                let meta = metadata.get(ip);
                Crawled {
                    record: assemble_record(ip, answer, meta, discovery.hints.get(ip), known.get(ip), now),
                    answered_port,
                    has_gossip_metadata: meta.is_some(),
                    disposition: Disposition::Keep(NodeStatus::Online),
                }
            })
            .collect();

        report.crawled = crawled.iter().filter(|c| c.answered_port.is_some()).count();
        let failures = crawled.len() - report.crawled;
        self.metrics.add_rpc_failures(failures as u64);
        info!(
            "📡 Stats collected: {}/{} nodes answered ({} unreachable)",
            report.crawled,
            crawled.len(),
            failures
        );

        // === GEOLOCATION ===
        self.enter(CrawlPhase::Geolocation);
        self.locate(&mut crawled, &mut report).await;

        let registry = self.registry.read().await;

        // === CLASSIFICATION ===
        self.enter(CrawlPhase::Classification);
        self.classify(&mut crawled, &registry).await;

        // === SCORING ===
        self.enter(CrawlPhase::Scoring);
        for item in crawled.iter_mut() {
            let record = &mut item.record;

            record.credits = record
                .pubkey
                .as_deref()
                .and_then(|pk| registry.credits(pk))
                .unwrap_or(0.0);

            let confidence = score_confidence(
                &ConfidenceInput::from_record(record, item.has_gossip_metadata),
                &registry,
                &cfg.confidence,
            );
            record.confidence_score = confidence.score;
            record.confidence_level = confidence.level;
            record.sources = confidence.sources;
            debug!(
                "{} scored {} ({})",
                record.ip,
                record.confidence_score,
                record.confidence_level.as_str()
            );

            record.performance_score = performance_score(record);
            record.health = health_status(Some(&*record), &cfg.health);

            let liveness = Liveness {
                failed_checks: record.failed_checks,
                has_gossip_metadata: item.has_gossip_metadata,
                uptime: record.stats.uptime,
                in_gossip_set: gossip_set.contains(record.ip.as_str()),
            };
            item.disposition = disposition(&liveness, record.pubkey.as_deref(), &registry, &cfg.zombie);
            if let Disposition::Keep(status) = item.disposition {
                record.status = status;
            }
        }

        // === DEDUPLICATION ===
        self.enter(CrawlPhase::Deduplication);
        let before = crawled.len();
        let crawled = deduplicate(crawled, |c| c.record.ip.as_str(), |c| c.record.stats.storage_committed);
        if crawled.len() < before {
            debug!("Deduplication dropped {} records", before - crawled.len());
        }

        // === PERSISTENCE ===
        self.enter(CrawlPhase::Persistence);
        let to_write: Vec<NodeRecord> = crawled
            .iter()
            .filter(|c| c.disposition != Disposition::Delete)
            .map(|c| c.record.clone())
            .collect();
        match self.store.upsert_nodes(&to_write) {
            Ok(written) => report.nodes_written = written,
            Err(e) => self.persist_failed(&mut report, PersistTable::Nodes, e),
        }

        let samples: Vec<HistorySample> = crawled
            .iter()
            .map(|c| HistorySample::from_record(&c.record, now))
            .collect();
        match self.store.insert_history(&samples) {
            Ok(written) => report.history_written = written,
            Err(e) => self.persist_failed(&mut report, PersistTable::History, e),
        }

        // === ZOMBIE_SWEEP ===
        self.enter(CrawlPhase::ZombieSweep);
        let mut summary: Vec<NodeRecord> = Vec::with_capacity(crawled.len());
        for item in crawled {
            if item.disposition == Disposition::Delete {
                if known.contains_key(&item.record.ip) {
                    match self.store.delete_node(&item.record.ip) {
                        Ok(()) => report.deleted += 1,
                        Err(e) => self.persist_failed(&mut report, PersistTable::Nodes, e),
                    }
                }
                continue;
            }
            summary.push(item.record);
        }

        let seen: HashSet<&str> = discovery.nodes.iter().map(String::as_str).collect();
        let unseen: Vec<&NodeRecord> = known.values().filter(|k| !seen.contains(k.ip.as_str())).collect();
        report.unseen = unseen.len();

        for previous in unseen {
            if let Some(record) = self.sweep_unseen(previous, &registry, &mut report) {
                summary.push(record);
            }
        }
        drop(registry);

        for record in &summary {
            match record.status {
                NodeStatus::Online => report.online += 1,
                NodeStatus::Stale => report.stale += 1,
                NodeStatus::RegistryOnly => report.registry_only += 1,
            }
        }

        // Written last so the counts cover swept nodes
        let network = self
            .network_state
            .write()
            .await
            .update(&summary, report.discovered, report.crawled, now);
        if let Err(e) = self.store.upsert_metadata(&network) {
            self.persist_failed(&mut report, PersistTable::Metadata, e);
        }

        self.phase.store(0, Ordering::Relaxed);
        report.duration_ms = started.elapsed().as_millis() as u64;

        self.metrics.record_cycle(
            report.duration_ms,
            Utc::now().timestamp().max(0) as u64,
            report.discovered,
            report.crawled,
            report.online,
            report.stale,
        );

        info!(
            "✅ Crawl cycle finished in {}ms: {} discovered, {} crawled, {} online, {} stale, {} registry-only, {} deleted",
            report.duration_ms,
            report.discovered,
            report.crawled,
            report.online,
            report.stale,
            report.registry_only,
            report.deleted
        );
        if !report.persistence_errors.is_empty() {
            warn!("Cycle finished with {} persistence failures", report.persistence_errors.len());
        }

        report
    }

    /// Resolve locations for records without a cached one
    ///
    /// Cached records bypass the limiter; new lookups go through it one at a
    /// time, capped per cycle.
    async fn locate(&self, crawled: &mut [Crawled], report: &mut CycleReport) {
        let mut pending: Vec<usize> = Vec::new();

        for (i, item) in crawled.iter().enumerate() {
            if item.record.geo.is_some() {
                report.geo_cache_hits += 1;
            } else if item
                .record
                .ip
                .parse::<IpAddr>()
                .map(|addr| !is_reserved_ip(&addr))
                .unwrap_or(false)
            {
                pending.push(i);
            }
        }

        let cap = self.config.geo_max_lookups_per_cycle;
        if pending.len() > cap {
            debug!("Deferring {} geolocation lookups to later cycles", pending.len() - cap);
            pending.truncate(cap);
        }

        let mut resolved = 0usize;
        for i in pending {
            self.geo_limiter.acquire().await;
            report.geo_lookups += 1;
            if let Some(location) = self.geo.resolve(&crawled[i].record.ip).await {
                crawled[i].record.geo = Some(location);
                resolved += 1;
            }
        }

        self.metrics.add_geo_lookups(report.geo_lookups as u64);
        self.metrics.add_geo_cache_hits(report.geo_cache_hits as u64);
        debug!(
            "Geolocation: {} cached, {} looked up, {} resolved",
            report.geo_cache_hits, report.geo_lookups, resolved
        );
    }

    /// Decide sub-network membership in batches
    ///
    /// Only nodes that answered `get-stats` are probed, on the port that answered.
    async fn classify(&self, crawled: &mut [Crawled], registry: &OfficialRegistry) {
        let classifier = NetworkClassifier::new(registry, &self.config.classifier);
        let classifier = &classifier;
        let probe = self.config.enable_network_probe;

        for chunk in crawled.chunks_mut(self.config.rpc_batch_size.max(1)) {
            let verdicts = join_all(chunk.iter().map(|item| {
                let record = &item.record;
                let input = ClassificationInput {
                    ip: &record.ip,
                    pubkey: record.pubkey.as_deref(),
                    gossip_port: record.gossip_port,
                    version: record.version.as_deref(),
                    uptime: record.stats.uptime,
                    storage_committed: record.stats.storage_committed,
                };
                let ports: Vec<u16> = item.answered_port.into_iter().collect();
                let transport = if probe && !ports.is_empty() {
                    Some(self.transport.as_ref())
                } else {
                    None
                };
                async move { classifier.classify(&input, transport, &ports).await }
            }))
            .await;

            for (item, verdict) in chunk.iter_mut().zip(verdicts) {
                debug!(
                    "{} classified {:?}/{:?} by {:?}",
                    item.record.ip, verdict.network, verdict.confidence, verdict.method
                );
                item.record.network = verdict.network;
                item.record.network_confidence = verdict.confidence;
            }
        }
    }

    /// Bump a missing node's counter and apply the stale rule to it
    fn sweep_unseen(
        &self,
        previous: &NodeRecord,
        registry: &OfficialRegistry,
        report: &mut CycleReport,
    ) -> Option<NodeRecord> {
        let failed_checks = match self.store.increment_failed_checks(&previous.ip) {
            Ok(Some(count)) => count,
            Ok(None) => return None,
            Err(e) => {
                self.persist_failed(report, PersistTable::Nodes, e);
                return Some(previous.clone());
            }
        };

        let liveness = Liveness {
            failed_checks,
            has_gossip_metadata: false,
            uptime: previous.stats.uptime,
            in_gossip_set: false,
        };

        match disposition(&liveness, previous.pubkey.as_deref(), registry, &self.config.zombie) {
            Disposition::Keep(status) => {
                if status != previous.status {
                    if let Err(e) = self.store.set_status(&previous.ip, status) {
                        self.persist_failed(report, PersistTable::Nodes, e);
                    } else {
                        debug!("{} marked {} after {} missed cycles", previous.ip, status.as_str(), failed_checks);
                    }
                }
                let mut record = previous.clone();
                record.failed_checks = failed_checks;
                record.status = status;
                Some(record)
            }
            Disposition::Delete => {
                match self.store.delete_node(&previous.ip) {
                    Ok(()) => {
                        report.deleted += 1;
                        debug!("{} deleted after {} missed cycles", previous.ip, failed_checks);
                    }
                    Err(e) => self.persist_failed(report, PersistTable::Nodes, e),
                }
                None
            }
        }
    }

    fn persist_failed(&self, report: &mut CycleReport, table: PersistTable, error: StoreError) {
        warn!("Persistence failure on {:?} table: {}", table, error);
        self.metrics.inc_persistence_failures();
        report.persistence_errors.push((table, error.to_string()));
    }
}

/// Build a record from everything known about `ip` this cycle
///
/// Identity, version and ports fall back from gossip metadata to peer hints
/// to the previously stored record. The stored location is carried over.
fn assemble_record(
    ip: &str,
    answer: Option<(StatsResult, u16)>,
    meta: Option<&PodMetadata>,
    hint: Option<&PeerHint>,
    previous: Option<&NodeRecord>,
    now: DateTime<Utc>,
) -> NodeRecord {
    let mut record = NodeRecord::new(ip, now);
    let (rpc, port) = match answer {
        Some((stats, port)) => (Some(stats), Some(port)),
        None => (None, None),
    };

    record.stats = merge_stats(meta, rpc.as_ref());

    record.pubkey = meta
        .and_then(|m| m.pubkey.clone())
        .or_else(|| hint.and_then(|h| h.pubkey.clone()))
        .or_else(|| previous.and_then(|p| p.pubkey.clone()));
    record.version = meta
        .and_then(|m| m.version.clone())
        .or_else(|| hint.and_then(|h| h.version.clone()))
        .or_else(|| previous.and_then(|p| p.version.clone()));
    record.rpc_port = port
        .or_else(|| meta.and_then(|m| m.rpc_port))
        .or_else(|| hint.and_then(|h| h.rpc_port))
        .or_else(|| previous.and_then(|p| p.rpc_port));
    record.gossip_port = meta
        .and_then(|m| m.gossip_port)
        .or_else(|| hint.and_then(|h| h.gossip_port))
        .or_else(|| previous.and_then(|p| p.gossip_port));

    let visibility = meta
        .and_then(|m| m.is_public)
        .or_else(|| hint.and_then(|h| h.is_public));
    record.node_type = match visibility {
        Some(_) => NodeType::from_visibility(visibility),
        None => previous.map(|p| p.node_type).unwrap_or(NodeType::Unknown),
    };

    record.geo = previous.and_then(|p| p.geo.clone());
    record.last_seen_gossip = meta
        .filter(|m| m.last_seen_timestamp > 0)
        .and_then(|m| Utc.timestamp_opt(m.last_seen_timestamp as i64, 0).single())
        .or_else(|| previous.and_then(|p| p.last_seen_gossip));

    record.failed_checks = if port.is_some() {
        0
    } else {
        previous.map(|p| p.failed_checks).unwrap_or(0).saturating_add(1)
    };

    record
}

/// One entry per IP, keeping the one with the larger committed storage
///
/// First-seen order is preserved.
pub fn deduplicate<T>(items: Vec<T>, ip: impl Fn(&T) -> &str, committed: impl Fn(&T) -> u64) -> Vec<T> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<T> = Vec::with_capacity(items.len());

    for item in items {
        let key = ip(&item).to_string();
        match index.get(&key) {
            Some(&i) => {
                if committed(&item) > committed(&out[i]) {
                    out[i] = item;
                }
            }
            None => {
                index.insert(key, out.len());
                out.push(item);
            }
        }
    }

    out
}

/// Periodic crawl scheduler
///
/// The first cycle starts immediately. A tick that lands while a cycle is
/// still running (e.g. one triggered over the API) is skipped.
pub async fn run_periodic(crawler: Arc<Crawler>, interval_secs: u64) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        match crawler.run_cycle().await {
            Ok(report) => debug!("Scheduled cycle took {}ms", report.duration_ms),
            Err(CrawlError::CycleInProgress) => {
                warn!("Skipping scheduled crawl, previous cycle still running");
            }
        }
    }
}
