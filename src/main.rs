//! pNode Network Crawler
//!
//! Discovers every storage node reachable from a few bootstrap seeds,
//! enriches and classifies them, and persists the result for dashboards.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     PNODE CRAWLER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scheduler               ←── One crawl cycle per interval   │
//! │  Peer RPC / gossip       ←── Discovery, metadata, stats     │
//! │  Official registry       ←── MAINNET / DEVNET ground truth  │
//! │  Geolocation             ←── Rate-limited, cached per IP    │
//! │  Node store (RocksDB)    ←── Nodes, history, network meta   │
//! │  HTTP API (8080)         ←── Results, metrics, trigger      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

mod api;
mod config;
mod crawler;
mod geo;
mod network_state;
mod registry;
mod rpc;
mod scoring;
mod store;
mod types;

use api::Metrics;
use config::CrawlerConfig;
use crawler::Crawler;
use geo::GeoResolver;
use registry::HttpRegistrySource;
use rpc::RpcClient;
use store::{NodeStore, RocksNodeStore};

/// pNode Crawler - storage network discovery and classification
#[derive(Parser, Debug)]
#[command(name = "pnode-crawler")]
#[command(version)]
#[command(about = "Crawls the pNode storage network and classifies its nodes", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "crawler.toml")]
    config: PathBuf,

    /// Data directory for the node store
    #[arg(short, long, default_value = "./data")]
    data_dir: PathBuf,

    /// HTTP API port
    #[arg(long)]
    api_port: Option<u16>,

    /// Seconds between crawl cycles
    #[arg(long)]
    interval: Option<u64>,

    /// Bootstrap seed IP, repeatable
    #[arg(long = "seed")]
    seeds: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Do not start the HTTP API
    #[arg(long)]
    no_api: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .init();

    info!("🌐 pNode Crawler v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = if args.config.exists() {
        CrawlerConfig::load(&args.config)?
    } else {
        warn!("Config file {:?} not found, using defaults", args.config);
        CrawlerConfig::default()
    };

    // Override config with CLI args
    let config = config
        .with_api_port(args.api_port)
        .with_crawl_interval(args.interval)
        .with_seeds(args.seeds);

    config.validate()?;

    info!("⚙️  Configuration:");
    info!("   Seeds: {}", config.bootstrap_seeds.join(", "));
    info!("   RPC ports: {:?}", config.default_rpc_ports());
    info!("   Crawl interval: {}s", config.crawl_interval_secs);
    info!("   Max nodes: {}", config.max_nodes);
    info!("   Network probe: {}", config.enable_network_probe);

    let shared_config = Arc::new(config);

    // Open node store
    tokio::fs::create_dir_all(&args.data_dir).await?;
    let store_path = args.data_dir.join("crawler_db");
    let store = Arc::new(RocksNodeStore::open(&store_path)?);
    info!("📦 Node store opened at {:?}", store_path);

    let transport = Arc::new(RpcClient::new(shared_config.rpc_timeout(), shared_config.gossip_port)?);
    let geo = GeoResolver::with_default_providers(shared_config.geo_timeout())?;
    let registry_source = Arc::new(HttpRegistrySource::new(
        shared_config.mainnet_registry_url.clone(),
        shared_config.devnet_registry_url.clone(),
        shared_config.registry_timeout(),
    )?);

    let metrics = Arc::new(Metrics::new());

    let crawler = Arc::new(Crawler::new(
        shared_config.clone(),
        transport,
        geo,
        registry_source,
        store.clone(),
        metrics.clone(),
    ));

    if args.once {
        let report = crawler.run_cycle().await?;
        store.flush()?;
        info!(
            "👋 Single cycle done: {} discovered, {} crawled, {} persistence failures",
            report.discovered,
            report.crawled,
            report.persistence_errors.len()
        );
        return Ok(());
    }

    let scheduler_handle = tokio::spawn(crawler::run_periodic(
        crawler.clone(),
        shared_config.crawl_interval_secs,
    ));

    let api_handle = tokio::spawn({
        let config = shared_config.clone();
        let crawler = crawler.clone();
        let metrics = metrics.clone();
        let enabled = !args.no_api;
        async move {
            if enabled {
                api::run_api_server(config, crawler, metrics).await
            } else {
                std::future::pending::<anyhow::Result<()>>().await
            }
        }
    });

    info!("✅ All services started");
    info!("   Press Ctrl+C to shutdown gracefully");

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Shutdown signal received");
        }
        result = scheduler_handle => {
            error!("Crawl scheduler exited: {:?}", result);
        }
        result = api_handle => {
            error!("HTTP API exited: {:?}", result);
        }
    }

    // Graceful shutdown: flush store
    store.flush()?;
    info!("📦 Node store flushed to disk");

    info!("👋 pNode Crawler shutting down");
    Ok(())
}
