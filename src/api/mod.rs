//! HTTP API Module
//!
//! Monitoring endpoints over the crawl results, plus a manual crawl trigger.

mod routes;
mod metrics;

pub use routes::run_api_server;
pub use metrics::Metrics;
