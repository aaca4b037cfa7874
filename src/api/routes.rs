//! API Routes
//!
//! Read-only JSON views over the persisted crawl results, Prometheus
//! metrics and a manual crawl trigger.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::Metrics;
use crate::config::CrawlerConfig;
use crate::crawler::Crawler;
use crate::types::{Network, NodeStatus};

/// Samples returned with a single node
const HISTORY_LIMIT: usize = 100;

/// Shared API state
pub struct ApiState {
    pub config: Arc<CrawlerConfig>,
    pub crawler: Arc<Crawler>,
    pub metrics: Arc<Metrics>,
}

/// Build the router over shared state
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        // Health & Status
        .route("/health", get(health_check))
        .route("/status", get(get_status))

        // Crawl results
        .route("/nodes", get(list_nodes))
        .route("/nodes/:ip", get(get_node))
        .route("/network", get(get_network_info))

        // Metrics
        .route("/metrics", get(get_metrics_prometheus))
        .route("/metrics/json", get(get_metrics_json))

        // Manual trigger
        .route("/crawl", post(trigger_crawl))

        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_api_server(
    config: Arc<CrawlerConfig>,
    crawler: Arc<Crawler>,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()> {
    let port = config.api_port;
    let app = router(Arc::new(ApiState {
        config,
        crawler,
        metrics,
    }));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("📊 HTTP API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

fn store_failure(e: impl std::fmt::Display) -> Response {
    warn!("API store read failed: {}", e);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "store unavailable")
}

/// GET /health - Simple health check
async fn health_check() -> impl IntoResponse {
    "OK"
}

/// GET /status - Service and cycle status
async fn get_status(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let (network, trend) = state.crawler.network_state().await;
    let phase = state.crawler.current_phase().map(|p| p.as_str());

    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.metrics.uptime_secs(),
        "crawl": {
            "running": state.metrics.is_cycle_running(),
            "phase": phase,
            "interval_secs": state.config.crawl_interval_secs,
        },
        "network": {
            "total": network.network_total,
            "crawled": network.nodes_crawled,
            "active": network.active_count,
            "stale": network.stale_count,
            "last_updated": network.last_updated,
            "size_trend": trend,
        }
    }))
}

#[derive(Debug, Default, Deserialize)]
struct NodeFilter {
    network: Option<String>,
    status: Option<String>,
}

/// GET /nodes - Stored nodes, optionally filtered
async fn list_nodes(State(state): State<Arc<ApiState>>, Query(filter): Query<NodeFilter>) -> Response {
    let network = match filter.network.as_deref() {
        Some(raw) => match Network::parse(raw) {
            Some(n) => Some(n),
            None => return error_response(StatusCode::BAD_REQUEST, format!("unknown network '{}'", raw)),
        },
        None => None,
    };
    let status = match filter.status.as_deref() {
        Some(raw) => match NodeStatus::parse(raw) {
            Some(s) => Some(s),
            None => return error_response(StatusCode::BAD_REQUEST, format!("unknown status '{}'", raw)),
        },
        None => None,
    };

    let mut nodes = match state.crawler.store().list_nodes() {
        Ok(nodes) => nodes,
        Err(e) => return store_failure(e),
    };
    nodes.retain(|n| network.map_or(true, |want| n.network == want) && status.map_or(true, |want| n.status == want));
    nodes.sort_by(|a, b| a.ip.cmp(&b.ip));

    Json(serde_json::json!({
        "count": nodes.len(),
        "nodes": nodes,
    }))
    .into_response()
}

/// GET /nodes/:ip - One node with its recent history
async fn get_node(State(state): State<Arc<ApiState>>, Path(ip): Path<String>) -> Response {
    let store = state.crawler.store();

    let node = match store.get_node(&ip) {
        Ok(Some(node)) => node,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, format!("node {} not found", ip)),
        Err(e) => return store_failure(e),
    };
    let history = match store.history_for(&ip, HISTORY_LIMIT) {
        Ok(history) => history,
        Err(e) => return store_failure(e),
    };

    Json(serde_json::json!({
        "node": node,
        "history": history,
    }))
    .into_response()
}

/// GET /network - Network metadata singleton
async fn get_network_info(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let (network, trend) = state.crawler.network_state().await;

    Json(serde_json::json!({
        "network_total": network.network_total,
        "nodes_crawled": network.nodes_crawled,
        "active_count": network.active_count,
        "stale_count": network.stale_count,
        "mainnet_count": network.mainnet_count,
        "devnet_count": network.devnet_count,
        "unknown_count": network.unknown_count,
        "total_storage_committed": network.total_storage_committed,
        "total_credits": network.total_credits,
        "last_updated": network.last_updated,
        "size_trend": trend,
    }))
}

/// GET /metrics - Prometheus format metrics
async fn get_metrics_prometheus(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.metrics.to_prometheus(),
    )
}

/// GET /metrics/json - JSON format metrics
async fn get_metrics_json(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.metrics.to_json())
}

/// POST /crawl - Start a cycle in the background
async fn trigger_crawl(State(state): State<Arc<ApiState>>) -> Response {
    let Some(guard) = state.crawler.try_begin() else {
        return error_response(StatusCode::CONFLICT, "a crawl cycle is already running");
    };

    info!("🔁 Manual crawl triggered over the API");
    let crawler = state.crawler.clone();
    tokio::spawn(async move {
        crawler.run_with(guard).await;
    });

    (StatusCode::ACCEPTED, Json(serde_json::json!({ "started": true }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::tests::{harness, test_config, test_network, Harness};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(h: &Harness) -> Router {
        router(Arc::new(ApiState {
            config: Arc::new(test_config()),
            crawler: h.crawler.clone(),
            metrics: h.crawler.metrics().clone(),
        }))
    }

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(test_network(), test_config());
        let response = app(&h)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_nodes_and_filters() {
        let h = harness(test_network(), test_config());
        h.crawler.run_cycle().await.unwrap();

        let (status, body) = call(app(&h), "GET", "/nodes").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
        assert_eq!(body["nodes"][0]["ip"], "11.0.0.1");

        let (_, body) = call(app(&h), "GET", "/nodes?network=mainnet").await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["nodes"][0]["network"], "MAINNET");
        assert_eq!(body["nodes"][0]["confidence_level"], "confirmed");

        let (_, body) = call(app(&h), "GET", "/nodes?status=stale").await;
        assert_eq!(body["count"], 0);

        let (status, _) = call(app(&h), "GET", "/nodes?network=moon").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_node_detail() {
        let h = harness(test_network(), test_config());
        h.crawler.run_cycle().await.unwrap();

        let (status, body) = call(app(&h), "GET", "/nodes/11.0.0.2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["node"]["pubkey"], "dev-key");
        assert_eq!(body["history"].as_array().map(Vec::len), Some(1));

        let (status, _) = call(app(&h), "GET", "/nodes/10.9.9.9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_network_summary() {
        let h = harness(test_network(), test_config());
        h.crawler.run_cycle().await.unwrap();

        let (_, body) = call(app(&h), "GET", "/network").await;
        assert_eq!(body["network_total"], 3);
        assert_eq!(body["mainnet_count"], 1);
    }

    #[tokio::test]
    async fn test_crawl_trigger_conflict() {
        let h = harness(test_network(), test_config());

        let guard = h.crawler.try_begin().unwrap();
        let (status, _) = call(app(&h), "POST", "/crawl").await;
        assert_eq!(status, StatusCode::CONFLICT);
        drop(guard);

        let (status, body) = call(app(&h), "POST", "/crawl").await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["started"], true);
    }

    #[tokio::test]
    async fn test_prometheus_content_type() {
        let h = harness(test_network(), test_config());
        let response = app(&h)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }
}
