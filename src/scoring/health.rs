//! Health & Performance Scoring
//!
//! Performance is a weighted 0-100 score of CPU, RAM, uptime and packet
//! balance. Health is a five-tier status evaluated top-down:
//! Private, Critical, Warning, Excellent, then Good.

use crate::config::HealthThresholds;
use crate::types::{HealthStatus, NodeRecord, NodeStats};

use super::clamp_score;

const HOUR: u64 = 3600;
const DAY: u64 = 24 * HOUR;

/// Component weights of the performance score
const CPU_WEIGHT: f64 = 0.40;
const RAM_WEIGHT: f64 = 0.25;
const UPTIME_WEIGHT: f64 = 0.20;
const NETWORK_WEIGHT: f64 = 0.15;

/// Performance of a node; private or unseen nodes score 0
pub fn performance_score(record: &NodeRecord) -> u8 {
    if record.stats.uptime == 0 || !record.is_public() {
        return 0;
    }
    performance_from_stats(&record.stats)
}

/// Weighted performance from live metrics alone
pub fn performance_from_stats(stats: &NodeStats) -> u8 {
    let cpu = (100.0 - stats.cpu_percent).clamp(0.0, 100.0);
    let ram = stats
        .ram_percent()
        .map(|pct| (100.0 - pct).clamp(0.0, 100.0))
        .unwrap_or(0.0);
    let uptime = uptime_tier(stats.uptime);
    let network = network_stability(stats.packets_sent, stats.packets_received);

    clamp_score(cpu * CPU_WEIGHT + ram * RAM_WEIGHT + uptime * UPTIME_WEIGHT + network * NETWORK_WEIGHT)
}

fn uptime_tier(uptime_secs: u64) -> f64 {
    match uptime_secs {
        s if s > 30 * DAY => 100.0,
        s if s > 7 * DAY => 75.0,
        s if s > DAY => 50.0,
        s if s > HOUR => 25.0,
        _ => 0.0,
    }
}

/// Packet balance; a healthy node sends and receives at similar rates
fn network_stability(sent: u64, received: u64) -> f64 {
    if received == 0 {
        return 40.0;
    }
    let ratio = sent as f64 / received as f64;
    if (0.5..=2.0).contains(&ratio) {
        100.0
    } else if (1.0 / 3.0..=3.0).contains(&ratio) {
        80.0
    } else if (0.2..=5.0).contains(&ratio) {
        60.0
    } else {
        40.0
    }
}

/// Everything the health tiers look at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthMetrics {
    pub cpu_percent: f64,
    pub ram_percent: f64,
    pub uptime_secs: u64,
    pub storage_percent: f64,
    /// `None` when the score cannot be computed
    pub performance: Option<u8>,
}

impl HealthMetrics {
    pub fn from_record(record: &NodeRecord) -> Self {
        let stats = &record.stats;
        Self {
            cpu_percent: stats.cpu_percent,
            ram_percent: stats.ram_percent().unwrap_or(0.0),
            uptime_secs: stats.uptime,
            storage_percent: stats.storage_percent(),
            performance: Some(performance_score(record)),
        }
    }
}

/// Health of a record; `None` is a node missing from the crawl
pub fn health_status(record: Option<&NodeRecord>, thresholds: &HealthThresholds) -> HealthStatus {
    let record = match record {
        Some(r) => r,
        None => return HealthStatus::Private,
    };

    // Neither CPU nor uptime reported means degenerate stats
    let degenerate = record.stats.cpu_percent <= 0.0 && record.stats.uptime == 0;
    if !record.is_public() || degenerate {
        return HealthStatus::Private;
    }

    health_from_metrics(&HealthMetrics::from_record(record), thresholds)
}

/// Critical, Warning, Excellent or Good from metrics
pub fn health_from_metrics(m: &HealthMetrics, t: &HealthThresholds) -> HealthStatus {
    let uptime_hours = m.uptime_secs as f64 / HOUR as f64;

    let critical = m.uptime_secs < t.critical_uptime_secs
        || m.ram_percent >= t.critical_usage_percent
        || m.storage_percent >= t.critical_usage_percent
        || m.cpu_percent >= t.critical_usage_percent
        || m.performance.map(|p| p < t.critical_performance).unwrap_or(false);
    if critical {
        return HealthStatus::Critical;
    }

    let warning = uptime_hours < t.warning_uptime_hours
        || m.ram_percent >= t.warning_usage_percent
        || m.storage_percent >= t.warning_usage_percent
        || m.cpu_percent >= t.warning_cpu_percent
        || m.performance.map(|p| p < t.warning_performance).unwrap_or(false);
    if warning {
        return HealthStatus::Warning;
    }

    let excellent = m.cpu_percent <= t.excellent_max_cpu
        && uptime_hours >= t.excellent_min_uptime_hours
        && m.ram_percent < t.excellent_max_usage_percent
        && m.storage_percent < t.excellent_max_usage_percent
        && m.performance.map(|p| p >= t.excellent_min_performance).unwrap_or(false);
    if excellent {
        return HealthStatus::Excellent;
    }

    HealthStatus::Good
}
