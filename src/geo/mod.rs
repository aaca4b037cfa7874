//! Geolocation Module
//!
//! Resolves an IP to a location through a primary/secondary provider chain.
//! The resolver holds no cache: the orchestrator checks persisted records first
//! and sends only unknown IPs here, through `GeoRateLimiter`.

mod providers;
mod rate_limiter;

pub use providers::{IpApiProvider, IpWhoIsProvider};
pub use rate_limiter::GeoRateLimiter;

use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::GeoLocation;

/// Failure of a single provider lookup
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("provider rate limit reached")]
    RateLimited,

    #[error("http error: {0}")]
    Http(String),

    #[error("lookup failed: {0}")]
    Lookup(String),
}

impl From<reqwest::Error> for GeoError {
    fn from(e: reqwest::Error) -> Self {
        GeoError::Http(e.to_string())
    }
}

/// An IP lookup API
#[async_trait]
pub trait GeoProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn lookup(&self, ip: IpAddr) -> Result<GeoLocation, GeoError>;
}

/// Provider chain, first success wins
pub struct GeoResolver {
    providers: Vec<Arc<dyn GeoProvider>>,
}

impl GeoResolver {
    pub fn new(providers: Vec<Arc<dyn GeoProvider>>) -> Self {
        Self { providers }
    }

    /// ipwho.is first, ip-api.com as fallback
    pub fn with_default_providers(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::new(vec![
            Arc::new(IpWhoIsProvider::new(client.clone())),
            Arc::new(IpApiProvider::new(client)),
        ]))
    }

    /// Resolve `ip`, or `None` for reserved ranges and total failure
    pub async fn resolve(&self, ip: &str) -> Option<GeoLocation> {
        let addr: IpAddr = ip.parse().ok()?;
        if is_reserved_ip(&addr) {
            return None;
        }

        for provider in &self.providers {
            match provider.lookup(addr).await {
                Ok(location) => return Some(location),
                Err(GeoError::RateLimited) => {
                    warn!("Geolocation provider {} rate limited, trying next", provider.name());
                }
                Err(e) => {
                    debug!("Geolocation via {} failed for {}: {}", provider.name(), ip, e);
                }
            }
        }

        None
    }
}

/// Private, loopback, link-local and otherwise non-routable ranges
pub fn is_reserved_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.is_unspecified()
                || v4.is_multicast()
                || a == 0
                || (a == 100 && (64..=127).contains(&b)) // CGNAT 100.64/10
                || (a == 198 && (b == 18 || b == 19))    // benchmarking 198.18/15
                || a >= 240
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_reserved_ip(&IpAddr::V4(v4));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || (first & 0xfe00) == 0xfc00 // unique local fc00::/7
                || (first & 0xffc0) == 0xfe80 // link-local fe80::/10
                || (first == 0x2001 && v6.segments()[1] == 0x0db8) // documentation
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProvider {
        result: fn() -> Result<GeoLocation, GeoError>,
        calls: AtomicUsize,
    }

    impl FixedProvider {
        fn new(result: fn() -> Result<GeoLocation, GeoError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl GeoProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn lookup(&self, _ip: IpAddr) -> Result<GeoLocation, GeoError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn berlin() -> Result<GeoLocation, GeoError> {
        Ok(GeoLocation {
            lat: 52.52,
            lng: 13.40,
            city: "Berlin".to_string(),
            country: "Germany".to_string(),
            country_code: "DE".to_string(),
        })
    }

    #[test]
    fn test_reserved_ranges() {
        for ip in ["10.0.0.1", "192.168.1.1", "172.16.0.1", "127.0.0.1", "100.64.0.1", "169.254.1.1", "0.1.2.3", "::1", "fd00::1", "fe80::1"] {
            assert!(is_reserved_ip(&ip.parse().unwrap()), "{} should be reserved", ip);
        }
        for ip in ["8.8.8.8", "173.212.203.145", "2a01:4f8::1"] {
            assert!(!is_reserved_ip(&ip.parse().unwrap()), "{} should be public", ip);
        }
    }

    #[tokio::test]
    async fn test_private_ip_skips_providers() {
        let primary = FixedProvider::new(berlin);
        let resolver = GeoResolver::new(vec![primary.clone()]);

        assert!(resolver.resolve("192.168.1.10").await.is_none());
        assert!(resolver.resolve("garbage").await.is_none());
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rate_limited_primary_falls_back() {
        let primary = FixedProvider::new(|| Err(GeoError::RateLimited));
        let secondary = FixedProvider::new(berlin);
        let resolver = GeoResolver::new(vec![primary.clone(), secondary.clone()]);

        let location = resolver.resolve("8.8.8.8").await.unwrap();
        assert_eq!(location.country_code, "DE");
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_providers_failing() {
        let primary = FixedProvider::new(|| Err(GeoError::Http("timeout".to_string())));
        let secondary = FixedProvider::new(|| Err(GeoError::Lookup("fail".to_string())));
        let resolver = GeoResolver::new(vec![primary, secondary]);

        assert!(resolver.resolve("8.8.8.8").await.is_none());
    }

    #[tokio::test]
    async fn test_primary_success_skips_secondary() {
        let primary = FixedProvider::new(berlin);
        let secondary = FixedProvider::new(berlin);
        let resolver = GeoResolver::new(vec![primary, secondary.clone()]);

        assert!(resolver.resolve("8.8.8.8").await.is_some());
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
    }
}
