//! HTTP registry source
//!
//! `GET {url}` → `{ "pods_credits": [{ "pod_id": ..., "credits": ... }] }`

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{PodCredit, RegistryError, RegistrySource};
use crate::types::Network;

#[derive(Debug, Deserialize)]
struct PodsCreditsResponse {
    #[serde(default)]
    pods_credits: Vec<PodCredit>,
}

/// Fetches the official lists over HTTP
pub struct HttpRegistrySource {
    client: reqwest::Client,
    mainnet_url: String,
    devnet_url: String,
}

impl HttpRegistrySource {
    pub fn new(mainnet_url: String, devnet_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            mainnet_url,
            devnet_url,
        })
    }
}

#[async_trait]
impl RegistrySource for HttpRegistrySource {
    async fn fetch(&self, network: Network) -> Result<Vec<PodCredit>, RegistryError> {
        let url = match network {
            Network::Mainnet => &self.mainnet_url,
            Network::Devnet => &self.devnet_url,
            Network::Unknown => return Err(RegistryError::NoEndpoint("UNKNOWN")),
        };

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(RegistryError::Status(response.status().as_u16()));
        }

        let body: PodsCreditsResponse = response.json().await?;
        debug!("Fetched {} {} registry entries", body.pods_credits.len(), network.as_str());

        Ok(body.pods_credits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_network_has_no_endpoint() {
        let source = HttpRegistrySource::new(
            "http://192.0.2.1/mainnet".to_string(),
            "http://192.0.2.1/devnet".to_string(),
            Duration::from_millis(100),
        )
        .unwrap();

        let result = source.fetch(Network::Unknown).await;
        assert!(matches!(result, Err(RegistryError::NoEndpoint(_))));
    }
}
