//! Network Classifier
//!
//! Decides MAINNET / DEVNET membership, first match wins:
//!
//! 1. Official registry (ground truth)
//! 2. `get-version` probe, matched on cluster markers
//! 3. Weighted pattern scoring, for nodes without an identity only
//! 4. DEVNET / medium for identified nodes nothing else recognizes

use crate::config::ClassifierWeights;
use crate::registry::OfficialRegistry;
use crate::rpc::PeerTransport;
use crate::types::{Network, NetworkConfidence};

/// Substrings marking a non-production build or cluster
const DEV_MARKERS: [&str; 3] = ["dev", "test", "try"];
const DEVNET_CLUSTER_MARKERS: [&str; 3] = ["devnet", "testnet", "trynet"];
const MAINNET_CLUSTER_MARKER: &str = "mainnet";

/// What the classifier looks at
#[derive(Debug, Clone, Default)]
pub struct ClassificationInput<'a> {
    pub ip: &'a str,
    pub pubkey: Option<&'a str>,
    /// Port of the advertised gossip address
    pub gossip_port: Option<u16>,
    pub version: Option<&'a str>,
    pub uptime: u64,
    pub storage_committed: u64,
}

/// How a verdict was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationMethod {
    Registry,
    Probe,
    Pattern,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub network: Network,
    pub confidence: NetworkConfidence,
    pub method: ClassificationMethod,
}

impl Classification {
    fn new(network: Network, confidence: NetworkConfidence, method: ClassificationMethod) -> Self {
        Self {
            network,
            confidence,
            method,
        }
    }
}

/// Indicator totals of the pattern scorer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternScore {
    pub mainnet: u32,
    pub devnet: u32,
}

/// Classifier bound to the cycle's registry and weights
pub struct NetworkClassifier<'a> {
    registry: &'a OfficialRegistry,
    weights: &'a ClassifierWeights,
}

impl<'a> NetworkClassifier<'a> {
    pub fn new(registry: &'a OfficialRegistry, weights: &'a ClassifierWeights) -> Self {
        Self { registry, weights }
    }

    /// Full classification, probing the node when the registry cannot decide
    pub async fn classify(
        &self,
        input: &ClassificationInput<'_>,
        transport: Option<&dyn PeerTransport>,
        ports: &[u16],
    ) -> Classification {
        if let Some(verdict) = self.classify_by_registry(input.pubkey) {
            return verdict;
        }

        let probe_text = match transport {
            Some(transport) => transport
                .get_version(input.ip, ports)
                .await
                .ok()
                .map(|v| v.marker_text()),
            None => None,
        };

        self.decide(input, probe_text.as_deref())
    }

    /// Classification given an already-obtained probe answer
    pub fn decide(&self, input: &ClassificationInput<'_>, probe_text: Option<&str>) -> Classification {
        if let Some(verdict) = self.classify_by_registry(input.pubkey) {
            return verdict;
        }

        if let Some(network) = probe_text.and_then(network_from_marker) {
            return Classification::new(network, NetworkConfidence::High, ClassificationMethod::Probe);
        }

        if input.pubkey.is_none() {
            return self.classify_by_patterns(input);
        }

        Classification::new(Network::Devnet, NetworkConfidence::Medium, ClassificationMethod::Default)
    }

    /// Step 1: registry membership
    ///
    /// A loaded MAINNET list is treated as exhaustive, so absence from it
    /// means DEVNET.
    pub fn classify_by_registry(&self, pubkey: Option<&str>) -> Option<Classification> {
        let pubkey = pubkey?;

        if self.registry.is_mainnet(pubkey) {
            return Some(Classification::new(Network::Mainnet, NetworkConfidence::High, ClassificationMethod::Registry));
        }
        if self.registry.is_devnet(pubkey) || self.registry.has_mainnet_list() {
            return Some(Classification::new(Network::Devnet, NetworkConfidence::High, ClassificationMethod::Registry));
        }
        None
    }

    /// Step 3: weighted indicators for anonymous nodes
    pub fn classify_by_patterns(&self, input: &ClassificationInput<'_>) -> Classification {
        let w = self.weights;
        let score = self.score_patterns(input);

        let (network, total) = if score.mainnet > score.devnet && score.mainnet >= w.mainnet_threshold {
            (Network::Mainnet, score.mainnet)
        } else if score.devnet > score.mainnet && score.devnet >= w.devnet_threshold {
            (Network::Devnet, score.devnet)
        } else {
            return Classification::new(Network::Devnet, NetworkConfidence::Low, ClassificationMethod::Pattern);
        };

        let confidence = if total >= w.high_confidence_total {
            NetworkConfidence::High
        } else {
            NetworkConfidence::Medium
        };
        Classification::new(network, confidence, ClassificationMethod::Pattern)
    }

    /// Accumulate indicator weights for both sides
    pub fn score_patterns(&self, input: &ClassificationInput<'_>) -> PatternScore {
        let w = self.weights;
        let mut score = PatternScore::default();

        match input.gossip_port {
            Some(port) if port == w.mainnet_port => score.mainnet += w.mainnet_port_weight,
            Some(_) => score.devnet += w.other_port_weight,
            None => {}
        }

        if let Some(version) = input.version {
            if has_dev_marker(version) {
                score.devnet += w.dev_version_weight;
            } else if parse_version(version).is_some() {
                score.mainnet += w.clean_version_weight;
            }
        }

        if input.uptime > w.long_uptime_secs {
            score.mainnet += w.long_uptime_weight;
        } else if input.uptime > 0 && input.uptime < w.short_uptime_secs {
            score.devnet += w.short_uptime_weight;
        }

        if let Some(&(_, weight)) = w
            .storage_tiers
            .iter()
            .find(|(min, _)| input.storage_committed >= *min)
        {
            score.mainnet += weight;
        } else if input.storage_committed > 0 && input.storage_committed < w.small_storage_bytes {
            score.devnet += w.small_storage_weight;
        }

        score
    }
}

/// Network named by a self-reported cluster or version string
pub fn network_from_marker(text: &str) -> Option<Network> {
    let lower = text.to_ascii_lowercase();
    if lower.contains(MAINNET_CLUSTER_MARKER) {
        return Some(Network::Mainnet);
    }
    if DEVNET_CLUSTER_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(Network::Devnet);
    }
    None
}

/// Whether a version string names a dev/test/try build
pub fn has_dev_marker(version: &str) -> bool {
    let lower = version.to_ascii_lowercase();
    DEV_MARKERS.iter().any(|m| lower.contains(m))
}

/// Parse `[v]MAJOR.MINOR[.PATCH][suffix]` into numeric parts
pub fn parse_version(version: &str) -> Option<(u32, u32, u32)> {
    let trimmed = version.trim().trim_start_matches(|c| c == 'v' || c == 'V');
    let numeric: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut parts = numeric.split('.').filter(|p| !p.is_empty());
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    Some((major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::credit;
    use crate::rpc::protocol::{GossipResponse, PodsResult, StatsResult, VersionResult};
    use crate::rpc::RpcOutcome;
    use async_trait::async_trait;
    use std::time::Duration;

    const TB: u64 = 1_000_000_000_000;

    fn empty_registry() -> OfficialRegistry {
        OfficialRegistry::from_lists(vec![], vec![], Duration::from_secs(3600))
    }

    fn loaded_registry() -> OfficialRegistry {
        OfficialRegistry::from_lists(
            vec![credit("main-key", 100.0)],
            vec![credit("dev-key", 10.0)],
            Duration::from_secs(3600),
        )
    }

    /// Answers `get-version` with a fixed string
    struct VersionOnly(Option<&'static str>);

    #[async_trait]
    impl PeerTransport for VersionOnly {
        async fn gossip_peers(&self, _ip: &str) -> RpcOutcome<GossipResponse> {
            RpcOutcome::Unreachable
        }
        async fn get_pods(&self, _ip: &str, _ports: &[u16]) -> RpcOutcome<PodsResult> {
            RpcOutcome::Unreachable
        }
        async fn get_pods_with_stats(&self, _ip: &str, _ports: &[u16]) -> RpcOutcome<PodsResult> {
            RpcOutcome::Unreachable
        }
        async fn get_stats(&self, _ip: &str, _ports: &[u16]) -> RpcOutcome<StatsResult> {
            RpcOutcome::Unreachable
        }
        async fn get_version(&self, _ip: &str, _ports: &[u16]) -> RpcOutcome<VersionResult> {
            match self.0 {
                Some(v) => RpcOutcome::Ok {
                    payload: VersionResult {
                        version: Some(v.to_string()),
                        cluster: None,
                    },
                    port: 6000,
                },
                None => RpcOutcome::Unreachable,
            }
        }
    }

    #[test]
    fn test_registry_member_is_mainnet() {
        let registry = loaded_registry();
        let weights = ClassifierWeights::default();
        let classifier = NetworkClassifier::new(&registry, &weights);

        let input = ClassificationInput {
            ip: "1.2.3.4",
            pubkey: Some("main-key"),
            // Every indicator points at DEVNET
            gossip_port: Some(1234),
            version: Some("0.1.0-devnet"),
            uptime: 60,
            storage_committed: 1,
        };
        let verdict = classifier.decide(&input, Some("trynet"));
        assert_eq!(verdict.network, Network::Mainnet);
        assert_eq!(verdict.confidence, NetworkConfidence::High);
        assert_eq!(verdict.method, ClassificationMethod::Registry);
    }

    #[test]
    fn test_registry_exclusion_is_devnet() {
        let registry = loaded_registry();
        let weights = ClassifierWeights::default();
        let classifier = NetworkClassifier::new(&registry, &weights);

        let input = ClassificationInput {
            pubkey: Some("unlisted"),
            gossip_port: Some(9001),
            storage_committed: 60 * TB,
            ..Default::default()
        };
        let verdict = classifier.decide(&input, Some("mainnet"));
        assert_eq!(verdict.network, Network::Devnet);
        assert_eq!(verdict.confidence, NetworkConfidence::High);
        assert_eq!(verdict.method, ClassificationMethod::Registry);
    }

    #[test]
    fn test_probe_marker_when_no_registry() {
        let registry = empty_registry();
        let weights = ClassifierWeights::default();
        let classifier = NetworkClassifier::new(&registry, &weights);

        let input = ClassificationInput {
            pubkey: Some("someone"),
            ..Default::default()
        };
        let verdict = classifier.decide(&input, Some("pod 1.0.3 (mainnet)"));
        assert_eq!(verdict.network, Network::Mainnet);
        assert_eq!(verdict.method, ClassificationMethod::Probe);

        let verdict = classifier.decide(&input, Some("1.0.3-trynet"));
        assert_eq!(verdict.network, Network::Devnet);
        assert_eq!(verdict.confidence, NetworkConfidence::High);

        // Unrecognizable probe and an identity: default
        let verdict = classifier.decide(&input, Some("1.0.3"));
        assert_eq!(verdict.network, Network::Devnet);
        assert_eq!(verdict.confidence, NetworkConfidence::Medium);
        assert_eq!(verdict.method, ClassificationMethod::Default);
    }

    #[test]
    fn test_anonymous_mainnet_pattern() {
        let registry = empty_registry();
        let weights = ClassifierWeights::default();
        let classifier = NetworkClassifier::new(&registry, &weights);

        let input = ClassificationInput {
            gossip_port: Some(9001),
            version: Some("1.2.3"),
            storage_committed: 12 * TB,
            ..Default::default()
        };
        let score = classifier.score_patterns(&input);
        assert_eq!(score.mainnet, 45 + 30 + 40);
        assert_eq!(score.devnet, 0);

        let verdict = classifier.decide(&input, None);
        assert_eq!(verdict.network, Network::Mainnet);
        assert_eq!(verdict.confidence, NetworkConfidence::High);
        assert_eq!(verdict.method, ClassificationMethod::Pattern);
    }

    #[test]
    fn test_anonymous_devnet_pattern() {
        let registry = empty_registry();
        let weights = ClassifierWeights::default();
        let classifier = NetworkClassifier::new(&registry, &weights);

        let input = ClassificationInput {
            gossip_port: Some(9002),
            version: Some("0.9.0-dev"),
            uptime: 3600,
            ..Default::default()
        };
        let score = classifier.score_patterns(&input);
        assert_eq!(score.devnet, 20 + 50 + 15);

        let verdict = classifier.classify_by_patterns(&input);
        assert_eq!(verdict.network, Network::Devnet);
        assert_eq!(verdict.confidence, NetworkConfidence::Medium);
    }

    #[test]
    fn test_weak_pattern_defaults_to_devnet_low() {
        let registry = empty_registry();
        let weights = ClassifierWeights::default();
        let classifier = NetworkClassifier::new(&registry, &weights);

        // 30 MAINNET points only, under the 60 threshold
        let input = ClassificationInput {
            version: Some("1.2.3"),
            ..Default::default()
        };
        let verdict = classifier.classify_by_patterns(&input);
        assert_eq!(verdict.network, Network::Devnet);
        assert_eq!(verdict.confidence, NetworkConfidence::Low);
    }

    #[tokio::test]
    async fn test_classify_probes_only_when_needed() {
        let registry = empty_registry();
        let weights = ClassifierWeights::default();
        let classifier = NetworkClassifier::new(&registry, &weights);

        let input = ClassificationInput {
            ip: "1.2.3.4",
            pubkey: Some("someone"),
            ..Default::default()
        };

        let verdict = classifier
            .classify(&input, Some(&VersionOnly(Some("mainnet-1.0"))), &[6000])
            .await;
        assert_eq!(verdict.network, Network::Mainnet);

        let verdict = classifier.classify(&input, Some(&VersionOnly(None)), &[6000]).await;
        assert_eq!(verdict.method, ClassificationMethod::Default);

        let verdict = classifier.classify(&input, None, &[6000]).await;
        assert_eq!(verdict.method, ClassificationMethod::Default);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let registry = loaded_registry();
        let weights = ClassifierWeights::default();
        let classifier = NetworkClassifier::new(&registry, &weights);

        let input = ClassificationInput {
            gossip_port: Some(9001),
            version: Some("1.2.3"),
            uptime: 40 * 86400,
            storage_committed: 2 * TB,
            ..Default::default()
        };
        assert_eq!(classifier.decide(&input, None), classifier.decide(&input, None));
    }

    #[test]
    fn test_markers_and_versions() {
        assert_eq!(network_from_marker("MAINNET"), Some(Network::Mainnet));
        assert_eq!(network_from_marker("testnet-2"), Some(Network::Devnet));
        assert_eq!(network_from_marker("1.2.3"), None);

        assert!(has_dev_marker("0.5.0-TRY"));
        assert!(!has_dev_marker("1.2.3"));

        assert_eq!(parse_version("v1.2.3"), Some((1, 2, 3)));
        assert_eq!(parse_version("0.8"), Some((0, 8, 0)));
        assert_eq!(parse_version("1.2.3-rc1"), Some((1, 2, 3)));
        assert_eq!(parse_version("unknown"), None);
        assert_eq!(parse_version("7"), None);
    }
}
