//! Confidence Scorer
//!
//! 0-100 trust score counting the independent sources that corroborate a
//! node. MAINNET requires registry membership; DEVNET is discovery-driven and
//! only gets a bonus from its registry.

use std::collections::BTreeSet;

use crate::config::ConfidenceBands;
use crate::registry::OfficialRegistry;
pub use crate::types::ConfidenceLevel;
use crate::types::{Network, NodeRecord, NodeType, SourceTag};

impl ConfidenceLevel {
    pub fn from_score(score: u8, bands: &ConfidenceBands) -> Self {
        if score >= bands.confirmed {
            ConfidenceLevel::Confirmed
        } else if score >= bands.validated {
            ConfidenceLevel::Validated
        } else if score >= bands.discovered {
            ConfidenceLevel::Discovered
        } else {
            ConfidenceLevel::Uncertain
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInput<'a> {
    pub network: Network,
    pub pubkey: Option<&'a str>,
    /// Seen by the gossip layer and not private
    pub gossip_visible: bool,
    /// At least one positive live metric
    pub has_rpc_metrics: bool,
}

impl<'a> ConfidenceInput<'a> {
    /// Read the inputs off a classified record
    pub fn from_record(record: &'a NodeRecord, has_gossip_metadata: bool) -> Self {
        Self {
            network: record.network,
            pubkey: record.pubkey.as_deref(),
            gossip_visible: has_gossip_metadata && record.node_type != NodeType::Private,
            has_rpc_metrics: record.stats.has_live_metrics(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceResult {
    pub score: u8,
    pub sources: BTreeSet<SourceTag>,
    pub level: ConfidenceLevel,
}

/// Score a node's corroboration
pub fn score_confidence(
    input: &ConfidenceInput<'_>,
    registry: &OfficialRegistry,
    bands: &ConfidenceBands,
) -> ConfidenceResult {
    let mut sources = BTreeSet::new();
    let mut score: u32 = 0;

    match input.network {
        Network::Mainnet => {
            let listed = input.pubkey.map(|pk| registry.is_mainnet(pk)).unwrap_or(false);
            if !listed {
                // Presumptively misclassified
                return ConfidenceResult {
                    score: 0,
                    sources,
                    level: ConfidenceLevel::from_score(0, bands),
                };
            }

            score += u32::from(bands.mainnet_registry_points);
            sources.insert(SourceTag::Registry);

            if input.gossip_visible {
                score += u32::from(bands.mainnet_gossip_points);
                sources.insert(SourceTag::Gossip);
            }
            if input.has_rpc_metrics {
                score += u32::from(bands.mainnet_rpc_points);
                sources.insert(SourceTag::Rpc);
            }
        }
        Network::Devnet | Network::Unknown => {
            if input.gossip_visible {
                score += u32::from(bands.devnet_gossip_points);
                sources.insert(SourceTag::Gossip);
            }
            if input.has_rpc_metrics {
                score += u32::from(bands.devnet_rpc_points);
                sources.insert(SourceTag::Rpc);
            }
            if input.pubkey.map(|pk| registry.is_devnet(pk)).unwrap_or(false) {
                score += u32::from(bands.devnet_registry_bonus);
                sources.insert(SourceTag::Registry);
            }
        }
    }

    let score = score.min(100) as u8;
    ConfidenceResult {
        score,
        sources,
        level: ConfidenceLevel::from_score(score, bands),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::credit;
    use std::time::Duration;

    fn registry() -> OfficialRegistry {
        OfficialRegistry::from_lists(
            vec![credit("main-key", 100.0)],
            vec![credit("dev-key", 10.0)],
            Duration::from_secs(3600),
        )
    }

    fn input(network: Network, pubkey: Option<&str>, gossip: bool, rpc: bool) -> ConfidenceInput<'_> {
        ConfidenceInput {
            network,
            pubkey,
            gossip_visible: gossip,
            has_rpc_metrics: rpc,
        }
    }

    #[test]
    fn test_devnet_discovered_without_registry() {
        let bands = ConfidenceBands::default();
        let result = score_confidence(&input(Network::Devnet, Some("nobody"), true, true), &registry(), &bands);
        assert_eq!(result.score, 80);
        assert_eq!(result.level, ConfidenceLevel::Validated);
        assert!(result.sources.contains(&SourceTag::Gossip));
        assert!(result.sources.contains(&SourceTag::Rpc));
        assert!(!result.sources.contains(&SourceTag::Registry));
    }

    #[test]
    fn test_devnet_registry_bonus() {
        let bands = ConfidenceBands::default();
        let result = score_confidence(&input(Network::Devnet, Some("dev-key"), true, true), &registry(), &bands);
        assert_eq!(result.score, 100);
        assert_eq!(result.level, ConfidenceLevel::Confirmed);
    }

    #[test]
    fn test_mainnet_requires_registry() {
        let bands = ConfidenceBands::default();
        let result = score_confidence(&input(Network::Mainnet, Some("nobody"), true, true), &registry(), &bands);
        assert_eq!(result.score, 0);
        assert!(result.sources.is_empty());
        assert_eq!(result.level, ConfidenceLevel::Uncertain);

        let result = score_confidence(&input(Network::Mainnet, None, true, true), &registry(), &bands);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_mainnet_points() {
        let bands = ConfidenceBands::default();
        let reg = registry();

        let registry_only = score_confidence(&input(Network::Mainnet, Some("main-key"), false, false), &reg, &bands);
        assert_eq!(registry_only.score, 70);
        assert_eq!(registry_only.level, ConfidenceLevel::Validated);

        let with_gossip = score_confidence(&input(Network::Mainnet, Some("main-key"), true, false), &reg, &bands);
        assert_eq!(with_gossip.score, 85);
        assert_eq!(with_gossip.level, ConfidenceLevel::Confirmed);

        let full = score_confidence(&input(Network::Mainnet, Some("main-key"), true, true), &reg, &bands);
        assert_eq!(full.score, 100);
        assert_eq!(full.sources.len(), 3);
    }

    #[test]
    fn test_levels() {
        let bands = ConfidenceBands::default();
        assert_eq!(ConfidenceLevel::from_score(85, &bands), ConfidenceLevel::Confirmed);
        assert_eq!(ConfidenceLevel::from_score(70, &bands), ConfidenceLevel::Validated);
        assert_eq!(ConfidenceLevel::from_score(50, &bands), ConfidenceLevel::Discovered);
        assert_eq!(ConfidenceLevel::from_score(49, &bands), ConfidenceLevel::Uncertain);
    }

    #[test]
    fn test_private_node_is_not_gossip_visible() {
        let mut record = NodeRecord::new("1.2.3.4", chrono::Utc::now());
        record.node_type = NodeType::Private;
        let input = ConfidenceInput::from_record(&record, true);
        assert!(!input.gossip_visible);
        assert!(!input.has_rpc_metrics);
    }
}
