//! Zombie detection
//!
//! A node is stale when it keeps failing checks, or when it reports no uptime
//! and no peer mentions it anymore. Registry members are never dropped; they
//! stay as `registry_only`.

use crate::config::ZombiePolicy;
use crate::registry::OfficialRegistry;
use crate::types::NodeStatus;

/// What the sweep observes about one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liveness {
    pub failed_checks: u32,
    /// `get-pods-with-stats` had an entry for the IP this cycle
    pub has_gossip_metadata: bool,
    pub uptime: u64,
    /// Some peer listed the IP this cycle
    pub in_gossip_set: bool,
}

/// Final fate of a node after the sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep(NodeStatus),
    Delete,
}

pub fn is_stale(liveness: &Liveness, policy: &ZombiePolicy) -> bool {
    (liveness.failed_checks >= policy.failed_checks_without_gossip && !liveness.has_gossip_metadata)
        || liveness.failed_checks >= policy.failed_checks_with_gossip
        || (liveness.uptime == 0 && !liveness.in_gossip_set)
}

/// Apply the stale rule, registry retention and the retention policy
pub fn disposition(
    liveness: &Liveness,
    pubkey: Option<&str>,
    registry: &OfficialRegistry,
    policy: &ZombiePolicy,
) -> Disposition {
    if !is_stale(liveness, policy) {
        return Disposition::Keep(NodeStatus::Online);
    }

    if pubkey.map(|pk| registry.contains(pk)).unwrap_or(false) {
        return Disposition::Keep(NodeStatus::RegistryOnly);
    }

    if policy.delete_stale_nodes {
        Disposition::Delete
    } else {
        Disposition::Keep(NodeStatus::Stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::credit;
    use std::time::Duration;

    fn alive(failed_checks: u32, has_gossip_metadata: bool) -> Liveness {
        Liveness {
            failed_checks,
            has_gossip_metadata,
            uptime: 3_600,
            in_gossip_set: true,
        }
    }

    #[test]
    fn test_stale_thresholds() {
        let policy = ZombiePolicy::default();

        assert!(!is_stale(&alive(0, false), &policy));
        assert!(!is_stale(&alive(1, false), &policy));
        assert!(is_stale(&alive(2, false), &policy));
        assert!(is_stale(&alive(3, false), &policy));

        assert!(!is_stale(&alive(3, true), &policy));
        assert!(is_stale(&alive(4, true), &policy));
    }

    #[test]
    fn test_zero_uptime_needs_gossip_presence() {
        let policy = ZombiePolicy::default();
        let mut liveness = alive(0, true);
        liveness.uptime = 0;
        assert!(!is_stale(&liveness, &policy));

        liveness.in_gossip_set = false;
        assert!(is_stale(&liveness, &policy));
    }

    #[test]
    fn test_disposition() {
        let registry = OfficialRegistry::from_lists(vec![credit("main", 1.0)], vec![], Duration::from_secs(60));
        let mut policy = ZombiePolicy::default();

        assert_eq!(
            disposition(&alive(0, true), Some("x"), &registry, &policy),
            Disposition::Keep(NodeStatus::Online)
        );
        assert_eq!(
            disposition(&alive(5, false), Some("main"), &registry, &policy),
            Disposition::Keep(NodeStatus::RegistryOnly)
        );
        assert_eq!(
            disposition(&alive(5, false), Some("x"), &registry, &policy),
            Disposition::Keep(NodeStatus::Stale)
        );

        policy.delete_stale_nodes = true;
        assert_eq!(disposition(&alive(5, false), None, &registry, &policy), Disposition::Delete);
        assert_eq!(
            disposition(&alive(5, false), Some("main"), &registry, &policy),
            Disposition::Keep(NodeStatus::RegistryOnly)
        );
    }
}
