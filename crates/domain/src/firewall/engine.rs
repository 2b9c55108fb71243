use super::entity::{FirewallAction, FirewallRule, PacketInfo, Verdict};
use super::matching::rule_matches;

/// Evaluate a packet against an ordered rule set.
///
/// Rules are scanned from index 0; the first rule that matches decides the
/// verdict and later rules are never consulted. When nothing matches (an
/// empty set included) the verdict carries `default_action`.
///
/// Pure and total: no allocation, no logging, no mutation of the inputs.
pub fn evaluate(
    rules: &[FirewallRule],
    packet: &PacketInfo,
    default_action: FirewallAction,
) -> Verdict {
    rules
        .iter()
        .enumerate()
        .find(|(_, r)| rule_matches(r, packet))
        .map_or(
            Verdict::Default {
                action: default_action,
            },
            |(rule_index, r)| Verdict::Matched {
                action: r.action,
                rule_index,
            },
        )
}

/// First-match-wins evaluator.
///
/// Holds only the default action. Rule sets and packets are borrowed per
/// call and never retained, so one engine can be shared freely across
/// threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirewallEngine {
    default_action: FirewallAction,
}

impl FirewallEngine {
    pub fn new(default_action: FirewallAction) -> Self {
        Self { default_action }
    }

    pub fn default_action(&self) -> FirewallAction {
        self.default_action
    }

    pub fn evaluate(&self, rules: &[FirewallRule], packet: &PacketInfo) -> Verdict {
        evaluate(rules, packet, self.default_action)
    }

    /// One verdict per packet, in input order.
    pub fn evaluate_all(&self, rules: &[FirewallRule], packets: &[PacketInfo]) -> Vec<Verdict> {
        packets.iter().map(|p| self.evaluate(rules, p)).collect()
    }
}

impl Default for FirewallEngine {
    /// Default-deny.
    fn default() -> Self {
        Self::new(FirewallAction::Deny)
    }
}
