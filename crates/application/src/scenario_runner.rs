use domain::common::entity::RuleId;
use domain::common::error::DomainError;
use domain::firewall::engine::FirewallEngine;
use domain::firewall::entity::{FirewallAction, PacketInfo, RuleSet, Verdict};
use domain::firewall::matching::check_address_families;
use serde::Serialize;
use thiserror::Error;

/// Runner options supplied by the caller (CLI flags).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Applied when a scenario does not name its own default action.
    pub default_action: FirewallAction,
    /// Reject packets that would be compared against a rule address of the
    /// other IP family instead of treating that rule as non-matching.
    pub strict_family: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_action: FirewallAction::Deny,
            strict_family: false,
        }
    }
}

/// A validated scenario: an ordered rule set plus the packets to test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub rules: RuleSet,
    pub packets: Vec<PacketInfo>,
    /// Scenario-level override of `RunnerConfig::default_action`.
    pub default_action: Option<FirewallAction>,
}

/// Evaluation result of one packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PacketOutcome {
    /// 1-based position of the packet in the scenario.
    pub index: usize,
    pub packet: PacketInfo,
    pub verdict: Verdict,
    /// Label of the matched rule, when it has one.
    pub rule_id: Option<RuleId>,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("packet {index}: {source}")]
    Packet {
        index: usize,
        #[source]
        source: DomainError,
    },
}

/// Runs scenarios through the evaluation engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScenarioRunner {
    config: RunnerConfig,
}

impl ScenarioRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> RunnerConfig {
        self.config
    }

    /// Default action in effect for `scenario`.
    pub fn effective_default(&self, scenario: &Scenario) -> FirewallAction {
        scenario.default_action.unwrap_or(self.config.default_action)
    }

    /// Evaluate every packet of the scenario.
    ///
    /// With strict family checking enabled, all packets are checked before
    /// any is evaluated, so a scenario either yields a full result list or
    /// an error.
    pub fn run(&self, scenario: &Scenario) -> Result<Vec<PacketOutcome>, RunError> {
        if self.config.strict_family {
            for (i, packet) in scenario.packets.iter().enumerate() {
                check_address_families(scenario.rules.rules(), packet)
                    .map_err(|source| RunError::Packet {
                        index: i + 1,
                        source,
                    })?;
            }
        }

        let engine = FirewallEngine::new(self.effective_default(scenario));
        let rules = scenario.rules.rules();

        let outcomes: Vec<PacketOutcome> = scenario
            .packets
            .iter()
            .enumerate()
            .map(|(i, packet)| {
                let verdict = engine.evaluate(rules, packet);
                let rule_id = verdict
                    .rule_index()
                    .and_then(|idx| rules[idx].id.clone());
                tracing::debug!(
                    packet = i + 1,
                    action = %verdict.action(),
                    rule_index = ?verdict.rule_index(),
                    "packet evaluated"
                );
                PacketOutcome {
                    index: i + 1,
                    packet: packet.clone(),
                    verdict,
                    rule_id,
                }
            })
            .collect();

        let summary = Summary::of(&outcomes);
        tracing::info!(
            scenario = %scenario.name,
            rules = rules.len(),
            packets = outcomes.len(),
            allowed = summary.allowed,
            denied = summary.denied,
            defaulted = summary.defaulted,
            default_action = %engine.default_action(),
            "scenario evaluated"
        );

        Ok(outcomes)
    }
}

/// Aggregate counts over a result list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub allowed: usize,
    pub denied: usize,
    /// Packets that no rule matched.
    pub defaulted: usize,
}

impl Summary {
    pub fn of(outcomes: &[PacketOutcome]) -> Self {
        let mut summary = Self::default();
        for o in outcomes {
            if o.verdict.is_allowed() {
                summary.allowed += 1;
            } else {
                summary.denied += 1;
            }
            if !o.verdict.is_matched() {
                summary.defaulted += 1;
            }
        }
        summary
    }
}
