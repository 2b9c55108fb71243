//! Rule and packet configuration structs and conversion logic.

use domain::common::entity::{Protocol, RuleId};
use domain::common::error::DomainError;
use domain::firewall::entity::{FirewallRule, PacketInfo, PortSpec};
use serde::{Deserialize, Serialize};

use super::common::{
    ConfigError, PortConfig, parse_action, parse_addr, parse_cidr, parse_packet_protocol,
    parse_protocol,
};

// ── Rule config (YAML-friendly) ────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub action: String,

    #[serde(default, alias = "src_ip", skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,

    #[serde(default, alias = "dst_ip", skip_serializing_if = "Option::is_none")]
    pub dst: Option<String>,

    /// Destination port, single value.
    #[serde(default, alias = "dst_port", skip_serializing_if = "Option::is_none")]
    pub port: Option<PortConfig>,

    /// Destination port range. Exclusive with `port`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_range: Option<PortConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_port: Option<PortConfig>,

    #[serde(default = "default_protocol")]
    pub protocol: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_protocol() -> String {
    "any".to_string()
}

impl RuleConfig {
    /// Convert to a validated domain `FirewallRule`.
    ///
    /// `idx` is the rule's position, used to build field paths in errors.
    pub fn to_domain_rule(&self, idx: usize) -> Result<FirewallRule, ConfigError> {
        let prefix = format!("rules[{idx}]");

        if self.port.is_some() && self.port_range.is_some() {
            return Err(ConfigError::Validation {
                field: format!("{prefix}.port_range"),
                message: "'port' and 'port_range' are mutually exclusive".to_string(),
            });
        }

        let action = parse_action(&format!("{prefix}.action"), &self.action)?;
        let protocol = parse_protocol(&format!("{prefix}.protocol"), &self.protocol)?;

        let mut rule = FirewallRule::new(action).with_protocol(protocol);

        if let Some(ref id) = self.id {
            let rule_id = RuleId(id.clone());
            rule_id
                .validate()
                .map_err(|reason| ConfigError::Validation {
                    field: format!("{prefix}.id"),
                    message: reason.to_string(),
                })?;
            rule.id = Some(rule_id);
        }

        if let Some(ref cidr) = self.src {
            rule = rule.with_src(parse_cidr(&format!("{prefix}.src"), cidr)?);
        }
        if let Some(ref cidr) = self.dst {
            rule = rule.with_dst(parse_cidr(&format!("{prefix}.dst"), cidr)?);
        }

        let dst_port = match (&self.port, &self.port_range) {
            (Some(port), _) => port.to_domain(&format!("{prefix}.port"))?,
            (None, Some(range)) => range.to_domain(&format!("{prefix}.port_range"))?,
            (None, None) => PortSpec::Any,
        };
        rule = rule.with_dst_port(dst_port);

        if let Some(ref port) = self.src_port {
            rule = rule.with_src_port(port.to_domain(&format!("{prefix}.src_port"))?);
        }

        if let Some(ref text) = self.description {
            rule = rule.with_description(text.clone());
        }

        rule.validate().map_err(|e| ConfigError::Domain {
            field: prefix,
            source: DomainError::from(e),
        })?;

        Ok(rule)
    }
}

// ── Packet config ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacketConfig {
    #[serde(alias = "src_ip")]
    pub src: String,

    #[serde(alias = "dst_ip")]
    pub dst: String,

    /// Destination port. Optional for ICMP, where it defaults to 0.
    #[serde(default, alias = "dst_port", skip_serializing_if = "Option::is_none")]
    pub port: Option<PortConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_port: Option<PortConfig>,

    pub protocol: String,
}

impl PacketConfig {
    /// Convert to a validated domain `PacketInfo`.
    pub fn to_domain_packet(&self, idx: usize) -> Result<PacketInfo, ConfigError> {
        let prefix = format!("packets[{idx}]");

        let src = parse_addr(&format!("{prefix}.src"), &self.src)?;
        let dst = parse_addr(&format!("{prefix}.dst"), &self.dst)?;
        let protocol = parse_packet_protocol(&format!("{prefix}.protocol"), &self.protocol)?;

        let dst_port = match (&self.port, protocol) {
            (Some(port), _) => port.to_packet_port(&format!("{prefix}.port"))?,
            (None, Protocol::Icmp) => 0,
            (None, _) => {
                return Err(ConfigError::Validation {
                    field: format!("{prefix}.port"),
                    message: format!("destination port is required for {protocol}"),
                });
            }
        };

        let mut packet =
            PacketInfo::new(src, dst, dst_port, protocol).map_err(|e| ConfigError::Domain {
                field: prefix.clone(),
                source: DomainError::from(e),
            })?;

        if let Some(ref port) = self.src_port {
            packet = packet.with_src_port(port.to_packet_port(&format!("{prefix}.src_port"))?);
        }

        Ok(packet)
    }
}
