use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use crate::common::entity::{Protocol, RuleId};
use crate::common::error::DomainError;

use super::error::FirewallError;
use super::matching::{cidr_match_v4, cidr_match_v6, mask_v6, prefix_to_mask_v4};

// ── Actions ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirewallAction {
    Allow,
    Deny,
}

impl FirewallAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Deny => "DENY",
        }
    }
}

impl std::fmt::Display for FirewallAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

// ── IP Network ──────────────────────────────────────────────────────

/// IP address with CIDR prefix for subnet matching (IPv4 or IPv6).
///
/// Networks built through [`IpNetwork::new`] have their host bits cleared.
/// The variants stay public for literal construction in tests and fuzzing;
/// matching masks both sides, so an unnormalized base still behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpNetwork {
    /// IPv4 address as host-byte-order u32, prefix 0-32.
    V4 { addr: u32, prefix_len: u8 },
    /// IPv6 address as 16 bytes in network order, prefix 0-128.
    V6 { addr: [u8; 16], prefix_len: u8 },
}

impl IpNetwork {
    /// Build a network from a base address and prefix length, clearing
    /// host bits. Rejects prefixes longer than the address width.
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<Self, FirewallError> {
        let net = match addr {
            IpAddr::V4(v4) => Self::V4 {
                addr: u32::from(v4),
                prefix_len,
            },
            IpAddr::V6(v6) => Self::V6 {
                addr: v6.octets(),
                prefix_len,
            },
        };
        net.validate()?;
        Ok(net.normalized())
    }

    /// Single-host network (`/32` or `/128`).
    pub fn host(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Self::V4 {
                addr: u32::from(v4),
                prefix_len: 32,
            },
            IpAddr::V6(v6) => Self::V6 {
                addr: v6.octets(),
                prefix_len: 128,
            },
        }
    }

    /// `0.0.0.0/0`
    pub fn any_v4() -> Self {
        Self::V4 {
            addr: 0,
            prefix_len: 0,
        }
    }

    /// `::/0`
    pub fn any_v6() -> Self {
        Self::V6 {
            addr: [0; 16],
            prefix_len: 0,
        }
    }

    /// Check if the given IPv4 address falls within this network (V4 only).
    /// Returns `false` if this is a V6 network.
    pub fn contains_v4(&self, ip: u32) -> bool {
        match *self {
            Self::V4 { addr, prefix_len } => cidr_match_v4(addr, prefix_len, ip),
            Self::V6 { .. } => false,
        }
    }

    /// Check if the given IPv6 address falls within this network (V6 only).
    /// Returns `false` if this is a V4 network.
    pub fn contains_v6(&self, ip: &[u8; 16]) -> bool {
        match *self {
            Self::V4 { .. } => false,
            Self::V6 { addr, prefix_len } => cidr_match_v6(&addr, prefix_len, ip),
        }
    }

    /// Family-aware containment. An address of the other family is never
    /// contained, not even by a `/0` network.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => self.contains_v4(u32::from(v4)),
            IpAddr::V6(v6) => self.contains_v6(&v6.octets()),
        }
    }

    /// Strict containment: comparing across address families is an error
    /// rather than a non-match.
    pub fn try_contains(&self, ip: IpAddr) -> Result<bool, FirewallError> {
        if self.is_v6() != ip.is_ipv6() {
            return Err(FirewallError::AddressFamilyMismatch {
                network: self.to_string(),
                addr: ip.to_string(),
            });
        }
        Ok(self.contains(ip))
    }

    /// Returns `true` if this is an IPv6 network.
    pub fn is_v6(&self) -> bool {
        matches!(self, Self::V6 { .. })
    }

    pub fn prefix_len(&self) -> u8 {
        match *self {
            Self::V4 { prefix_len, .. } | Self::V6 { prefix_len, .. } => prefix_len,
        }
    }

    /// Base address of the network.
    pub fn network(&self) -> IpAddr {
        match *self {
            Self::V4 { addr, .. } => IpAddr::V4(Ipv4Addr::from(addr)),
            Self::V6 { addr, .. } => IpAddr::V6(Ipv6Addr::from(addr)),
        }
    }

    pub fn validate(&self) -> Result<(), FirewallError> {
        match *self {
            Self::V4 { prefix_len, .. } => {
                if prefix_len > 32 {
                    return Err(FirewallError::InvalidCidr {
                        prefix_len,
                        max: 32,
                    });
                }
            }
            Self::V6 { prefix_len, .. } => {
                if prefix_len > 128 {
                    return Err(FirewallError::InvalidCidr {
                        prefix_len,
                        max: 128,
                    });
                }
            }
        }
        Ok(())
    }

    /// Copy of this network with host bits below the prefix cleared.
    #[must_use]
    pub fn normalized(&self) -> Self {
        match *self {
            Self::V4 { addr, prefix_len } => Self::V4 {
                addr: addr & prefix_to_mask_v4(prefix_len),
                prefix_len,
            },
            Self::V6 { addr, prefix_len } => Self::V6 {
                addr: mask_v6(&addr, prefix_len),
                prefix_len,
            },
        }
    }
}

impl std::fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix_len())
    }
}

// ── Ports ───────────────────────────────────────────────────────────

/// Inclusive port range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Result<Self, FirewallError> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && port <= self.end
    }

    pub fn validate(&self) -> Result<(), FirewallError> {
        if self.start > self.end {
            return Err(FirewallError::InvalidPortRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// Port constraint of a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortSpec {
    /// Wildcard: every port matches.
    #[default]
    Any,
    Single(u16),
    Range(PortRange),
}

impl PortSpec {
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    pub fn validate(&self) -> Result<(), FirewallError> {
        match self {
            Self::Range(range) => range.validate(),
            Self::Any | Self::Single(_) => Ok(()),
        }
    }
}

impl From<PortRange> for PortSpec {
    fn from(range: PortRange) -> Self {
        if range.start == range.end {
            Self::Single(range.start)
        } else {
            Self::Range(range)
        }
    }
}

impl std::fmt::Display for PortSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Single(port) => write!(f, "{port}"),
            Self::Range(range) => write!(f, "{}-{}", range.start, range.end),
        }
    }
}

// ── Firewall rule ───────────────────────────────────────────────────

/// One entry of an ordered rule set. Its position in the owning slice is
/// its only priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RuleId>,
    pub action: FirewallAction,
    #[serde(default)]
    pub protocol: Protocol,
    /// `None` matches every source address.
    #[serde(default)]
    pub src_ip: Option<IpNetwork>,
    /// `None` matches every destination address.
    #[serde(default)]
    pub dst_ip: Option<IpNetwork>,
    #[serde(default)]
    pub src_port: PortSpec,
    #[serde(default)]
    pub dst_port: PortSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FirewallRule {
    /// A rule with the given action and every match field wildcarded.
    pub fn new(action: FirewallAction) -> Self {
        Self {
            id: None,
            action,
            protocol: Protocol::Any,
            src_ip: None,
            dst_ip: None,
            src_port: PortSpec::Any,
            dst_port: PortSpec::Any,
            description: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(RuleId(id.into()));
        self
    }

    #[must_use]
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    #[must_use]
    pub fn with_src(mut self, net: IpNetwork) -> Self {
        self.src_ip = Some(net);
        self
    }

    #[must_use]
    pub fn with_dst(mut self, net: IpNetwork) -> Self {
        self.dst_ip = Some(net);
        self
    }

    #[must_use]
    pub fn with_src_port(mut self, spec: PortSpec) -> Self {
        self.src_port = spec;
        self
    }

    #[must_use]
    pub fn with_dst_port(mut self, spec: PortSpec) -> Self {
        self.dst_port = spec;
        self
    }

    #[must_use]
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Validate all fields of this rule.
    pub fn validate(&self) -> Result<(), FirewallError> {
        if let Some(ref id) = self.id {
            id.validate()
                .map_err(|reason| FirewallError::InvalidRuleId { reason })?;
        }

        if let Some(ref cidr) = self.src_ip {
            cidr.validate()?;
        }
        if let Some(ref cidr) = self.dst_ip {
            cidr.validate()?;
        }
        self.src_port.validate()?;
        self.dst_port.validate()?;

        // Reject mixed address families
        if let (Some(src), Some(dst)) = (&self.src_ip, &self.dst_ip)
            && src.is_v6() != dst.is_v6()
        {
            return Err(FirewallError::MixedAddressFamilies);
        }

        Ok(())
    }
}

// ── Rule set ────────────────────────────────────────────────────────

/// Ordered, validated sequence of rules.
///
/// Construction validates every rule and rejects the whole set on the first
/// malformed one. Order is preserved exactly and duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<FirewallRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<FirewallRule>) -> Result<Self, DomainError> {
        for (index, rule) in rules.iter().enumerate() {
            rule.validate().map_err(|e| FirewallError::InvalidRule {
                index,
                source: Box::new(e),
            })?;
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[FirewallRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ── Packet info (evaluation input) ──────────────────────────────────

/// Packet descriptor evaluated against a rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketInfo {
    pub src_addr: IpAddr,
    pub dst_addr: IpAddr,
    /// Source port, when known. Rules constraining the source port never
    /// match a packet without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_port: Option<u16>,
    pub dst_port: u16,
    pub protocol: Protocol,
}

impl PacketInfo {
    /// Build a validated packet descriptor.
    pub fn new(
        src_addr: IpAddr,
        dst_addr: IpAddr,
        dst_port: u16,
        protocol: Protocol,
    ) -> Result<Self, FirewallError> {
        let packet = Self {
            src_addr,
            dst_addr,
            src_port: None,
            dst_port,
            protocol,
        };
        packet.validate()?;
        Ok(packet)
    }

    #[must_use]
    pub fn with_src_port(mut self, port: u16) -> Self {
        self.src_port = Some(port);
        self
    }

    pub fn validate(&self) -> Result<(), FirewallError> {
        if self.protocol.is_wildcard() {
            return Err(FirewallError::WildcardPacketProtocol);
        }
        if self.src_addr.is_ipv6() != self.dst_addr.is_ipv6() {
            return Err(FirewallError::MixedPacketFamilies);
        }
        Ok(())
    }
}

// ── Verdict ─────────────────────────────────────────────────────────

/// Outcome of evaluating one packet against one rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Verdict {
    /// The rule at `rule_index` was the first to match.
    Matched {
        action: FirewallAction,
        rule_index: usize,
    },
    /// No rule matched; the engine's default action applies.
    Default { action: FirewallAction },
}

impl Verdict {
    pub fn action(&self) -> FirewallAction {
        match *self {
            Self::Matched { action, .. } | Self::Default { action } => action,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }

    pub fn rule_index(&self) -> Option<usize> {
        match *self {
            Self::Matched { rule_index, .. } => Some(rule_index),
            Self::Default { .. } => None,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.action() == FirewallAction::Allow
    }
}
