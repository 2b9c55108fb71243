use thiserror::Error;

use crate::common::error::DomainError;

#[derive(Debug, Error)]
pub enum FirewallError {
    #[error("invalid port range: {start}..{end}")]
    InvalidPortRange { start: u16, end: u16 },

    #[error("invalid CIDR prefix length: {prefix_len} (max {max})")]
    InvalidCidr { prefix_len: u8, max: u8 },

    #[error("invalid rule ID: {reason}")]
    InvalidRuleId { reason: &'static str },

    #[error("mixed address families: src and dst must both be IPv4 or both IPv6")]
    MixedAddressFamilies,

    #[error("mixed packet address families: src and dst must both be IPv4 or both IPv6")]
    MixedPacketFamilies,

    #[error("address family mismatch: {network} cannot be compared with {addr}")]
    AddressFamilyMismatch { network: String, addr: String },

    #[error("packet protocol must be TCP, UDP or ICMP, not ANY")]
    WildcardPacketProtocol,

    #[error("rule {index}: {source}")]
    InvalidRule {
        index: usize,
        #[source]
        source: Box<FirewallError>,
    },
}

impl FirewallError {
    /// Innermost error, skipping rule-index wrappers.
    pub fn root_cause(&self) -> &FirewallError {
        match self {
            Self::InvalidRule { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<FirewallError> for DomainError {
    fn from(e: FirewallError) -> Self {
        match e.root_cause() {
            FirewallError::WildcardPacketProtocol | FirewallError::MixedPacketFamilies => {
                DomainError::InvalidPacket(e.to_string())
            }
            FirewallError::AddressFamilyMismatch { .. } => {
                DomainError::AddressFamilyMismatch(e.to_string())
            }
            _ => DomainError::InvalidRule(e.to_string()),
        }
    }
}
