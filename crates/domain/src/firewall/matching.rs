//! Per-dimension match predicates.
//!
//! Every function here is pure. A rule matches a packet only when all of
//! its dimensions match; wildcard fields (`None`, `PortSpec::Any`,
//! `Protocol::Any`) always match.

use std::net::IpAddr;

use crate::common::entity::Protocol;
use crate::common::error::DomainError;

use super::entity::{FirewallRule, IpNetwork, PacketInfo, PortSpec};
use super::error::FirewallError;

// ── Address ─────────────────────────────────────────────────────────

/// Address predicate. A missing range is the match-all wildcard.
pub fn address_matches(range: Option<&IpNetwork>, addr: IpAddr) -> bool {
    range.is_none_or(|net| net.contains(addr))
}

pub(super) fn cidr_match_v4(net_addr: u32, prefix_len: u8, ip: u32) -> bool {
    if prefix_len == 0 {
        return true;
    }
    if prefix_len >= 32 {
        return net_addr == ip;
    }
    let mask = prefix_to_mask_v4(prefix_len);
    (net_addr & mask) == (ip & mask)
}

pub(super) fn cidr_match_v6(net_addr: &[u8; 16], prefix_len: u8, ip: &[u8; 16]) -> bool {
    if prefix_len == 0 {
        return true;
    }
    if prefix_len >= 128 {
        return net_addr == ip;
    }
    let full_bytes = (prefix_len / 8) as usize;
    if net_addr[..full_bytes] != ip[..full_bytes] {
        return false;
    }
    let remaining_bits = prefix_len % 8;
    if remaining_bits > 0 {
        let mask = !0u8 << (8 - remaining_bits);
        if (net_addr[full_bytes] & mask) != (ip[full_bytes] & mask) {
            return false;
        }
    }
    true
}

/// Convert an IPv4 prefix length (0-32) to a bitmask.
/// e.g. 24 -> `0xFFFF_FF00`, 0 -> `0`, 32 -> `0xFFFF_FFFF`.
pub(super) fn prefix_to_mask_v4(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else if prefix_len >= 32 {
        !0u32
    } else {
        !0u32 << (32 - prefix_len)
    }
}

/// Clear every bit of `addr` past `prefix_len`.
pub(super) fn mask_v6(addr: &[u8; 16], prefix_len: u8) -> [u8; 16] {
    let mut out = [0u8; 16];
    let mut remaining = u32::from(prefix_len.min(128));
    for (dst, &src) in out.iter_mut().zip(addr) {
        if remaining >= 8 {
            *dst = src;
            remaining -= 8;
        } else {
            if remaining > 0 {
                *dst = src & (!0u8 << (8 - remaining));
            }
            break;
        }
    }
    out
}

// ── Port ────────────────────────────────────────────────────────────

/// Destination port predicate.
pub fn port_matches(spec: &PortSpec, port: u16) -> bool {
    match spec {
        PortSpec::Any => true,
        PortSpec::Single(p) => *p == port,
        PortSpec::Range(range) => range.contains(port),
    }
}

/// Source port predicate. The packet may not carry a source port, in which
/// case only the wildcard matches.
pub fn src_port_matches(spec: &PortSpec, port: Option<u16>) -> bool {
    match port {
        Some(p) => port_matches(spec, p),
        None => spec.is_any(),
    }
}

// ── Protocol ────────────────────────────────────────────────────────

pub fn protocol_matches(rule: Protocol, packet: Protocol) -> bool {
    match rule {
        Protocol::Any => true,
        _ => rule == packet,
    }
}

// ── Combined ────────────────────────────────────────────────────────

/// Check if a rule matches a packet on protocol, addresses and ports.
pub fn rule_matches(rule: &FirewallRule, packet: &PacketInfo) -> bool {
    protocol_matches(rule.protocol, packet.protocol)
        && address_matches(rule.src_ip.as_ref(), packet.src_addr)
        && address_matches(rule.dst_ip.as_ref(), packet.dst_addr)
        && port_matches(&rule.dst_port, packet.dst_port)
        && src_port_matches(&rule.src_port, packet.src_port)
}

/// Reject any rule whose address ranges belong to a different family than
/// the packet. Callers that want strict family checking run this before
/// evaluation; evaluation itself treats such rules as non-matching.
pub fn check_address_families(
    rules: &[FirewallRule],
    packet: &PacketInfo,
) -> Result<(), DomainError> {
    for (index, rule) in rules.iter().enumerate() {
        let pairs = [
            (rule.src_ip.as_ref(), packet.src_addr),
            (rule.dst_ip.as_ref(), packet.dst_addr),
        ];
        for (net, addr) in pairs {
            if let Some(net) = net {
                net.try_contains(addr).map_err(|e| FirewallError::InvalidRule {
                    index,
                    source: Box::new(e),
                })?;
            }
        }
    }
    Ok(())
}
