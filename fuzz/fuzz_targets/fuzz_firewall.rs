#![no_main]

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use libfuzzer_sys::fuzz_target;

use domain::common::entity::Protocol;
use domain::firewall::engine::FirewallEngine;
use domain::firewall::entity::{FirewallAction, FirewallRule, IpNetwork, PacketInfo, PortRange, PortSpec};
use domain::firewall::matching::rule_matches;

fn addr(bytes: &[u8], v6: bool) -> IpAddr {
    if v6 {
        let mut octets = [0u8; 16];
        octets[..4].copy_from_slice(&bytes[..4]);
        octets[15] = bytes[0];
        IpAddr::V6(Ipv6Addr::from(octets))
    } else {
        IpAddr::V4(Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]))
    }
}

fn port_spec(kind: u8, a: u16, b: u16) -> PortSpec {
    match kind % 3 {
        0 => PortSpec::Any,
        1 => PortSpec::Single(a),
        _ => PortSpec::Range(PortRange {
            start: a.min(b),
            end: a.max(b),
        }),
    }
}

// Build rules and packets from fuzz data and check first-match-wins.
//
// Layout (variable-length):
//   [0]    = number of rules (1–8)
//   [1]    = flags (bit 0: IPv6 packets, bit 1: default allow)
//   rest   = consumed in 20-byte chunks (rule) and 14-byte chunks (packet)
fuzz_target!(|data: &[u8]| {
    if data.len() < 22 {
        return;
    }

    let num_rules = ((data[0] as usize) % 8) + 1;
    let v6 = data[1] & 1 != 0;
    let default_action = if data[1] & 2 != 0 {
        FirewallAction::Allow
    } else {
        FirewallAction::Deny
    };
    let mut cursor = 2;

    let mut rules = Vec::new();
    for _ in 0..num_rules {
        if cursor + 20 > data.len() {
            break;
        }
        let chunk = &data[cursor..cursor + 20];
        cursor += 20;

        let action = if chunk[0] & 1 == 0 {
            FirewallAction::Allow
        } else {
            FirewallAction::Deny
        };
        let protocol = Protocol::from_u8(chunk[1]).unwrap_or(Protocol::Any);
        let flags = chunk[2];

        let mut rule = FirewallRule::new(action)
            .with_protocol(protocol)
            .with_dst_port(port_spec(
                chunk[3],
                u16::from_le_bytes([chunk[4], chunk[5]]),
                u16::from_le_bytes([chunk[6], chunk[7]]),
            ))
            .with_src_port(port_spec(
                chunk[8],
                u16::from_le_bytes([chunk[9], chunk[10]]),
                u16::from_le_bytes([chunk[11], chunk[12]]),
            ));

        // Networks are built from raw variants too, so host bits may be set.
        if flags & 1 != 0 {
            let rule_v6 = flags & 4 != 0;
            let max = if rule_v6 { 129 } else { 33 };
            let a = addr(&chunk[13..17], rule_v6);
            rule = rule.with_src(
                IpNetwork::new(a, chunk[17] % max).unwrap_or_else(|_| IpNetwork::host(a)),
            );
        }
        if flags & 2 != 0 {
            let a = addr(&chunk[14..18], v6);
            rule.dst_ip = Some(match a {
                IpAddr::V4(ip) => IpNetwork::V4 {
                    addr: u32::from(ip),
                    prefix_len: chunk[18] % 33,
                },
                IpAddr::V6(ip) => IpNetwork::V6 {
                    addr: ip.octets(),
                    prefix_len: chunk[18] % 129,
                },
            });
        }
        rules.push(rule);
    }

    let engine = FirewallEngine::new(default_action);

    while cursor + 14 <= data.len() {
        let pkt = &data[cursor..cursor + 14];
        cursor += 14;

        let protocol = match pkt[8] % 3 {
            0 => Protocol::Tcp,
            1 => Protocol::Udp,
            _ => Protocol::Icmp,
        };
        let Ok(mut packet) = PacketInfo::new(
            addr(&pkt[0..4], v6),
            addr(&pkt[4..8], v6),
            u16::from_le_bytes([pkt[9], pkt[10]]),
            protocol,
        ) else {
            continue;
        };
        if pkt[11] & 1 != 0 {
            packet = packet.with_src_port(u16::from_le_bytes([pkt[12], pkt[13]]));
        }

        let verdict = engine.evaluate(&rules, &packet);
        assert_eq!(verdict, engine.evaluate(&rules, &packet));

        match verdict.rule_index() {
            Some(idx) => {
                assert!(idx < rules.len());
                assert!(rule_matches(&rules[idx], &packet));
                assert!(rules[..idx].iter().all(|r| !rule_matches(r, &packet)));
                assert_eq!(verdict.action(), rules[idx].action);
            }
            None => {
                assert!(rules.iter().all(|r| !rule_matches(r, &packet)));
                assert_eq!(verdict.action(), default_action);
            }
        }
    }
});
