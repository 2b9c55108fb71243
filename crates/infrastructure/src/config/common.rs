//! Shared parsing helpers and the boundary error type.

use std::net::IpAddr;

use domain::common::entity::Protocol;
use domain::common::error::DomainError;
use domain::firewall::entity::{FirewallAction, IpNetwork, PortRange, PortSpec};
use serde::{Deserialize, Serialize};

// ── Config errors ──────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(String),

    #[error("JSON parse error: {0}")]
    Json(String),

    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{field}: invalid CIDR notation '{value}': {reason}")]
    InvalidCidr {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{field}: invalid address '{value}': {reason}")]
    InvalidAddress {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{field}: invalid port '{value}': {reason}")]
    InvalidPortRange {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{field}: packet port must be a single value, got range '{value}'")]
    InvalidPacketPort { field: String, value: String },

    #[error("invalid value '{value}' for field '{field}': expected one of {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("{field}: {source}")]
    Domain {
        field: String,
        #[source]
        source: DomainError,
    },

    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl From<serde_yaml_ng::Error> for ConfigError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        Self::Yaml(e.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

// ── Parsing helpers ────────────────────────────────────────────────

/// Parse a CIDR string into a normalized `IpNetwork`.
///
/// Supports both IPv4 (`"192.168.1.0/24"`, `"10.0.0.1"`) and
/// IPv6 (`"2001:db8::/32"`, `"::1"`). A bare address is a host network.
/// Host bits below the prefix are cleared.
pub fn parse_cidr(field: &str, s: &str) -> Result<IpNetwork, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidCidr {
        field: field.to_string(),
        value: s.to_string(),
        reason,
    };

    let trimmed = s.trim();
    // Detect IPv6 vs IPv4 by presence of ':'
    let max_len: u8 = if trimmed.contains(':') { 128 } else { 32 };

    let (ip_str, prefix_len) = match trimmed.split_once('/') {
        Some((ip, prefix)) => {
            let len = prefix
                .parse::<u8>()
                .map_err(|_| invalid(format!("invalid prefix length: '{prefix}'")))?;
            if len > max_len {
                return Err(invalid(format!("prefix length {len} must be 0-{max_len}")));
            }
            (ip, len)
        }
        None => (trimmed, max_len),
    };

    let addr: IpAddr = ip_str
        .parse()
        .map_err(|e| invalid(format!("invalid address '{ip_str}': {e}")))?;

    IpNetwork::new(addr, prefix_len).map_err(|e| invalid(e.to_string()))
}

/// Parse a single address (no prefix).
pub fn parse_addr(field: &str, s: &str) -> Result<IpAddr, ConfigError> {
    s.trim()
        .parse::<IpAddr>()
        .map_err(|e| ConfigError::InvalidAddress {
            field: field.to_string(),
            value: s.to_string(),
            reason: e.to_string(),
        })
}

pub fn parse_action(field: &str, s: &str) -> Result<FirewallAction, ConfigError> {
    match s.trim().to_lowercase().as_str() {
        "allow" | "pass" | "accept" => Ok(FirewallAction::Allow),
        "deny" | "drop" | "block" | "reject" => Ok(FirewallAction::Deny),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: s.to_string(),
            expected: "allow, deny".to_string(),
        }),
    }
}

pub fn parse_protocol(field: &str, s: &str) -> Result<Protocol, ConfigError> {
    match s.trim().to_lowercase().as_str() {
        "tcp" => Ok(Protocol::Tcp),
        "udp" => Ok(Protocol::Udp),
        "icmp" => Ok(Protocol::Icmp),
        "any" | "*" => Ok(Protocol::Any),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: s.to_string(),
            expected: "tcp, udp, icmp, any".to_string(),
        }),
    }
}

/// Packet protocols exclude the `any` wildcard.
pub fn parse_packet_protocol(field: &str, s: &str) -> Result<Protocol, ConfigError> {
    match parse_protocol(field, s) {
        Ok(Protocol::Any) | Err(_) => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: s.to_string(),
            expected: "tcp, udp, icmp".to_string(),
        }),
        ok => ok,
    }
}

/// Enforce a maximum count on a config collection.
pub(super) fn check_limit(field: &str, count: usize, max: usize) -> Result<(), ConfigError> {
    if count > max {
        return Err(ConfigError::Validation {
            field: field.to_string(),
            message: format!("count {count} exceeds maximum {max}"),
        });
    }
    Ok(())
}

// ── Port config ────────────────────────────────────────────────────

/// Port syntax accepted in scenario files:
///   port: 22
///   port: "22"
///   port: "1000-2000"
///   port: [1000, 2000]
///   port: { start: 1000, end: 2000 }
///
/// Numbers are read as `i64` so out-of-range bounds are reported rather
/// than failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortConfig {
    Single(i64),
    Text(String),
    Pair([i64; 2]),
    Explicit { start: i64, end: i64 },
}

impl PortConfig {
    /// Raw `(start, end)` bounds; a single port has `start == end`.
    fn bounds(&self, field: &str) -> Result<(i64, i64), ConfigError> {
        match self {
            Self::Single(p) => Ok((*p, *p)),
            Self::Pair([start, end]) | Self::Explicit { start, end } => Ok((*start, *end)),
            Self::Text(s) => {
                let parse = |part: &str, what: &str| {
                    part.trim()
                        .parse::<i64>()
                        .map_err(|_| ConfigError::InvalidPortRange {
                            field: field.to_string(),
                            value: s.clone(),
                            reason: format!("invalid {what} port: '{part}'"),
                        })
                };
                // Accept a single port as a string (e.g. "9999") or a range "80-443"
                if let Ok(port) = s.trim().parse::<i64>() {
                    return Ok((port, port));
                }
                let (start_str, end_str) =
                    s.split_once('-').ok_or_else(|| ConfigError::InvalidPortRange {
                        field: field.to_string(),
                        value: s.clone(),
                        reason: "expected a port or 'start-end' (e.g. '80-443')".to_string(),
                    })?;
                Ok((parse(start_str, "start")?, parse(end_str, "end")?))
            }
        }
    }

    fn is_range_shaped(&self) -> bool {
        match self {
            Self::Single(_) => false,
            Self::Text(s) => s.trim().parse::<i64>().is_err(),
            Self::Pair(_) | Self::Explicit { .. } => true,
        }
    }

    fn bound(&self, field: &str, value: i64) -> Result<u16, ConfigError> {
        u16::try_from(value).map_err(|_| ConfigError::InvalidPortRange {
            field: field.to_string(),
            value: self.to_string(),
            reason: format!("{value} is outside 0-65535"),
        })
    }

    /// Convert to a rule-side port specification.
    pub fn to_domain(&self, field: &str) -> Result<PortSpec, ConfigError> {
        let (start, end) = self.bounds(field)?;
        let start = self.bound(field, start)?;
        let end = self.bound(field, end)?;
        if start > end {
            return Err(ConfigError::InvalidPortRange {
                field: field.to_string(),
                value: self.to_string(),
                reason: format!("start ({start}) must be <= end ({end})"),
            });
        }
        if self.is_range_shaped() {
            Ok(PortSpec::Range(PortRange { start, end }))
        } else {
            Ok(PortSpec::Single(start))
        }
    }

    /// Convert to a packet port, which must be a single concrete value.
    pub fn to_packet_port(&self, field: &str) -> Result<u16, ConfigError> {
        if self.is_range_shaped() {
            return Err(ConfigError::InvalidPacketPort {
                field: field.to_string(),
                value: self.to_string(),
            });
        }
        let (port, _) = self.bounds(field)?;
        self.bound(field, port)
    }
}

impl std::fmt::Display for PortConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(p) => write!(f, "{p}"),
            Self::Text(s) => f.write_str(s),
            Self::Pair([start, end]) | Self::Explicit { start, end } => {
                write!(f, "{start}-{end}")
            }
        }
    }
}
