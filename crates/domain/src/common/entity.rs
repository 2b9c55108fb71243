use serde::{Deserialize, Serialize};

/// Optional human-readable label attached to a rule (e.g. `R1`, `block-ssh`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub String);

impl RuleId {
    /// Validate that the rule ID is non-empty and contains only
    /// alphanumeric characters, dashes, and underscores.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.0.is_empty() {
            return Err("rule ID must not be empty");
        }
        if !self
            .0
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err("rule ID must contain only alphanumeric, dashes, underscores");
        }
        Ok(())
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport protocol. `Any` is a rule-side wildcard and never the
/// protocol of a packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    #[default]
    Any,
}

impl Protocol {
    /// Create from an IANA protocol number. Numbers outside the closed
    /// set yield `None`.
    pub fn from_u8(n: u8) -> Option<Self> {
        match n {
            0 => Some(Self::Any),
            1 => Some(Self::Icmp),
            6 => Some(Self::Tcp),
            17 => Some(Self::Udp),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::Icmp => "ICMP",
            Self::Any => "ANY",
        }
    }

    pub fn is_wildcard(self) -> bool {
        self == Self::Any
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── RuleId tests ──────────────────────────────────────────────

    #[test]
    fn rule_id_valid() {
        assert!(RuleId("R1".to_string()).validate().is_ok());
        assert!(RuleId("block-ssh".to_string()).validate().is_ok());
        assert!(RuleId("allow_local".to_string()).validate().is_ok());
    }

    #[test]
    fn rule_id_empty() {
        assert!(RuleId(String::new()).validate().is_err());
    }

    #[test]
    fn rule_id_special_chars() {
        assert!(RuleId("rule.1".to_string()).validate().is_err());
        assert!(RuleId("rule 1".to_string()).validate().is_err());
        assert!(RuleId("rule/1".to_string()).validate().is_err());
    }

    #[test]
    fn rule_id_display() {
        let id = RuleId("R3".to_string());
        assert_eq!(format!("{id}"), "R3");
    }

    #[test]
    fn rule_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&RuleId("R1".to_string())).unwrap();
        assert_eq!(json, "\"R1\"");
    }

    // ── Protocol tests ────────────────────────────────────────────

    #[test]
    fn protocol_from_u8_is_closed() {
        assert_eq!(Protocol::from_u8(6), Some(Protocol::Tcp));
        assert_eq!(Protocol::from_u8(0), Some(Protocol::Any));
        assert_eq!(Protocol::from_u8(47), None); // GRE
    }

    #[test]
    fn protocol_default_is_wildcard() {
        assert_eq!(Protocol::default(), Protocol::Any);
        assert!(Protocol::Any.is_wildcard());
        assert!(!Protocol::Udp.is_wildcard());
    }

    #[test]
    fn protocol_display_uppercase() {
        assert_eq!(format!("{}", Protocol::Tcp), "TCP");
        assert_eq!(format!("{}", Protocol::Icmp), "ICMP");
    }

    #[test]
    fn protocol_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Protocol::Udp).unwrap(), "\"udp\"");
        let p: Protocol = serde_json::from_str("\"icmp\"").unwrap();
        assert_eq!(p, Protocol::Icmp);
    }
}
