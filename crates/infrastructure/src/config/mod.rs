mod builtin;
mod common;
mod scenario;

use std::path::Path;

use domain::firewall::entity::{FirewallAction, PacketInfo, RuleSet};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_SCENARIO_FILE_BYTES, MAX_SCENARIO_PACKETS, MAX_SCENARIO_RULES};

// Re-export public types so external `use infrastructure::config::X` paths still work.
pub use builtin::BuiltinScenario;
pub use common::{
    ConfigError, PortConfig, parse_action, parse_addr, parse_cidr, parse_packet_protocol,
    parse_protocol,
};
pub use scenario::{PacketConfig, RuleConfig};

use common::check_limit;

// ── Scenario file ──────────────────────────────────────────────────

/// Top-level scenario file: an ordered rule list and the packets to test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Overrides the runner's default action when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_action: Option<String>,

    #[serde(default)]
    pub rules: Vec<RuleConfig>,

    #[serde(default)]
    pub packets: Vec<PacketConfig>,
}

/// A scenario file after validation, already converted to domain types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedScenario {
    pub name: String,
    pub default_action: Option<FirewallAction>,
    pub rules: RuleSet,
    pub packets: Vec<PacketInfo>,
}

impl ScenarioConfig {
    /// Load and validate a scenario file. `.json` files are parsed as
    /// JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<ValidatedScenario, ConfigError> {
        let size = std::fs::metadata(path)?.len();
        if size > MAX_SCENARIO_FILE_BYTES {
            return Err(ConfigError::Validation {
                field: path.display().to_string(),
                message: format!("file size {size} exceeds maximum {MAX_SCENARIO_FILE_BYTES}"),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        tracing::debug!(path = %path.display(), bytes = size, json = is_json, "loading scenario");

        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Parse and validate a scenario from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<ValidatedScenario, ConfigError> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()
    }

    /// Parse and validate a scenario from a JSON string.
    pub fn from_json(json: &str) -> Result<ValidatedScenario, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()
    }

    /// Validate the scenario and convert it to domain types.
    ///
    /// The whole scenario is rejected on the first malformed entry.
    pub fn validate(&self) -> Result<ValidatedScenario, ConfigError> {
        check_limit("rules", self.rules.len(), MAX_SCENARIO_RULES)?;
        check_limit("packets", self.packets.len(), MAX_SCENARIO_PACKETS)?;

        Ok(ValidatedScenario {
            name: self
                .name
                .clone()
                .unwrap_or_else(|| crate::constants::DEFAULT_SCENARIO_NAME.to_string()),
            default_action: self.to_domain_default_action()?,
            rules: self.to_domain_rules()?,
            packets: self.to_domain_packets()?,
        })
    }

    fn to_domain_default_action(&self) -> Result<Option<FirewallAction>, ConfigError> {
        self.default_action
            .as_deref()
            .map(|s| parse_action("default_action", s))
            .transpose()
    }

    fn to_domain_rules(&self) -> Result<RuleSet, ConfigError> {
        let rules = self
            .rules
            .iter()
            .enumerate()
            .map(|(i, r)| r.to_domain_rule(i))
            .collect::<Result<Vec<_>, _>>()?;
        RuleSet::new(rules).map_err(|source| ConfigError::Domain {
            field: "rules".to_string(),
            source,
        })
    }

    fn to_domain_packets(&self) -> Result<Vec<PacketInfo>, ConfigError> {
        self.packets
            .iter()
            .enumerate()
            .map(|(i, p)| p.to_domain_packet(i))
            .collect()
    }
}

// ── Log level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(format!(
                "invalid log level '{s}': expected error|warn|info|debug|trace"
            )),
        }
    }
}

// ── Log format ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    #[default]
    Text,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "pretty" => Ok(Self::Text),
            _ => Err(format!("invalid log format '{s}': expected json|text")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use domain::common::entity::Protocol;
    use domain::common::error::DomainError;
    use domain::firewall::entity::PortSpec;

    use super::*;

    const SAMPLE_YAML: &str = r"
name: sample
default_action: allow
rules:
  - id: no-ssh
    action: deny
    port: 22
    protocol: tcp
  - action: allow
    src: 10.0.0.0/24
packets:
  - src: 10.0.0.5
    dst: 8.8.8.8
    port: 22
    protocol: tcp
  - src: 172.16.0.1
    dst: 8.8.8.8
    port: 53
    protocol: udp
";

    const SAMPLE_JSON: &str = r#"{
  "name": "sample",
  "rules": [
    { "id": "R1", "action": "deny", "port_range": "1000-2000", "protocol": "udp" }
  ],
  "packets": [
    { "src": "9.9.9.9", "dst": "1.1.1.1", "port": 1500, "protocol": "udp" }
  ]
}"#;

    // ── Parsing ───────────────────────────────────────────────────

    #[test]
    fn from_yaml_sample() {
        let scenario = ScenarioConfig::from_yaml(SAMPLE_YAML).unwrap();
        assert_eq!(scenario.name, "sample");
        assert_eq!(scenario.default_action, Some(FirewallAction::Allow));
        assert_eq!(scenario.rules.len(), 2);
        assert_eq!(scenario.packets.len(), 2);
    }

    #[test]
    fn from_json_sample() {
        let scenario = ScenarioConfig::from_json(SAMPLE_JSON).unwrap();
        assert_eq!(scenario.default_action, None);
        assert_eq!(scenario.rules.len(), 1);
    }

    #[test]
    fn validate_returns_converted_entries() {
        let config: ScenarioConfig = serde_yaml_ng::from_str(SAMPLE_YAML).unwrap();
        let scenario = config.validate().unwrap();

        let first = &scenario.rules.rules()[0];
        assert_eq!(first.id.as_ref().map(ToString::to_string).as_deref(), Some("no-ssh"));
        assert_eq!(first.action, FirewallAction::Deny);
        assert_eq!(first.protocol, Protocol::Tcp);
        assert_eq!(first.dst_port, PortSpec::Single(22));

        let packet = &scenario.packets[1];
        assert_eq!(packet.src_addr, "172.16.0.1".parse::<std::net::IpAddr>().unwrap());
        assert_eq!(packet.dst_port, 53);
        assert_eq!(packet.protocol, Protocol::Udp);
        assert_eq!(ScenarioConfig::from_yaml(SAMPLE_YAML).unwrap(), scenario);
    }

    #[test]
    fn empty_scenario_is_valid() {
        let scenario = ScenarioConfig::from_yaml("{}").unwrap();
        assert_eq!(scenario.name, "unnamed");
        assert!(scenario.rules.is_empty());
        assert!(scenario.packets.is_empty());
    }

    #[test]
    fn unknown_top_level_field_rejected() {
        let err = ScenarioConfig::from_yaml("name: x\nmode: block\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn invalid_default_action_rejected() {
        let err = ScenarioConfig::from_yaml("default_action: maybe\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn malformed_yaml_rejected() {
        assert!(matches!(
            ScenarioConfig::from_yaml("rules: [").unwrap_err(),
            ConfigError::Yaml(_)
        ));
        assert!(matches!(
            ScenarioConfig::from_json("{").unwrap_err(),
            ConfigError::Json(_)
        ));
    }

    #[test]
    fn first_bad_rule_rejects_whole_scenario() {
        let yaml = r"
rules:
  - action: allow
  - action: deny
    src: 10.0.0.0/99
packets: []
";
        let err = ScenarioConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("rules[1].src"));
    }

    #[test]
    fn mixed_family_rule_reports_domain_error() {
        let yaml = "rules:\n  - action: allow\n    src: 10.0.0.0/8\n    dst: '2001:db8::/32'\n";
        match ScenarioConfig::from_yaml(yaml).unwrap_err() {
            ConfigError::Domain { field, source } => {
                assert_eq!(field, "rules[0]");
                assert!(matches!(source, DomainError::InvalidRule(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rule_limit_enforced() {
        let config = ScenarioConfig {
            rules: vec![
                RuleConfig {
                    action: "allow".to_string(),
                    protocol: "any".to_string(),
                    ..RuleConfig::default()
                };
                MAX_SCENARIO_RULES + 1
            ],
            ..ScenarioConfig::default()
        };
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::Validation { .. }
        ));
    }

    // ── Loading from disk ─────────────────────────────────────────

    #[test]
    fn load_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(SAMPLE_YAML.as_bytes()).unwrap();
        let scenario = ScenarioConfig::load(file.path()).unwrap();
        assert_eq!(scenario.rules.len(), 2);
    }

    #[test]
    fn load_json_file_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".JSON").tempfile().unwrap();
        file.write_all(SAMPLE_JSON.as_bytes()).unwrap();
        let scenario = ScenarioConfig::load(file.path()).unwrap();
        assert_eq!(scenario.packets.len(), 1);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ScenarioConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    // ── Log settings ──────────────────────────────────────────────

    #[test]
    fn log_level_from_str() {
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
