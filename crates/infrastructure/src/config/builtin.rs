//! Built-in demonstration scenarios.

use super::{ScenarioConfig, ValidatedScenario};
use super::common::ConfigError;

const DEMO1_YAML: &str = r"
name: demo1
rules:
  - id: R1
    action: deny
    port: 80
    protocol: tcp
    description: Block HTTP
  - id: R2
    action: allow
    src: 10.0.0.0/24
    description: Allow local subnet
  - id: R3
    action: deny
    port_range: [1000, 2000]
    protocol: udp
    description: Block UDP high ports
packets:
  - { src: 10.0.0.5, dst: 8.8.8.8, src_port: 12345, port: 80, protocol: tcp }
  - { src: 192.168.1.10, dst: 10.0.0.20, src_port: 40000, port: 22, protocol: tcp }
  - { src: 9.9.9.9, dst: 1.1.1.1, src_port: 1500, port: 1500, protocol: udp }
  - { src: 10.0.0.8, dst: 8.8.4.4, src_port: 33333, port: 443, protocol: tcp }
";

const ORDER_TEST_YAML: &str = r"
name: order-test
rules:
  - id: R1
    action: allow
    src: 0.0.0.0/0
    description: Allow all (shadows the rule below)
  - id: R2
    action: deny
    port: 22
    description: Deny SSH
packets:
  - { src: 8.8.8.8, dst: 1.2.3.4, src_port: 55555, port: 22, protocol: tcp }
";

/// Scenarios shipped with the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinScenario {
    /// Port block, subnet allow and UDP range block.
    Demo1,
    /// A broad allow placed before a specific deny.
    OrderTest,
}

impl BuiltinScenario {
    pub fn all() -> &'static [Self] {
        &[Self::Demo1, Self::OrderTest]
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Demo1 => "demo1",
            Self::OrderTest => "order-test",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Demo1 => "port block, subnet allow and UDP high-port block",
            Self::OrderTest => "general allow placed before a specific deny",
        }
    }

    fn source(self) -> &'static str {
        match self {
            Self::Demo1 => DEMO1_YAML,
            Self::OrderTest => ORDER_TEST_YAML,
        }
    }

    /// Parse and validate the embedded scenario.
    pub fn scenario(self) -> Result<ValidatedScenario, ConfigError> {
        ScenarioConfig::from_yaml(self.source())
    }
}

impl std::fmt::Display for BuiltinScenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for BuiltinScenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "demo1" => Ok(Self::Demo1),
            "order-test" | "order_test" => Ok(Self::OrderTest),
            _ => Err(format!(
                "unknown scenario '{s}': expected one of {}",
                Self::all()
                    .iter()
                    .map(|b| b.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}
