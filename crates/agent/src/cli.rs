use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use domain::common::entity::Protocol;
use domain::firewall::entity::FirewallAction;
use infrastructure::config::{BuiltinScenario, LogFormat, LogLevel};
use infrastructure::constants::DEFAULT_ACTION_ENV;

#[derive(Parser, Debug)]
#[command(
    name = "fwsim",
    about = "Firewall rule simulator: evaluate packets against ordered rule sets",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Log level (RUST_LOG takes precedence when set)
    #[arg(short, long, default_value = "warn", global = true)]
    pub log_level: LogLevel,

    /// Log format: text (default) or json
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Action applied when no rule matches a packet
    #[arg(long, value_enum, default_value = "deny", env = DEFAULT_ACTION_ENV, global = true)]
    pub default_action: ActionArg,

    /// Reject packets compared against rule addresses of the other IP family
    #[arg(long, global = true)]
    pub strict_family: bool,

    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table (default)
    Table,
    /// JSON document on stdout
    Json,
}

/// Rule action as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    Allow,
    Deny,
}

impl From<ActionArg> for FirewallAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Allow => Self::Allow,
            ActionArg::Deny => Self::Deny,
        }
    }
}

/// Packet protocol as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProtocolArg {
    Tcp,
    Udp,
    Icmp,
}

impl From<ProtocolArg> for Protocol {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::Tcp => Self::Tcp,
            ProtocolArg::Udp => Self::Udp,
            ProtocolArg::Icmp => Self::Icmp,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Display version information
    Version,

    /// List built-in scenarios
    List,

    /// Evaluate every packet of a scenario file (YAML or JSON)
    Run {
        /// Scenario file path
        file: PathBuf,

        /// Write a report (.json for JSON, anything else for CSV)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Run a built-in scenario
    Demo {
        /// Scenario name (see `fwsim list`)
        #[arg(default_value = "demo1")]
        name: BuiltinScenario,

        /// Write a report (.json for JSON, anything else for CSV)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Evaluate one ad-hoc packet against a scenario's rules
    Check {
        /// Scenario file providing the rules
        file: PathBuf,

        /// Packet source address
        #[arg(long)]
        src: IpAddr,

        /// Packet destination address
        #[arg(long)]
        dst: IpAddr,

        /// Destination port (required for TCP and UDP)
        #[arg(long)]
        port: Option<u16>,

        /// Source port
        #[arg(long)]
        src_port: Option<u16>,

        /// Packet protocol
        #[arg(long, value_enum)]
        protocol: ProtocolArg,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
